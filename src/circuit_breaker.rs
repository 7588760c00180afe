use failsafe::{
    backoff::{self, Exponential},
    failure_policy::{self, ConsecutiveFailures},
    Config, StateMachine,
};
use std::time::Duration;

/// Concrete breaker type guarding the hosted model dependency.
///
/// Named (rather than `impl CircuitBreaker`) so it can live in `AppState`.
pub type LlmCircuitBreaker = StateMachine<ConsecutiveFailures<Exponential>, ()>;

/// Creates the circuit breaker for Gemini calls.
///
/// # Configuration
///
/// - **Failure threshold**: 3 consecutive failures trigger the OPEN state.
/// - **Backoff**: exponential from 5s to 30s before attempting recovery.
///
/// # States
///
/// - **CLOSED**: normal operation, calls pass through.
/// - **OPEN**: too many failures, calls are rejected fast and the chat turn
///   degrades to the fallback reply without waiting out the 30s timeout.
/// - **HALF_OPEN**: testing whether the model API recovered.
pub fn create_llm_circuit_breaker() -> LlmCircuitBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(5),  // Initial delay
        Duration::from_secs(30), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(3, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}
