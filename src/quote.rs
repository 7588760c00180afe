//! Deterministic photovoltaic sizing and savings estimate.
//!
//! Pure arithmetic over the customer profile: no I/O, no state, safe to call
//! concurrently from any handler.

use crate::models::CustomerProfile;
use serde::{Deserialize, Serialize};

/// Average annual kWh produced per kWp installed in Italy.
pub const KWH_PER_KWP_YEAR: f64 = 1350.0;
/// Average grid purchase price of electricity.
pub const AVG_ELECTRICITY_COST_EUR_PER_KWH: f64 = 0.25;
/// Average fraction of solar production consumed directly on-site.
pub const SELF_CONSUMPTION_RATE: f64 = 0.60;
/// Average tariff paid for surplus energy exported to the grid.
pub const GRID_FEED_IN_TARIFF_EUR_PER_KWH: f64 = 0.11;

/// Minimum practical installation size in kWp.
pub const MIN_SYSTEM_SIZE_KWP: f64 = 3.0;

/// The computed estimate. All fields are always populated; the all-zero
/// value is the sentinel for "not enough data", never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteEstimate {
    /// Recommended system size, multiple of 0.5 kWp (0 in the sentinel case).
    pub system_size_kwp: f64,
    pub annual_production_kwh: i64,
    pub annual_savings_eur: f64,
    /// Share of consumption covered by self-consumed production, 0-100.
    pub self_sufficiency_percent: u8,
    pub current_monthly_bill_eur: i64,
    pub projected_monthly_bill_eur: i64,
}

impl QuoteEstimate {
    /// The sentinel returned when neither consumption nor bill is usable.
    pub fn zero() -> Self {
        Self {
            system_size_kwp: 0.0,
            annual_production_kwh: 0,
            annual_savings_eur: 0.0,
            self_sufficiency_percent: 0,
            current_monthly_bill_eur: 0,
            projected_monthly_bill_eur: 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

/// Computes the sizing/savings estimate from the profile.
///
/// Only `monthly_kwh` and `bill_eur` are consumed; either one can be derived
/// from the other via the average electricity cost. Zero or negative values
/// count as "not provided" and take the same branch as absence — a reported
/// zero consumption arguably deserves its own answer, but callers rely on
/// the sentinel here.
pub fn estimate(profile: &CustomerProfile) -> QuoteEstimate {
    let mut monthly_kwh = profile.monthly_kwh.filter(|v| *v > 0.0);
    let mut monthly_bill = profile.bill_eur.filter(|v| *v > 0.0);

    // Estimate the missing value if possible. The two fallbacks are mutually
    // exclusive: a present value is never overwritten.
    if monthly_kwh.is_none() {
        monthly_kwh = monthly_bill.map(|bill| bill / AVG_ELECTRICITY_COST_EUR_PER_KWH);
    }
    if monthly_bill.is_none() {
        monthly_bill = monthly_kwh.map(|kwh| kwh * AVG_ELECTRICITY_COST_EUR_PER_KWH);
    }

    let (Some(monthly_kwh), Some(monthly_bill)) = (monthly_kwh, monthly_bill) else {
        return QuoteEstimate::zero();
    };

    let annual_kwh_consumption = monthly_kwh * 12.0;

    // Size the system to cover the annual consumption, rounded to the
    // nearest 0.5 kWp, never below the practical minimum. No maximum cap.
    let raw_size = annual_kwh_consumption / KWH_PER_KWP_YEAR;
    let system_size_kwp = ((raw_size * 2.0).round() / 2.0).max(MIN_SYSTEM_SIZE_KWP);

    let annual_production_kwh = system_size_kwp * KWH_PER_KWP_YEAR;

    let energy_consumed_from_solar = annual_production_kwh * SELF_CONSUMPTION_RATE;
    let energy_exported_to_grid = annual_production_kwh * (1.0 - SELF_CONSUMPTION_RATE);

    let savings_from_self_consumption =
        energy_consumed_from_solar * AVG_ELECTRICITY_COST_EUR_PER_KWH;
    let earnings_from_grid_feed_in = energy_exported_to_grid * GRID_FEED_IN_TARIFF_EUR_PER_KWH;
    let annual_savings_eur = savings_from_self_consumption + earnings_from_grid_feed_in;

    let current_annual_bill = monthly_bill * 12.0;
    let new_annual_bill = (current_annual_bill - annual_savings_eur).max(0.0);
    let new_monthly_bill = new_annual_bill / 12.0;

    let self_sufficiency_percent =
        ((energy_consumed_from_solar / annual_kwh_consumption) * 100.0)
            .round()
            .min(100.0) as u8;

    QuoteEstimate {
        system_size_kwp: (system_size_kwp * 10.0).round() / 10.0,
        annual_production_kwh: annual_production_kwh.round() as i64,
        annual_savings_eur: (annual_savings_eur * 100.0).round() / 100.0,
        self_sufficiency_percent,
        current_monthly_bill_eur: monthly_bill.round() as i64,
        projected_monthly_bill_eur: new_monthly_bill.round() as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_with(monthly_kwh: Option<f64>, bill_eur: Option<f64>) -> CustomerProfile {
        CustomerProfile {
            monthly_kwh,
            bill_eur,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_profile_returns_sentinel() {
        let quote = estimate(&CustomerProfile::default());
        assert!(quote.is_zero());
    }

    #[test]
    fn test_zero_inputs_return_sentinel() {
        // A reported zero takes the same branch as absence.
        let quote = estimate(&profile_with(Some(0.0), Some(0.0)));
        assert!(quote.is_zero());
    }

    #[test]
    fn test_negative_inputs_return_sentinel() {
        let quote = estimate(&profile_with(Some(-120.0), None));
        assert!(quote.is_zero());
    }

    #[test]
    fn test_bill_only_derives_consumption() {
        // 95 EUR / 0.25 = 380 kWh/month -> 4560 kWh/year -> raw 3.378 kWp,
        // rounded to 3.5 (above the floor, floor not binding).
        let quote = estimate(&profile_with(None, Some(95.0)));

        assert_eq!(quote.system_size_kwp, 3.5);
        assert_eq!(quote.annual_production_kwh, 4725);
        assert_eq!(quote.annual_savings_eur, 916.65);
        assert_eq!(quote.self_sufficiency_percent, 62);
        assert_eq!(quote.current_monthly_bill_eur, 95);
        assert_eq!(quote.projected_monthly_bill_eur, 19);
    }

    #[test]
    fn test_consumption_only_hits_minimum_size() {
        // 300 kWh/month -> 3600 kWh/year -> raw 2.667 kWp, rounded to 2.5,
        // clamped to the 3.0 floor.
        let quote = estimate(&profile_with(Some(300.0), None));

        assert_eq!(quote.system_size_kwp, 3.0);
        assert_eq!(quote.annual_production_kwh, 4050);
        assert_eq!(quote.annual_savings_eur, 785.7);
        assert_eq!(quote.self_sufficiency_percent, 68);
        // Bill derived as 300 * 0.25 = 75 EUR.
        assert_eq!(quote.current_monthly_bill_eur, 75);
        assert_eq!(quote.projected_monthly_bill_eur, 10);
    }

    #[test]
    fn test_small_consumption_still_gets_minimum_system() {
        let quote = estimate(&profile_with(Some(50.0), None));
        assert_eq!(quote.system_size_kwp, 3.0);
        assert_eq!(quote.annual_production_kwh, 4050);
    }

    #[test]
    fn test_large_consumption_has_no_cap() {
        let quote = estimate(&profile_with(Some(10_000.0), None));
        // 120000 kWh/year -> raw 88.89 -> rounded to 89.0 kWp.
        assert_eq!(quote.system_size_kwp, 89.0);
        assert_eq!(quote.annual_production_kwh, 120_150);
    }

    #[test]
    fn test_projected_bill_never_negative() {
        // Tiny bill with huge consumption: savings exceed the bill.
        let profile = profile_with(Some(2_000.0), Some(10.0));
        let quote = estimate(&profile);
        assert_eq!(quote.projected_monthly_bill_eur, 0);
    }

    #[test]
    fn test_self_sufficiency_capped_at_100() {
        // The 3.0 kWp floor over-produces for small consumption.
        let quote = estimate(&profile_with(Some(50.0), None));
        assert_eq!(quote.self_sufficiency_percent, 100);
    }

    #[test]
    fn test_size_is_multiple_of_half_kwp() {
        for kwh in [90.0, 150.0, 300.0, 380.0, 412.5, 999.0, 4321.0] {
            let quote = estimate(&profile_with(Some(kwh), None));
            let doubled = quote.system_size_kwp * 2.0;
            assert_eq!(doubled, doubled.round(), "size for {} kWh", kwh);
        }
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let profile = profile_with(Some(300.0), Some(95.0));
        assert_eq!(estimate(&profile), estimate(&profile));
    }

    #[test]
    fn test_both_inputs_present_no_derivation() {
        // With both present the bill is used as given, not derived.
        let quote = estimate(&profile_with(Some(300.0), Some(95.0)));
        assert_eq!(quote.current_monthly_bill_eur, 95);
        assert_eq!(quote.system_size_kwp, 3.0);
    }
}
