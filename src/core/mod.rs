// Domain-layer modules and shared errors/models
pub mod assistant {
    pub use crate::assistant::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod quote {
    pub use crate::quote::*;
}

pub mod report {
    pub use crate::report::*;
}

pub mod errors {
    pub use crate::errors::*;
}
