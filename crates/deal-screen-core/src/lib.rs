pub mod amortization;
pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "deal")]
pub mod deal;

#[cfg(feature = "scenarios")]
pub mod scenarios;

pub use error::DealScreenError;
pub use types::*;

/// Standard result type for all deal-screen operations
pub type DealScreenResult<T> = Result<T, DealScreenError>;
