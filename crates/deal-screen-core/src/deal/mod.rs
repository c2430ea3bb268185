pub mod capital_stack;
pub mod hold_returns;
pub mod inputs;
pub mod pro_forma;
pub mod screen;

pub use inputs::{AcquisitionLoanBasis, AcquisitionRepayment, DealInputs, EquityAnchor};
pub use screen::{screen_deal, DealScreenOutput, ScreenVerdict};
