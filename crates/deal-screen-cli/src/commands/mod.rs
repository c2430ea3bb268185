pub mod deal;
pub mod loan;
pub mod sensitivity;
