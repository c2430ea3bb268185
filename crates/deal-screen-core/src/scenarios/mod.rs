pub mod sensitivity;

pub use sensitivity::{deal_sensitivity, DealSensitivityInput, DealSensitivityOutput, ScreenMetric};
