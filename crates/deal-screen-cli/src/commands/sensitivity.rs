use clap::Args;
use serde_json::Value;

use deal_screen_core::scenarios::{deal_sensitivity, DealSensitivityInput, ScreenMetric};
use deal_screen_core::SensitivityVariable;

use crate::commands::deal::DealArgs;
use crate::input;

/// Arguments for a 2-way deal sensitivity grid
#[derive(Args)]
pub struct SensitivityArgs {
    /// First deal input to sweep, as name:min:max:step
    /// (e.g. "refinance_rate:0.06:0.09:0.005")
    #[arg(long, required_unless_present = "spec_file")]
    pub var1: Option<String>,

    /// Second deal input to sweep, as name:min:max:step
    #[arg(long, required_unless_present = "spec_file")]
    pub var2: Option<String>,

    /// Metric to evaluate: noi_lift, dscr, value_after, value_created,
    /// refinance_loan, cash_out, cash_left_in_deal, irr, equity_multiple,
    /// cash_on_cash
    #[arg(long, default_value = "dscr")]
    pub metric: ScreenMetric,

    /// Path to a full sensitivity input (JSON/YAML); replaces all other flags
    #[arg(long)]
    pub spec_file: Option<String>,

    #[command(flatten)]
    pub deal: DealArgs,
}

fn parse_sens_var(spec: &str) -> Result<SensitivityVariable, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 4 {
        return Err(format!(
            "Sensitivity variable must be name:min:max:step, got '{}'",
            spec
        )
        .into());
    }
    Ok(SensitivityVariable {
        name: parts[0].to_string(),
        min: parts[1].parse()?,
        max: parts[2].parse()?,
        step: parts[3].parse()?,
    })
}

fn required_var<'a>(
    var: &'a Option<String>,
    flag: &str,
) -> Result<&'a str, Box<dyn std::error::Error>> {
    var.as_deref()
        .ok_or_else(|| format!("{flag} is required unless --spec-file is given").into())
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sens_input: DealSensitivityInput = if let Some(ref path) = args.spec_file {
        input::file::read_input(path)?
    } else {
        DealSensitivityInput {
            base_inputs: args.deal.resolve()?,
            variable_1: parse_sens_var(required_var(&args.var1, "--var1")?)?,
            variable_2: parse_sens_var(required_var(&args.var2, "--var2")?)?,
            output_metric: args.metric,
        }
    };

    let result = deal_sensitivity(&sens_input)?;
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_sens_var() {
        let var = parse_sens_var("refinance_ltv:0.65:0.80:0.05").unwrap();
        assert_eq!(var.name, "refinance_ltv");
        assert_eq!(var.min, dec!(0.65));
        assert_eq!(var.max, dec!(0.80));
        assert_eq!(var.step, dec!(0.05));
    }

    #[test]
    fn test_missing_var_without_spec_file() {
        assert!(required_var(&None, "--var1").is_err());
        assert_eq!(
            required_var(&Some("units:10:20:5".to_string()), "--var1").unwrap(),
            "units:10:20:5"
        );
    }

    #[test]
    fn test_parse_sens_var_rejects_bad_shape() {
        assert!(parse_sens_var("refinance_ltv:0.65:0.80").is_err());
        assert!(parse_sens_var("refinance_ltv:low:0.80:0.05").is_err());
    }
}
