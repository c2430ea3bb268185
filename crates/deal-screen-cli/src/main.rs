mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use commands::deal::DealArgs;
use commands::loan::{IrrArgs, PaymentArgs};
use commands::sensitivity::SensitivityArgs;

/// Value-add multifamily / BRRRR deal screening
#[derive(Parser)]
#[command(
    name = "dealscreen",
    version,
    about = "Value-add multifamily / BRRRR deal screening",
    long_about = "Screen forced-appreciation multifamily deals with decimal precision: \
                  NOI before and after the value-add plan, cap-rate valuation, \
                  acquisition and cash-out refinance sizing, DSCR, and hold-period \
                  IRR / equity multiple. Deal inputs come from --input (JSON or YAML), \
                  piped JSON, or flags layered over standard screening assumptions."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log pipeline diagnostics to stderr (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full screen: pro-forma, capital stack, hold returns, verdict
    Screen(DealArgs),
    /// Income before/after stabilisation, valuation and NOI-target diagnostic
    ProForma(DealArgs),
    /// Acquisition loan, cash to close and cash-out refinance
    CapitalStack(DealArgs),
    /// Hold-period equity cash flows, IRR and equity multiple
    HoldReturns(DealArgs),
    /// IRR of a cash-flow series
    Irr(IrrArgs),
    /// Monthly payment, annual debt service and balance for a fixed-rate loan
    Payment(PaymentArgs),
    /// 2-way sensitivity grid of a screening metric
    Sensitivity(SensitivityArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    // stdout carries the formatted result; diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Screen(args) => commands::deal::run_screen(args),
        Commands::ProForma(args) => commands::deal::run_pro_forma(args),
        Commands::CapitalStack(args) => commands::deal::run_capital_stack(args),
        Commands::HoldReturns(args) => commands::deal::run_hold_returns(args),
        Commands::Irr(args) => commands::loan::run_irr(args),
        Commands::Payment(args) => commands::loan::run_payment(args),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args),
        Commands::Version => {
            println!("dealscreen {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
