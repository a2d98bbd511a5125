use std::io::Read;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use aircraft_risk::cli::Cli;
use aircraft_risk::infer::{infer, InferOptions};
use aircraft_risk::model::RiskModel;
use aircraft_risk::report::{render_echo, Outcome};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let model = RiskModel::load(&cli.model)
        .with_context(|| format!("failed to load model from {}", cli.model.display()))?;

    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("failed to read standard input")?;
    let record: Value = serde_json::from_str(&raw).context("standard input is not valid JSON")?;

    let options = InferOptions {
        derive_features: cli.derive_features,
    };

    match infer(&model, &record, &options) {
        Ok(prediction) => {
            println!("{}", Outcome::risk(prediction.risk_percentage).to_json_line()?);
            if !cli.no_echo {
                print!("{}", render_echo(&prediction.frame, prediction.risk_percentage));
            }
            Ok(())
        }
        Err(err) => {
            tracing::debug!(error = ?err, "inference failed");
            println!("{}", Outcome::error(&err).to_json_line()?);
            std::process::exit(1);
        }
    }
}
