use clap::Parser;
use std::path::PathBuf;

/// Default location of the model artifact, relative to the working directory.
pub const DEFAULT_MODEL_PATH: &str = "final_model.json";

#[derive(Debug, Parser)]
#[command(
    name = "predict",
    version,
    about = "Score one aircraft incident record read as JSON from stdin"
)]
pub struct Cli {
    #[arg(long, default_value = DEFAULT_MODEL_PATH, help = "XGBoost JSON model artifact")]
    pub model: PathBuf,

    #[arg(long, default_value_t = false, help = "Only print the result line")]
    pub no_echo: bool,

    #[arg(
        long,
        default_value_t = false,
        help = "Recompute engineered fields (TempRange, Precip_*, ...) from raw fields"
    )]
    pub derive_features: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_reproduce_fixed_behavior() {
        let cli = Cli::parse_from(["predict"]);
        assert_eq!(cli.model, PathBuf::from(DEFAULT_MODEL_PATH));
        assert!(!cli.no_echo);
        assert!(!cli.derive_features);
    }

    #[test]
    fn flags_parse() {
        let cli = Cli::parse_from(["predict", "--model", "m.json", "--no-echo", "--derive-features"]);
        assert_eq!(cli.model, PathBuf::from("m.json"));
        assert!(cli.no_echo);
        assert!(cli.derive_features);
    }
}
