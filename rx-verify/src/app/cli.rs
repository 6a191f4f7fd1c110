//! Command-Line Interface

use crate::app::config::DatasetConfig;
use crate::workflow::request::MentionInput;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// rx-verify - Drug interaction and dosage safety checks for prescriptions
#[derive(Parser, Debug)]
#[command(name = "rx-verify")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain-text summary
    #[default]
    Text,
    /// Full report as JSON
    Json,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Verify a prescription from a JSON request file
    Verify {
        /// Request file (`{"patient_age": .., "mentions": [..]}`)
        #[arg(short, long)]
        input: PathBuf,

        /// Override the patient age from the request
        #[arg(short, long)]
        age: Option<u32>,

        /// Override the patient weight (kg) from the request
        #[arg(long)]
        weight: Option<f64>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify drugs given on the command line
    Check {
        /// Patient age in years
        #[arg(short, long)]
        age: u32,

        /// Patient weight in kg, enables mg/kg pediatric dosing
        #[arg(long)]
        weight: Option<f64>,

        /// Drug as NAME or NAME=DOSE (e.g. "aspirin=81 mg"), repeatable
        #[arg(short, long = "drug", value_name = "NAME[=DOSE]", required = true)]
        drugs: Vec<String>,

        /// Frequency applied to every drug (e.g. "bid", "every 8 hours")
        #[arg(long)]
        frequency: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show how a drug name normalizes
    Lookup {
        /// Drug name as written
        name: String,
    },

    /// List interactions among the given drugs
    Interactions {
        /// Drug names
        #[arg(required = true, num_args = 2..)]
        names: Vec<String>,
    },

    /// Initialize configuration and reference data
    Init {
        /// Force overwrite existing files
        #[arg(short, long)]
        force: bool,
    },

    /// View or reset configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Get a specific configuration value
    Get {
        /// Configuration key (e.g., "lookup.timeout_ms", "severity.default_tier")
        key: String,
    },

    /// Reset configuration to defaults
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the reference data directory
    pub fn data_dir() -> PathBuf {
        DatasetConfig::data_dir()
    }
}

/// Parse a `--drug` argument: `NAME` or `NAME=DOSE`
pub fn parse_drug_arg(arg: &str, frequency: Option<&str>) -> MentionInput {
    let mut mention = match arg.split_once('=') {
        Some((name, dose)) => MentionInput::new(name.trim()).with_dose_text(dose.trim()),
        None => MentionInput::new(arg.trim()),
    };
    if let Some(frequency) = frequency {
        mention = mention.with_frequency(frequency);
    }
    mention
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::request::DoseInput;
    use clap::CommandFactory;

    #[test]
    fn test_data_dir() {
        let dir = Cli::data_dir();
        assert!(dir.to_string_lossy().contains("data"));
    }

    #[test]
    fn test_cli_parse_verify_command_with_defaults() {
        let args = vec!["rx-verify", "verify", "--input", "/path/to/request.json"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Verify { input, age, weight, format, output } => {
                assert_eq!(input, PathBuf::from("/path/to/request.json"));
                assert!(age.is_none());
                assert!(weight.is_none());
                assert_eq!(format, OutputFormat::Text);
                assert!(output.is_none());
            }
            _ => panic!("Expected Verify command"),
        }
    }

    #[test]
    fn test_cli_parse_verify_command_with_all_options() {
        let args = vec![
            "rx-verify",
            "verify",
            "-i", "request.json",
            "--age", "7",
            "--weight", "21.5",
            "--format", "json",
            "--output", "report.json",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Verify { input, age, weight, format, output } => {
                assert_eq!(input, PathBuf::from("request.json"));
                assert_eq!(age, Some(7));
                assert_eq!(weight, Some(21.5));
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(output, Some(PathBuf::from("report.json")));
            }
            _ => panic!("Expected Verify command"),
        }
    }

    #[test]
    fn test_cli_verify_requires_input() {
        assert!(Cli::try_parse_from(vec!["rx-verify", "verify"]).is_err());
    }

    #[test]
    fn test_cli_parse_check_command() {
        let args = vec![
            "rx-verify",
            "check",
            "--age", "70",
            "--drug", "aspirin=81 mg",
            "-d", "warfarin",
            "--frequency", "daily",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Check { age, weight, drugs, frequency, format } => {
                assert_eq!(age, 70);
                assert!(weight.is_none());
                assert_eq!(drugs, vec!["aspirin=81 mg".to_string(), "warfarin".to_string()]);
                assert_eq!(frequency.as_deref(), Some("daily"));
                assert_eq!(format, OutputFormat::Text);
            }
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_check_requires_age_and_drug() {
        assert!(Cli::try_parse_from(vec!["rx-verify", "check", "--drug", "aspirin"]).is_err());
        assert!(Cli::try_parse_from(vec!["rx-verify", "check", "--age", "30"]).is_err());
    }

    #[test]
    fn test_cli_check_rejects_unknown_format() {
        let args = vec!["rx-verify", "check", "--age", "30", "-d", "aspirin", "--format", "xml"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_cli_parse_lookup_command() {
        let cli = Cli::try_parse_from(vec!["rx-verify", "lookup", "Tylenol 500mg"]).unwrap();
        match cli.command {
            Commands::Lookup { name } => assert_eq!(name, "Tylenol 500mg"),
            _ => panic!("Expected Lookup command"),
        }
    }

    #[test]
    fn test_cli_parse_interactions_command() {
        let args = vec!["rx-verify", "interactions", "warfarin", "aspirin", "ibuprofen"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Interactions { names } => assert_eq!(names.len(), 3),
            _ => panic!("Expected Interactions command"),
        }
    }

    #[test]
    fn test_cli_interactions_needs_two_names() {
        assert!(Cli::try_parse_from(vec!["rx-verify", "interactions", "warfarin"]).is_err());
    }

    #[test]
    fn test_cli_parse_init_command() {
        let cli = Cli::try_parse_from(vec!["rx-verify", "init", "--force"]).unwrap();
        match cli.command {
            Commands::Init { force } => assert!(force),
            _ => panic!("Expected Init command"),
        }

        let cli = Cli::try_parse_from(vec!["rx-verify", "init"]).unwrap();
        match cli.command {
            Commands::Init { force } => assert!(!force),
            _ => panic!("Expected Init command"),
        }
    }

    #[test]
    fn test_cli_parse_config_subcommands() {
        let cli = Cli::try_parse_from(vec!["rx-verify", "config", "get", "lookup.base_url"]).unwrap();
        match cli.command {
            Commands::Config { action: ConfigAction::Get { key } } => assert_eq!(key, "lookup.base_url"),
            _ => panic!("Expected Config Get command"),
        }

        let cli = Cli::try_parse_from(vec!["rx-verify", "config", "reset", "-f"]).unwrap();
        match cli.command {
            Commands::Config { action: ConfigAction::Reset { force } } => assert!(force),
            _ => panic!("Expected Config Reset command"),
        }

        let cli = Cli::try_parse_from(vec!["rx-verify", "config", "show"]).unwrap();
        assert!(matches!(cli.command, Commands::Config { action: ConfigAction::Show }));
    }

    #[test]
    fn test_cli_global_flags() {
        let args = vec![
            "rx-verify",
            "-v",
            "--config", "/path/to/config.toml",
            "lookup", "aspirin",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.toml")));
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(vec!["rx-verify", "lookup", "aspirin", "--verbose"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        assert!(Cli::try_parse_from(vec!["rx-verify"]).is_err());
    }

    #[test]
    fn test_cli_verify_app() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_drug_arg() {
        let plain = parse_drug_arg(" warfarin ", None);
        assert_eq!(plain.text, "warfarin");
        assert!(plain.dose.is_none());

        let dosed = parse_drug_arg("aspirin = 81 mg", Some("daily"));
        assert_eq!(dosed.text, "aspirin");
        assert_eq!(dosed.dose, Some(DoseInput::Text("81 mg".to_string())));
        assert_eq!(dosed.frequency.as_deref(), Some("daily"));
    }
}
