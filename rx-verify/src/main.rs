//! rx-verify - Prescription Safety Checks
//!
//! Normalizes drug mentions, finds pairwise interactions and checks doses
//! against age-banded reference ranges.

use rx_verify::app::cli::{parse_drug_arg, Cli, Commands, ConfigAction, OutputFormat};
use rx_verify::app::config::Config;
use rx_verify::dataset::{DosageTable, InteractionTable, ReferenceData};
use rx_verify::normalize::types::{DrugMention, Resolution};
use rx_verify::report::SafetyReport;
use rx_verify::workflow::{VerificationRequest, Verifier};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Interaction findings do not depend on age; any adult age will do
const INTERACTIONS_ONLY_AGE: u32 = 40;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first so we can use --verbose to set log level
    let cli = Cli::parse_args();

    // Initialize tracing (--verbose enables debug-level output)
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load config
    let config = if let Some(path) = &cli.config {
        Config::load(path)?
    } else {
        Config::load_default()?
    };

    let runtime = tokio::runtime::Runtime::new()?;

    // Execute command
    match cli.command {
        Commands::Verify {
            input,
            age,
            weight,
            format,
            output,
        } => {
            runtime.block_on(run_verify(&input, age, weight, format, output, &config))?;
        }
        Commands::Check {
            age,
            weight,
            drugs,
            frequency,
            format,
        } => {
            runtime.block_on(run_check(age, weight, &drugs, frequency.as_deref(), format, &config))?;
        }
        Commands::Lookup { name } => {
            runtime.block_on(run_lookup(&name, &config))?;
        }
        Commands::Interactions { names } => {
            runtime.block_on(run_interactions(&names, &config))?;
        }
        Commands::Init { force } => {
            run_init(force, &config)?;
        }
        Commands::Config { action } => {
            run_config(action, &config)?;
        }
    }

    Ok(())
}

fn build_verifier(config: &Config) -> anyhow::Result<Verifier> {
    let reference = ReferenceData::load(&config.datasets)?;
    Ok(Verifier::from_config(config, reference)?)
}

fn emit_report(report: &SafetyReport, format: OutputFormat, output: Option<&Path>) -> anyhow::Result<()> {
    let rendered = match format {
        OutputFormat::Text => report.render_text(),
        OutputFormat::Json => report.to_json()?,
    };

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(path, rendered)?;
            info!("Wrote report {} to {:?}", report.id(), path);
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

async fn run_verify(
    input: &Path,
    age: Option<u32>,
    weight: Option<f64>,
    format: OutputFormat,
    output: Option<PathBuf>,
    config: &Config,
) -> anyhow::Result<()> {
    info!("Verifying prescription from {:?}", input);

    if !input.exists() {
        anyhow::bail!("Request file not found: {:?}", input);
    }

    let mut request = VerificationRequest::load(input)?;
    if let Some(age) = age {
        request.patient_age = age;
    }
    if weight.is_some() {
        request.weight_kg = weight;
    }
    request.validate()?;

    info!(
        "Loaded request with {} mentions (patient age {})",
        request.mentions.len(),
        request.patient_age
    );

    let verifier = build_verifier(config)?;
    let report = verifier.verify(request).await;
    emit_report(&report, format, output.as_deref())
}

async fn run_check(
    age: u32,
    weight: Option<f64>,
    drugs: &[String],
    frequency: Option<&str>,
    format: OutputFormat,
    config: &Config,
) -> anyhow::Result<()> {
    let mut request = VerificationRequest::new(age);
    request.weight_kg = weight;
    for arg in drugs {
        request = request.with_mention(parse_drug_arg(arg, frequency));
    }
    request.validate()?;

    let verifier = build_verifier(config)?;
    let report = verifier.verify(request).await;
    emit_report(&report, format, None)
}

async fn run_lookup(name: &str, config: &Config) -> anyhow::Result<()> {
    let verifier = build_verifier(config)?;
    let drug = verifier.normalizer().normalize_one(DrugMention::new(name)).await?;

    println!("Mention:    {}", drug.mention().trimmed_text());
    match drug.resolution() {
        Resolution::Unresolved { reason } => {
            println!("Resolved:   no ({})", reason);
        }
        _ => {
            println!("Resolved:   {}", drug.display_name());
            println!("RxCUI:      {}", drug.canonical_id().unwrap_or("-"));
            println!("Match:      {}", drug.resolution().label());
        }
    }
    println!("Confidence: {:.2}", drug.confidence().value());

    Ok(())
}

async fn run_interactions(names: &[String], config: &Config) -> anyhow::Result<()> {
    let verifier = build_verifier(config)?;
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let report = verifier
        .verify(VerificationRequest::from_names(INTERACTIONS_ONLY_AGE, &refs))
        .await;

    if report.findings().is_empty() {
        println!("No known interactions among {} drugs", names.len());
    }
    for finding in report.findings() {
        println!(
            "[{}] {} + {}: {}",
            finding.severity.as_str().to_uppercase(),
            finding.drug_a.display_name(),
            finding.drug_b.display_name(),
            finding.record.description
        );
        if let Some(category) = &finding.escalated_by {
            println!("    escalated by {}", category);
        }
    }
    for unchecked in report.unable_to_check() {
        println!("Unable to check {}: {}", unchecked.display_name, unchecked.reason);
    }
    println!("Overall risk: {}", report.overall_risk());

    Ok(())
}

fn run_init(force: bool, config: &Config) -> anyhow::Result<()> {
    let config_path = Config::default_path();

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {:?}. Use --force to overwrite.",
            config_path
        );
    }

    config.save_default()?;
    println!("Created config at {:?}", config_path);
    println!("\nConfig content:\n{}", config.to_toml()?);

    let datasets = &config.datasets;
    if let Some(dir) = datasets.interactions.parent() {
        std::fs::create_dir_all(dir)?;
    }

    println!("\nReference data:");
    if datasets.interactions.exists() && !force {
        warn!("Keeping existing interaction table at {:?}", datasets.interactions);
    } else {
        let sample = InteractionTable::sample();
        sample.write_csv(&datasets.interactions)?;
        println!("  Interactions: {:?} ({} records)", datasets.interactions, sample.len());
    }

    if datasets.dosage_reference.exists() && !force {
        warn!("Keeping existing dosage reference at {:?}", datasets.dosage_reference);
    } else {
        let dosage = DosageTable::builtin();
        dosage.save(&datasets.dosage_reference)?;
        println!("  Dosage:       {:?} ({} drugs)", datasets.dosage_reference, dosage.len());
    }

    if !datasets.drug_index.exists() {
        println!(
            "  Drug index:   {:?} (not found; place RXNCONSO.RRF here for offline normalization)",
            datasets.drug_index
        );
    }

    Ok(())
}

fn run_config(action: ConfigAction, config: &Config) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = config.to_toml()?;
            println!("Configuration ({:?}):\n", Config::default_path());
            println!("{}", toml_str);
        }
        ConfigAction::Get { key } => {
            let value = config.get(&key)?;
            println!("{} = {}", key, value);
        }
        ConfigAction::Reset { force } => {
            let config_path = Config::default_path();

            if config_path.exists() && !force {
                println!("Config exists at {:?}", config_path);
                println!("Use --force to reset to defaults");
                return Ok(());
            }

            let default_config = Config::default();
            default_config.save_default()?;
            println!("Configuration reset to defaults at {:?}", config_path);
        }
    }

    Ok(())
}
