//! CLI subcommand handlers.

use anyhow::Context;
use credence_core::config::{load_config, load_config_file};
use credence_core::{
    AggregationRule, Document, VerificationReport, Verifier, VerifierConfig, argdown,
    load_document,
};
use std::path::Path;
use tracing::info;

use crate::AggregationArg;
use crate::Commands;
use crate::ConfigAction;
use crate::OutputFormat;
use crate::VerifyArgs;

/// Handle a CLI subcommand. Returns whether the run produced error-class
/// findings.
pub fn handle_command(
    command: Commands,
    workspace: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<bool> {
    match command {
        Commands::Verify(args) => {
            let config = resolve_config(workspace, config_path)?;
            let (report, rendered) = run_verify(&args, config)?;
            println!("{rendered}");
            Ok(report.has_errors())
        }
        Commands::Config { action } => {
            handle_config(action, workspace, config_path)?;
            Ok(false)
        }
    }
}

fn resolve_config(workspace: &Path, config_path: Option<&Path>) -> anyhow::Result<VerifierConfig> {
    let config = match config_path {
        Some(path) => load_config_file(path),
        None => load_config(Some(workspace), None),
    };
    config.map_err(|e| anyhow::anyhow!("Configuration error: {}", e))
}

/// Load the input, verify it, and render the report in the requested format.
fn run_verify(
    args: &VerifyArgs,
    mut config: VerifierConfig,
) -> anyhow::Result<(VerificationReport, String)> {
    apply_overrides(&mut config, args);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid option: {}", e))?;

    let document = load_input(&args.file, args.argdown)?;
    let report = Verifier::new(config).verify(&document);
    info!(
        file = %args.file.display(),
        errors = report.summary.errors,
        "Verified document"
    );

    let rendered = match args.format {
        OutputFormat::Text => report.render_text(),
        OutputFormat::Json => report.to_json()?,
    };
    Ok((report, rendered))
}

fn load_input(path: &Path, argdown_export: bool) -> anyhow::Result<Document> {
    if !argdown_export {
        return load_document(path).with_context(|| format!("Failed to load {}", path.display()));
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let export: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    Ok(argdown::from_export(&export)?)
}

/// Command-line flags win over every configuration layer.
fn apply_overrides(config: &mut VerifierConfig, args: &VerifyArgs) {
    if let Some(epsilon) = args.epsilon {
        config.epsilon = epsilon;
    }
    if let Some(tolerance) = args.contradiction_tolerance {
        config.contradiction_tolerance = tolerance;
    }
    if let Some(delta) = args.delta {
        config.crux.delta = delta;
    }
    if args.no_crux {
        config.crux.enabled = false;
    }
    match args.aggregation {
        Some(AggregationArg::LogOddsSum) => config.aggregation = AggregationRule::LogOddsSum,
        Some(AggregationArg::Mean) => config.aggregation = AggregationRule::Mean,
        // Keep configured weights if there are any.
        Some(AggregationArg::Weighted) => {
            if !matches!(config.aggregation, AggregationRule::Weighted { .. }) {
                config.aggregation = AggregationRule::Weighted {
                    support_weight: 1.0,
                    attack_weight: 1.0,
                };
            }
        }
        None => {}
    }
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".credence");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&VerifierConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = resolve_config(workspace, config_path)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const VIOLATING: &str = r#"{
        "statements": [
            { "title": "Strong", "credence": 0.95 },
            { "title": "Weak", "credence": 0.8 }
        ],
        "relations": [ { "kind": "entails", "from": "Strong", "to": "Weak" } ]
    }"#;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_config_init_creates_file() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path();

        let command = Commands::Config {
            action: ConfigAction::Init,
        };
        handle_command(command, workspace, None).unwrap();

        let config_path = workspace.join(".credence").join("config.toml");
        assert!(config_path.exists());

        // Verify it's valid TOML
        let content = std::fs::read_to_string(&config_path).unwrap();
        let parsed: VerifierConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed, VerifierConfig::default());
    }

    #[test]
    fn test_config_init_idempotent() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path();
        let config_path = workspace.join(".credence").join("config.toml");

        handle_config(ConfigAction::Init, workspace, None).unwrap();
        std::fs::write(&config_path, "epsilon = 0.001\n").unwrap();
        handle_config(ConfigAction::Init, workspace, None).unwrap();

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert_eq!(content, "epsilon = 0.001\n");
    }

    #[test]
    fn test_verify_reports_findings() {
        let dir = TempDir::new().unwrap();
        let args = VerifyArgs {
            file: write(&dir, "doc.json", VIOLATING),
            ..Default::default()
        };
        let (report, rendered) = run_verify(&args, VerifierConfig::default()).unwrap();
        assert!(report.has_errors());
        assert!(rendered.contains("ENTAILMENT: [Strong] entails [Weak]"));
    }

    #[test]
    fn test_verify_json_output() {
        let dir = TempDir::new().unwrap();
        let args = VerifyArgs {
            file: write(&dir, "doc.json", VIOLATING),
            format: OutputFormat::Json,
            ..Default::default()
        };
        let (_, rendered) = run_verify(&args, VerifierConfig::default()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(json["violations"][0]["kind"], "entailment");
        assert_eq!(json["summary"]["errors"], 1);
    }

    #[test]
    fn test_overrides_are_validated() {
        let dir = TempDir::new().unwrap();
        let args = VerifyArgs {
            file: write(&dir, "doc.json", VIOLATING),
            epsilon: Some(0.7),
            ..Default::default()
        };
        assert!(run_verify(&args, VerifierConfig::default()).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = VerifierConfig::default();
        let args = VerifyArgs {
            delta: Some(0.05),
            contradiction_tolerance: Some(0.02),
            aggregation: Some(AggregationArg::Weighted),
            no_crux: true,
            ..Default::default()
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.crux.delta, 0.05);
        assert_eq!(config.contradiction_tolerance, 0.02);
        assert!(!config.crux.enabled);
        assert_eq!(
            config.aggregation,
            AggregationRule::Weighted {
                support_weight: 1.0,
                attack_weight: 1.0,
            }
        );
    }

    #[test]
    fn test_argdown_input() {
        let dir = TempDir::new().unwrap();
        let export = r#"{
            "statements": {
                "A": { "data": { "credence": 0.5 } },
                "B": {}
            },
            "arguments": {
                "Arg": {
                    "pcs": [
                        { "title": "A", "role": "premise" },
                        { "title": "B", "role": "main-conclusion",
                          "inference": { "data": { "inference": 0.5 } } }
                    ]
                }
            }
        }"#;
        let args = VerifyArgs {
            file: write(&dir, "export.json", export),
            argdown: true,
            ..Default::default()
        };
        let (report, _) = run_verify(&args, VerifierConfig::default()).unwrap();
        assert_eq!(report.credence_of("B"), Some(0.25));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let args = VerifyArgs {
            file: PathBuf::from("/nonexistent/doc.yaml"),
            ..Default::default()
        };
        assert!(run_verify(&args, VerifierConfig::default()).is_err());
    }
}
