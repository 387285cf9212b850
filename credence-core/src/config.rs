//! Configuration system for the credence verifier.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from `~/.config/credence/config.toml` and/or
//! `.credence/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// How incoming `entails` and `contrary` relations are combined into the
/// credence of a top-level claim.
///
/// Every rule works in log-odds space: an entailing source with credence `p`
/// contributes `+logit(p)`, a contrary source contributes `-logit(p)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum AggregationRule {
    /// Plain sum of contributions. Independent sources compound.
    #[default]
    LogOddsSum,
    /// Sum with supports and attacks scaled separately.
    Weighted {
        support_weight: f64,
        attack_weight: f64,
    },
    /// Mean of contributions. The result never exceeds the strongest source.
    Mean,
}

impl AggregationRule {
    /// Combine per-source log-odds contributions. `supports` and `attacks`
    /// hold signed contributions (attacks are already negated).
    pub fn combine(&self, supports: &[f64], attacks: &[f64]) -> f64 {
        let support_sum: f64 = supports.iter().sum();
        let attack_sum: f64 = attacks.iter().sum();
        match self {
            AggregationRule::LogOddsSum => support_sum + attack_sum,
            AggregationRule::Weighted {
                support_weight,
                attack_weight,
            } => support_weight * support_sum + attack_weight * attack_sum,
            AggregationRule::Mean => {
                let n = supports.len() + attacks.len();
                if n == 0 {
                    0.0
                } else {
                    (support_sum + attack_sum) / n as f64
                }
            }
        }
    }
}

/// Top-level configuration for the verifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Credences are clamped into `[epsilon, 1 - epsilon]` before taking log-odds.
    pub epsilon: f64,
    /// Allowed distance of a contradiction pair's sum from 1.0.
    pub contradiction_tolerance: f64,
    /// Slack used for the `>=` and `<=` checks so float rounding does not
    /// produce violations.
    pub comparison_tolerance: f64,
    /// Aggregation rule for top-level claims.
    pub aggregation: AggregationRule,
    /// Crux analysis settings.
    pub crux: CruxConfig,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            contradiction_tolerance: 0.01,
            comparison_tolerance: 1e-9,
            aggregation: AggregationRule::default(),
            crux: CruxConfig::default(),
        }
    }
}

/// Configuration for sensitivity analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CruxConfig {
    /// Whether crux analysis runs at all.
    pub enabled: bool,
    /// Perturbation applied to each leaf credence in both directions.
    pub delta: f64,
}

impl Default for CruxConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delta: 0.1,
        }
    }
}

impl VerifierConfig {
    /// Reject values that would make the numeric checks meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.epsilon > 0.0 && self.epsilon < 0.5) {
            return Err(ConfigError::Invalid {
                message: format!("epsilon must be in (0, 0.5), got {}", self.epsilon),
            });
        }
        if !(self.contradiction_tolerance >= 0.0 && self.contradiction_tolerance.is_finite()) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "contradiction_tolerance must be non-negative, got {}",
                    self.contradiction_tolerance
                ),
            });
        }
        if !(self.comparison_tolerance >= 0.0 && self.comparison_tolerance.is_finite()) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "comparison_tolerance must be non-negative, got {}",
                    self.comparison_tolerance
                ),
            });
        }
        if !(self.crux.delta > 0.0 && self.crux.delta <= 1.0) {
            return Err(ConfigError::Invalid {
                message: format!("crux.delta must be in (0, 1], got {}", self.crux.delta),
            });
        }
        if let AggregationRule::Weighted {
            support_weight,
            attack_weight,
        } = self.aggregation
        {
            let valid = |w: f64| w.is_finite() && w >= 0.0;
            if !(valid(support_weight) && valid(attack_weight)) {
                return Err(ConfigError::Invalid {
                    message: format!(
                        "aggregation weights must be finite and non-negative, got {support_weight} and {attack_weight}"
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `CREDENCE_`)
/// 3. Workspace-local config (`.credence/config.toml`)
/// 4. User config (`~/.config/credence/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&VerifierConfig>,
) -> Result<VerifierConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(VerifierConfig::default()));

    // User-level config
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "credence", "credence") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(".credence").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (CREDENCE_EPSILON, CREDENCE_CRUX__DELTA, etc.)
    figment = figment.merge(Env::prefixed("CREDENCE_").split("__"));

    // Explicit overrides
    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: VerifierConfig = figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a single TOML file layered over the defaults.
pub fn load_config_file(path: &Path) -> Result<VerifierConfig, ConfigError> {
    let config: VerifierConfig = Figment::from(Serialized::defaults(VerifierConfig::default()))
        .merge(Toml::file(path))
        .extract()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
    config.validate()?;
    Ok(config)
}
