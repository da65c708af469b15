use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::dispatch::ModelKind;
use crate::mac::{MacParams, TechInput};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const ENV_PREFIX: &str = "MACD__";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub mac: MacParams,
    #[serde(default)]
    pub tech: TechConfig,
    #[serde(default)]
    #[validate(nested)]
    pub report: ReportConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Technology table given as parallel vectors; empty means the default table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechConfig {
    #[serde(default)]
    pub theta: Vec<f64>,
    #[serde(default)]
    pub cost: Vec<f64>,
    #[serde(default)]
    pub sigma: Vec<f64>,
}

impl TechConfig {
    pub fn to_input(&self) -> TechInput {
        if self.theta.is_empty() && self.cost.is_empty() && self.sigma.is_empty() {
            TechInput::Default
        } else {
            TechInput::Values {
                theta: self.theta.clone(),
                cost: self.cost.clone(),
                sigma: self.sigma.clone(),
            }
        }
    }
}

/// Grid used for curve reports.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReportConfig {
    #[validate(range(min = 2, max = 100_000))]
    pub grid_points: usize,
    /// Lowest energy use as a share of the unregulated level
    #[validate(range(exclusive_min = 0.0))]
    pub grid_min_share: f64,
    /// Highest energy use as a share of the unregulated level
    #[validate(range(exclusive_min = 0.0))]
    pub grid_max_share: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            grid_points: 25,
            grid_min_share: 0.1,
            grid_max_share: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub model: ModelKind,
    /// Scenario file; the model's built-in sample is used when absent
    #[serde(default)]
    pub scenario: Option<PathBuf>,
    pub seed: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::I,
            scenario: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Defaults, then `config/default.toml`, then `MACD__` environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        let cfg: Config = figment
            .extract()
            .with_context(|| format!("loading configuration from {}", path.display()))?;
        cfg.check()?;
        Ok(cfg)
    }

    pub fn check(&self) -> Result<()> {
        self.validate().context("invalid configuration")?;
        self.mac.check().context("invalid MAC parameters")?;
        if self.report.grid_min_share >= self.report.grid_max_share {
            anyhow::bail!(
                "report.grid_min_share ({}) must be below report.grid_max_share ({})",
                self.report.grid_min_share,
                self.report.grid_max_share
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("/nonexistent/config.toml").unwrap();
        assert_eq!(cfg.mac, MacParams::default());
        assert_eq!(cfg.dispatch.model, ModelKind::I);
        assert!(matches!(cfg.tech.to_input(), TechInput::Default));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[mac]
alpha = 0.4
gamma = 2.0
pe = 1.0
phi = 0.5
gamma_d = 10.0

[tech]
theta = [0.2, 0.3]
cost = [1.0, 4.0]
sigma = [0.5, 1.0]

[dispatch]
model = "iii"
seed = 7
"#,
        )
        .unwrap();
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.mac.alpha, 0.4);
        assert_eq!(cfg.dispatch.model, ModelKind::III);
        assert_eq!(cfg.dispatch.seed, 7);
        assert!(matches!(cfg.tech.to_input(), TechInput::Values { .. }));
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[mac]\nalpha = 1.5\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
