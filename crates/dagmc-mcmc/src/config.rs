use std::fs;
use std::path::{Path, PathBuf};

use dagmc_core::{ErrorInfo, McmcError};
use serde::{Deserialize, Serialize};

/// YAML-configurable parameters governing a chain run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Total number of iterations, including the initial state at iteration 0.
    pub iterations: u64,
    /// Iterations skipped before sampling starts.
    #[serde(default)]
    pub burn_in: u64,
    /// Sample every `thinning`-th iteration.
    #[serde(default = "default_thinning")]
    pub thinning: u64,
    /// Master seed and label.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Proposer selection settings.
    #[serde(default)]
    pub selector: SelectorConfig,
    /// Acceptance rule.
    #[serde(default)]
    pub acceptor: AcceptorConfig,
    /// Sample output settings.
    #[serde(default)]
    pub output: OutputConfig,
    /// Retry ceiling for bounded-domain proposals.
    #[serde(default = "default_max_attempts")]
    pub proposal_max_attempts: usize,
}

fn default_thinning() -> u64 {
    1
}

fn default_max_attempts() -> usize {
    100
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            burn_in: 0,
            thinning: default_thinning(),
            seed_policy: SeedPolicy::default(),
            selector: SelectorConfig::default(),
            acceptor: AcceptorConfig::default(),
            output: OutputConfig::default(),
            proposal_max_attempts: default_max_attempts(),
        }
    }
}

fn serde_error(code: &str, err: impl ToString) -> McmcError {
    McmcError::Serde(ErrorInfo::new(code, err.to_string()))
}

impl RunConfig {
    /// Parses a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, McmcError> {
        serde_yaml::from_str(text).map_err(|err| serde_error("yaml_deserialize", err))
    }

    /// Serialises to YAML.
    pub fn to_yaml_string(&self) -> Result<String, McmcError> {
        serde_yaml::to_string(self).map_err(|err| serde_error("yaml_serialize", err))
    }

    /// Loads and validates a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, McmcError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            McmcError::Io(
                ErrorInfo::new("config_read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        let config = Self::from_yaml_str(&text).map_err(|err| match err {
            McmcError::Serde(info) => {
                McmcError::Serde(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings no run can honour.
    pub fn validate(&self) -> Result<(), McmcError> {
        if self.iterations == 0 {
            return Err(McmcError::config("iterations", "at least one iteration is required"));
        }
        if self.thinning == 0 {
            return Err(McmcError::config("thinning", "thinning period must be positive"));
        }
        if self.proposal_max_attempts == 0 {
            return Err(McmcError::config(
                "max-attempts",
                "proposal attempt ceiling must be positive",
            ));
        }
        self.selector.validate()?;
        self.acceptor.validate()?;
        self.output.validate()
    }
}

/// Seeding configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed; derived from the wall clock when absent.
    #[serde(default)]
    pub master_seed: Option<u64>,
    /// Optional label recorded in manifests.
    #[serde(default)]
    pub label: Option<String>,
}

/// Proposer selection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// `simultaneous_weights[i]` is the relative weight of applying `i + 1`
    /// proposers in one iteration.
    #[serde(default = "default_simultaneous_weights")]
    pub simultaneous_weights: Vec<f64>,
    /// Draws attempted before settling for fewer proposers.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

fn default_simultaneous_weights() -> Vec<f64> {
    vec![1.0]
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            simultaneous_weights: default_simultaneous_weights(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl SelectorConfig {
    fn validate(&self) -> Result<(), McmcError> {
        if self.simultaneous_weights.is_empty()
            || self.simultaneous_weights.iter().any(|w| !(*w >= 0.0 && w.is_finite()))
            || self.simultaneous_weights.iter().sum::<f64>() <= 0.0
        {
            return Err(McmcError::Config(
                ErrorInfo::new(
                    "simultaneous-weights",
                    "simultaneous weights must be non-negative and not all zero",
                )
                .with_context("weights", format!("{:?}", self.simultaneous_weights)),
            ));
        }
        if self.max_attempts == 0 {
            return Err(McmcError::config(
                "max-attempts",
                "selector attempt ceiling must be positive",
            ));
        }
        Ok(())
    }
}

/// Acceptance rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AcceptorConfig {
    /// Metropolis-Hastings ratio test.
    #[default]
    MetropolisHastings,
    /// Greedy improvement test.
    HillClimbing {
        /// Natural-log margin an improvement must exceed; zero is strict.
        #[serde(default)]
        log_tolerance: f64,
        /// Consecutive non-improving iterations tolerated before stopping.
        #[serde(default)]
        max_stale_iterations: Option<u64>,
    },
}

impl AcceptorConfig {
    fn validate(&self) -> Result<(), McmcError> {
        match self {
            AcceptorConfig::HillClimbing { log_tolerance, .. }
                if !(*log_tolerance >= 0.0 && log_tolerance.is_finite()) =>
            {
                Err(McmcError::Config(
                    ErrorInfo::new(
                        "log-tolerance",
                        "hill-climbing tolerance must be finite and non-negative",
                    )
                    .with_context("log_tolerance", log_tolerance.to_string()),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Sample output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Column delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Symbol written instead of a value equal to the previous sample's.
    #[serde(default)]
    pub concise_symbol: Option<String>,
    /// Flush the sample stream after every row.
    #[serde(default)]
    pub flush_after_sample: bool,
    /// Where to write the run manifest, if anywhere.
    #[serde(default)]
    pub manifest_file: Option<PathBuf>,
}

fn default_delimiter() -> String {
    "\t".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            concise_symbol: None,
            flush_after_sample: false,
            manifest_file: None,
        }
    }
}

impl OutputConfig {
    fn validate(&self) -> Result<(), McmcError> {
        if self.delimiter.is_empty() {
            return Err(McmcError::config("empty-delimiter", "sample delimiter must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_uses_defaults() {
        let config = RunConfig::from_yaml_str("iterations: 50\n").unwrap();
        assert_eq!(config.iterations, 50);
        assert_eq!(config.thinning, 1);
        assert_eq!(config.selector.simultaneous_weights, vec![1.0]);
        assert_eq!(config.acceptor, AcceptorConfig::MetropolisHastings);
        assert_eq!(config.output.delimiter, "\t");
        assert_eq!(config.proposal_max_attempts, 100);
        config.validate().unwrap();
    }

    #[test]
    fn hill_climbing_section_parses() {
        let yaml = "iterations: 10\nacceptor:\n  type: hill-climbing\n  max_stale_iterations: 5\n";
        let config = RunConfig::from_yaml_str(yaml).unwrap();
        match config.acceptor {
            AcceptorConfig::HillClimbing {
                log_tolerance,
                max_stale_iterations,
            } => {
                assert_eq!(log_tolerance, 0.0);
                assert_eq!(max_stale_iterations, Some(5));
            }
            other => panic!("unexpected acceptor {other:?}"),
        }
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut config = RunConfig::default();
        config.thinning = 0;
        assert_eq!(config.validate().unwrap_err().info().code, "thinning");

        let mut config = RunConfig::default();
        config.selector.simultaneous_weights = vec![0.0, 0.0];
        assert_eq!(
            config.validate().unwrap_err().info().code,
            "simultaneous-weights"
        );

        let mut config = RunConfig::default();
        config.output.delimiter.clear();
        assert!(config.validate().is_err());

        let mut config = RunConfig::default();
        config.acceptor = AcceptorConfig::HillClimbing {
            log_tolerance: -1e-3,
            max_stale_iterations: None,
        };
        assert_eq!(config.validate().unwrap_err().info().code, "log-tolerance");

        assert!(RunConfig::from_yaml_str("iterations: [").is_err());
    }
}
