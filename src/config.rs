use crate::reducer::ReducerKind;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path, str::FromStr};

/// Reporting configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub reducer: ReducerConfig,
    #[serde(default)]
    pub input: InputConfig,
}

/// Reducers applied to every series.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReducerConfig {
    /// Reducer modes, in report order.
    pub modes: Vec<ReducerKind>,
}

/// Limits on the series accepted as input.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    /// Maximum number of samples per series.
    pub max_samples: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_samples: 100_000,
        }
    }
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents = fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        contents.parse()
    }

    fn validate(&self) -> Result<()> {
        let modes = &self.reducer.modes;
        check_num(modes.len(), 1..=ReducerKind::ALL.len()).context("invalid number of modes")?;
        for (idx, mode) in modes.iter().enumerate() {
            if modes[..idx].contains(mode) {
                bail!("mode {mode} is listed more than once");
            }
        }

        check_num(self.input.max_samples, 1..=10_000_000)
            .context("invalid maximum number of samples")?;

        Ok(())
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
