/*!
 * Sampler Configuration
 * Immutable run parameters, built in code or loaded from the environment
 *
 * Environment variables (all optional):
 * - SAMPLER_OUTPUT: output base path (default: sample)
 * - SAMPLER_SAMPLE_PERIOD / SAMPLER_SAMPLE_RND: mean sample period and generator
 * - SAMPLER_BURST_PERIOD / SAMPLER_BURST_RND: mean burst period and generator
 * - SAMPLER_BURST_SIZE: burst length, 0 for one unbounded burst
 * - SAMPLER_LINE_SIZE_LG2: cache line size exponent
 * - SAMPLER_SEED: random seed
 */

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use super::period::{PeriodGenerator, PeriodKind};
use crate::core::errors::SamplerError;
use crate::core::limits::*;
use crate::core::types::SamplerResult;

/// Sampler run parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Burst segments are written to `<base_path>.<index>`
    pub base_path: PathBuf,
    pub sample: PeriodGenerator,
    pub burst: PeriodGenerator,
    /// Accesses per burst; 0 samples continuously in a single burst
    pub burst_size: u64,
    pub line_size_lg2: u8,
    pub seed: u64,
    /// Command line recorded in every segment header
    #[serde(default)]
    pub argv: Vec<String>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from(DEFAULT_OUTPUT_BASE),
            sample: PeriodGenerator::exponential(DEFAULT_SAMPLE_PERIOD),
            burst: PeriodGenerator::exponential(DEFAULT_BURST_PERIOD),
            burst_size: DEFAULT_BURST_SIZE,
            line_size_lg2: DEFAULT_LINE_SIZE_LG2,
            seed: DEFAULT_SEED,
            argv: Vec::new(),
        }
    }
}

impl SamplerConfig {
    pub fn builder() -> SamplerConfigBuilder {
        SamplerConfigBuilder::new()
    }

    /// Load from `SAMPLER_*` environment variables, falling back to defaults
    pub fn from_env() -> SamplerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> SamplerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            base_path: lookup("SAMPLER_OUTPUT")
                .map(PathBuf::from)
                .unwrap_or(defaults.base_path),
            sample: PeriodGenerator::new(
                parse_var(&lookup, "SAMPLER_SAMPLE_RND", defaults.sample.kind)?,
                parse_var(&lookup, "SAMPLER_SAMPLE_PERIOD", defaults.sample.period)?,
            ),
            burst: PeriodGenerator::new(
                parse_var(&lookup, "SAMPLER_BURST_RND", defaults.burst.kind)?,
                parse_var(&lookup, "SAMPLER_BURST_PERIOD", defaults.burst.period)?,
            ),
            burst_size: parse_var(&lookup, "SAMPLER_BURST_SIZE", defaults.burst_size)?,
            line_size_lg2: parse_var(&lookup, "SAMPLER_LINE_SIZE_LG2", defaults.line_size_lg2)?,
            seed: parse_var(&lookup, "SAMPLER_SEED", defaults.seed)?,
            argv: Vec::new(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject parameters the engine cannot run with
    pub fn validate(&self) -> SamplerResult<()> {
        if self.base_path.as_os_str().is_empty() {
            return Err(SamplerError::Configuration(
                "output base path must not be empty".into(),
            ));
        }
        if self.line_size_lg2 > MAX_LINE_SIZE_LG2 {
            return Err(SamplerError::Configuration(format!(
                "line size exponent {} exceeds {}",
                self.line_size_lg2, MAX_LINE_SIZE_LG2
            )));
        }
        Ok(())
    }

    /// Line size in bytes
    pub fn line_size(&self) -> u64 {
        1u64 << self.line_size_lg2
    }

    /// Whether the sampler runs a single unbounded burst
    pub fn is_continuous(&self) -> bool {
        self.burst_size == 0
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> SamplerResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| SamplerError::Configuration(format!("{}={:?}: {}", key, raw, e))),
    }
}

/// Convert a power-of-two line size in bytes to its exponent
pub fn line_size_lg2(bytes: u64) -> SamplerResult<u8> {
    if !bytes.is_power_of_two() {
        return Err(SamplerError::Configuration(format!(
            "line size {} is not a power of two",
            bytes
        )));
    }
    Ok(bytes.trailing_zeros() as u8)
}

/// Builder for SamplerConfig
#[derive(Debug, Clone, Default)]
pub struct SamplerConfigBuilder {
    config: SamplerConfig,
}

impl SamplerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.base_path = path.into();
        self
    }

    pub fn sample_period(mut self, period: u64) -> Self {
        self.config.sample.period = period;
        self
    }

    pub fn sample_kind(mut self, kind: PeriodKind) -> Self {
        self.config.sample.kind = kind;
        self
    }

    pub fn burst_period(mut self, period: u64) -> Self {
        self.config.burst.period = period;
        self
    }

    pub fn burst_kind(mut self, kind: PeriodKind) -> Self {
        self.config.burst.kind = kind;
        self
    }

    pub fn burst_size(mut self, size: u64) -> Self {
        self.config.burst_size = size;
        self
    }

    pub fn line_size_lg2(mut self, lg2: u8) -> Self {
        self.config.line_size_lg2 = lg2;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn argv(mut self, argv: Vec<String>) -> Self {
        self.config.argv = argv;
        self
    }

    /// Validate and build
    pub fn build(self) -> SamplerResult<SamplerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
