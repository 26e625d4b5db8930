/*!
 * Period Generators
 * Constant and exponentially jittered delays for burst and sample timers
 *
 * The exponential form gives Poisson-process spacing, so the sampling grid
 * cannot phase-lock to periodic patterns in the access stream.
 */

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::errors::SamplerError;

/// Delay strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    /// Always exactly the mean period
    Constant,
    /// Exponentially distributed around the mean period
    Exponential,
}

impl FromStr for PeriodKind {
    type Err = SamplerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "const" | "constant" => Ok(Self::Constant),
            "exp" | "exponential" => Ok(Self::Exponential),
            other => Err(SamplerError::Configuration(format!(
                "unknown period generator `{}`",
                other
            ))),
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant => f.write_str("const"),
            Self::Exponential => f.write_str("exp"),
        }
    }
}

/// A mean period paired with the strategy that jitters it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodGenerator {
    pub kind: PeriodKind,
    pub period: u64,
}

impl PeriodGenerator {
    pub const fn new(kind: PeriodKind, period: u64) -> Self {
        Self { kind, period }
    }

    pub const fn constant(period: u64) -> Self {
        Self::new(PeriodKind::Constant, period)
    }

    pub const fn exponential(period: u64) -> Self {
        Self::new(PeriodKind::Exponential, period)
    }

    /// Draw the next delay
    #[inline]
    pub fn next<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        match self.kind {
            PeriodKind::Constant => self.period,
            PeriodKind::Exponential => exponential(self.period, rng),
        }
    }
}

/// `round(-period * ln(1 - U))` with `U` uniform in `[0, 1)`
fn exponential<R: Rng + ?Sized>(period: u64, rng: &mut R) -> u64 {
    if period == 0 {
        return 0;
    }
    let u: f64 = rng.gen();
    let delay = -(period as f64) * (1.0 - u).ln();
    // `as` saturates for out-of-range floats
    delay.round() as u64
}
