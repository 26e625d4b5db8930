/*!
 * Sampler
 * Burst-based reuse sampling of a memory-access stream
 */

pub mod burst;
pub mod config;
pub mod engine;
pub mod period;
pub mod watchpoint;

pub use burst::{Burst, BurstManager};
pub use config::{line_size_lg2, SamplerConfig, SamplerConfigBuilder};
pub use engine::{Sampler, SamplerStats};
pub use period::{PeriodGenerator, PeriodKind};
pub use watchpoint::{Watchpoint, WatchpointTable};
