/*!
 * Integrations
 * Front ends that feed accesses into a sampler
 */

pub mod replay;
pub mod shared;

pub use replay::{replay, replay_file, ReplayStats};
pub use shared::{ErrorPolicy, SharedSampler};
