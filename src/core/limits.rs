/*!
 * Sampler Limits and Defaults
 *
 * Centralized location for defaults, bounds and format constants.
 * Organized by domain for maintainability and discoverability.
 */

// =============================================================================
// SAMPLING DEFAULTS
// =============================================================================

/// Default cache line size exponent (64-byte lines)
pub const DEFAULT_LINE_SIZE_LG2: u8 = 6;

/// Largest accepted line size exponent
/// Shifting a 64-bit address by 64 or more is meaningless
pub const MAX_LINE_SIZE_LG2: u8 = 63;

/// Default mean number of accesses between armed watchpoints
pub const DEFAULT_SAMPLE_PERIOD: u64 = 100_000;

/// Default mean number of accesses between burst starts
pub const DEFAULT_BURST_PERIOD: u64 = 0;

/// Default burst length (0 = one unbounded burst)
pub const DEFAULT_BURST_SIZE: u64 = 0;

/// Default random seed
pub const DEFAULT_SEED: u64 = 0;

/// Smallest forward step of the sampling timer
/// Guarantees the sampling tick always lies in the future
pub const MIN_SAMPLE_ADVANCE: u64 = 1;

/// Default output base path for burst segments
pub const DEFAULT_OUTPUT_BASE: &str = "sample";

// =============================================================================
// WATCHPOINT TABLE
// =============================================================================

/// Initial capacity of the watchpoint table
/// [PERF] Live watchpoints rarely exceed this for typical sample periods
pub const WATCHPOINT_TABLE_CAPACITY: usize = 1024;

// =============================================================================
// TRACE FORMAT
// =============================================================================

/// Magic bytes at the start of every trace segment
pub const TRACE_MAGIC: [u8; 8] = *b"RSAMPLE\0";

/// Current trace format version
pub const TRACE_FORMAT_VERSION: u32 = 1;

/// Maximum size of a single framed record (16MB)
/// [SECURITY] Bounds allocation when reading corrupted or hostile files
pub const MAX_TRACE_RECORD_SIZE: usize = 16 * 1024 * 1024;

/// Buffer size for segment writers and readers (64KB)
pub const TRACE_BUFFER_SIZE: usize = 64 * 1024;

// =============================================================================
// OBSERVABILITY
// =============================================================================

/// Operations slower than this are logged as warnings (milliseconds)
pub const SLOW_OPERATION_MS: u128 = 1000;
