/*!
 * Monitoring
 * Logging setup and timed operation spans
 */

mod tracer;

pub use tracer::{init_tracing, span_operation, verbosity_filter, OperationSpan};
