/*!
 * Monitoring
 * Structured logging for the synchronization primitives
 */

mod tracer;

pub use tracer::{init_tracing, try_init_tracing, TRACE_JSON_ENV};
