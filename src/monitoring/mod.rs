/*!
 * Monitoring Module
 * Structured tracing setup and report emission for hosts
 */

pub mod tracer;

pub use tracer::{emit_report, init_tracing};
