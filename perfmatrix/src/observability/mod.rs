//! Observability utilities.

mod tracing;

pub use tracing::{default_directive, init_logging, LogFormat, SpanTimer};
