//! Observability for the Stratus node.
//!
//! Structured logging through `tracing-subscriber`, pretty or JSON. HTTP
//! requests are traced by the router's `TraceLayer`.

mod logging;

pub use logging::{default_filter, init_logging, LogFormat};
