mod tracing_factory;

pub use tracing_factory::{LogOutput, TracingFactory};
