use common::GatewayError;

pub type ExecResult<T> = Result<T, ExecError>;

/// Execution-time errors, per spec.md §7's "execution error (runtime
/// type mismatch, arithmetic failure, backend error)" and "resource
/// error (pool exhausted, memory budget exceeded)" kinds.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("unknown data source: {0}")]
    UnknownDataSource(String),

    #[error("backend error: {0}")]
    Backend(#[from] datasource::DataSourceError),

    #[error("query cancelled")]
    Cancelled,

    #[error("memory budget of {0} bytes exceeded and paging is disabled")]
    MemoryBudgetExceeded(usize),

    #[error("paging spill failed: {0}")]
    Spill(#[from] std::io::Error),

    #[error("runtime type error: {0}")]
    TypeError(String),
}

impl From<ExecError> for GatewayError {
    fn from(err: ExecError) -> Self {
        match err {
            ExecError::UnknownDataSource(name) => GatewayError::UnknownTable(name),
            ExecError::Backend(inner) => inner.into(),
            ExecError::Cancelled => GatewayError::Execution("query cancelled".into()),
            ExecError::MemoryBudgetExceeded(bytes) => GatewayError::MemoryBudgetExceeded(format!("{bytes} bytes")),
            ExecError::Spill(e) => GatewayError::Io(e),
            ExecError::TypeError(msg) => GatewayError::Execution(msg),
        }
    }
}
