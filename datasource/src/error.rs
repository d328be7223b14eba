use common::GatewayError;

pub type DsResult<T> = Result<T, DataSourceError>;

/// Backend-local error detail, always convertible into the crate-wide
/// [`GatewayError`] at the point where a backend call returns to the
/// executor.
#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error(transparent)]
    Constraint(#[from] GatewayError),

    #[error("backend is read-only")]
    ReadOnly,

    #[error("not connected")]
    NotConnected,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<DataSourceError> for GatewayError {
    fn from(err: DataSourceError) -> Self {
        match err {
            DataSourceError::UnknownTable(t) => GatewayError::UnknownTable(t),
            DataSourceError::UnknownColumn(c) => GatewayError::UnknownColumn(c),
            DataSourceError::Constraint(inner) => inner,
            DataSourceError::ReadOnly => GatewayError::UnsupportedConstruct("backend is read-only".into()),
            DataSourceError::NotConnected => GatewayError::Backend("not connected".into()),
            DataSourceError::Io(e) => GatewayError::Io(e),
            DataSourceError::Backend(msg) => GatewayError::Backend(msg),
        }
    }
}
