use common::GatewayError;

pub type MvccResult<T> = Result<T, MvccError>;

/// Transaction-management errors, per spec.md §7's "transaction error
/// (conflict, deadlock, invalid transaction state)" kind.
#[derive(Debug, thiserror::Error)]
pub enum MvccError {
    #[error("unknown transaction: {0}")]
    UnknownTransaction(u32),

    #[error("invalid transaction state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Backend(#[from] datasource::DataSourceError),
}

impl From<MvccError> for GatewayError {
    fn from(err: MvccError) -> Self {
        match err {
            MvccError::UnknownTransaction(id) => GatewayError::InvalidTransactionState(format!("no such transaction: {id}")),
            MvccError::InvalidState(msg) => GatewayError::InvalidTransactionState(msg),
            MvccError::Backend(inner) => inner.into(),
        }
    }
}

impl From<MvccError> for datasource::DataSourceError {
    fn from(err: MvccError) -> Self {
        match err {
            MvccError::Backend(inner) => inner,
            other => datasource::DataSourceError::Constraint(other.into()),
        }
    }
}
