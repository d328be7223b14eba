use std::io;

/// Every error kind the core can raise, per the error-handling design:
/// protocol, authentication, schema, constraint, plan, execution,
/// transaction, resource and configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("authentication failed for user '{0}'")]
    AuthenticationFailed(String),

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("incompatible types: {0}")]
    IncompatibleTypes(String),

    #[error("duplicate entry '{value}' for key '{column}'")]
    UniqueViolation { column: String, value: String },

    #[error("foreign key constraint fails: {0}")]
    ForeignKeyViolation(String),

    #[error("column '{0}' cannot be null")]
    NotNullViolation(String),

    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),

    #[error("ambiguous column reference: {0}")]
    AmbiguousReference(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("transaction conflict: {0}")]
    TransactionConflict(String),

    #[error("deadlock detected: {0}")]
    Deadlock(String),

    #[error("invalid transaction state: {0}")]
    InvalidTransactionState(String),

    #[error("connection pool exhausted")]
    PoolExhausted,

    #[error("memory budget exceeded: {0}")]
    MemoryBudgetExceeded(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("utf8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("{0}")]
    Other(String),
}

impl GatewayError {
    /// The MySQL-compatible numeric error code used on the wire.
    pub fn mysql_code(&self) -> u16 {
        match self {
            GatewayError::Protocol(_) => 1047,          // ER_UNKNOWN_COM_ERROR
            GatewayError::AuthenticationFailed(_) => 1045, // ER_ACCESS_DENIED_ERROR
            GatewayError::UnknownTable(_) => 1146,       // ER_NO_SUCH_TABLE
            GatewayError::UnknownColumn(_) => 1054,      // ER_BAD_FIELD_ERROR
            GatewayError::IncompatibleTypes(_) => 1366,  // ER_TRUNCATED_WRONG_VALUE
            GatewayError::UniqueViolation { .. } => 1062, // ER_DUP_ENTRY
            GatewayError::ForeignKeyViolation(_) => 1451, // ER_ROW_IS_REFERENCED_2
            GatewayError::NotNullViolation(_) => 1048,   // ER_BAD_NULL_ERROR
            GatewayError::UnsupportedConstruct(_) => 1235, // ER_NOT_SUPPORTED_YET
            GatewayError::AmbiguousReference(_) => 1052, // ER_NON_UNIQ_ERROR
            GatewayError::Execution(_) => 1105,          // ER_UNKNOWN_ERROR
            GatewayError::Arithmetic(_) => 1690,         // ER_DATA_OUT_OF_RANGE
            GatewayError::Backend(_) => 1105,
            GatewayError::TransactionConflict(_) => 1213, // ER_LOCK_DEADLOCK
            GatewayError::Deadlock(_) => 1213,
            GatewayError::InvalidTransactionState(_) => 1568, // ER_CANT_CHANGE_TX_CHARACTERISTICS
            GatewayError::PoolExhausted => 1040,         // ER_CON_COUNT_ERROR
            GatewayError::MemoryBudgetExceeded(_) => 1038, // ER_OUT_OF_SORTMEMORY
            GatewayError::Configuration(_) => 1045,
            GatewayError::Io(_) => 2013,                 // CR_SERVER_LOST
            GatewayError::Utf8(_) => 1366,
            GatewayError::Other(_) => 1105,
        }
    }

    /// A MySQL-like SQLSTATE string for this error kind.
    pub fn sql_state(&self) -> &'static str {
        match self {
            GatewayError::Protocol(_) => "08S01",
            GatewayError::AuthenticationFailed(_) => "28000",
            GatewayError::UnknownTable(_) => "42S02",
            GatewayError::UnknownColumn(_) => "42S22",
            GatewayError::IncompatibleTypes(_) => "HY000",
            GatewayError::UniqueViolation { .. } => "23000",
            GatewayError::ForeignKeyViolation(_) => "23000",
            GatewayError::NotNullViolation(_) => "23000",
            GatewayError::UnsupportedConstruct(_) => "0A000",
            GatewayError::AmbiguousReference(_) => "23000",
            GatewayError::Execution(_) => "HY000",
            GatewayError::Arithmetic(_) => "22003",
            GatewayError::Backend(_) => "HY000",
            GatewayError::TransactionConflict(_) => "40001",
            GatewayError::Deadlock(_) => "40001",
            GatewayError::InvalidTransactionState(_) => "25000",
            GatewayError::PoolExhausted => "08004",
            GatewayError::MemoryBudgetExceeded(_) => "HY001",
            GatewayError::Configuration(_) => "HY000",
            GatewayError::Io(_) => "08S01",
            GatewayError::Utf8(_) => "HY000",
            GatewayError::Other(_) => "HY000",
        }
    }

    /// Constraint violations roll back only the current statement by
    /// default; only an explicit client rollback widens the scope.
    pub fn is_statement_scoped(&self) -> bool {
        matches!(
            self,
            GatewayError::UniqueViolation { .. }
                | GatewayError::ForeignKeyViolation(_)
                | GatewayError::NotNullViolation(_)
        )
    }

    /// Whether the core may transparently retry the operation that
    /// raised this error (idempotent reads only, never writes).
    pub fn is_retryable_for_reads(&self) -> bool {
        matches!(self, GatewayError::PoolExhausted | GatewayError::Backend(_))
    }
}
