mod gateway_error;

pub use gateway_error::GatewayError;

pub type CResult<T> = Result<T, GatewayError>;
