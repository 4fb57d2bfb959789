use thiserror::Error;

/// Contract-level failures. These propagate unmodified to the gateway client;
/// the node must not rewrap or mask them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("The asset {0} already exists")]
    AlreadyExists(String),
    #[error("The asset {0} does not exist")]
    NotFound(String),
    #[error("The asset {0} is not a payment")]
    NotAPayment(String),
    #[error("unknown transaction {0}")]
    UnknownTransaction(String),
    #[error("{transaction} expects {expected} arguments, got {actual}")]
    ArgumentCount {
        transaction: String,
        expected: usize,
        actual: usize,
    },
    #[error("{transaction} expects at most {max} arguments, got {actual}")]
    TooManyArguments {
        transaction: String,
        max: usize,
        actual: usize,
    },
    #[error("invalid argument {name}: {reason}")]
    InvalidArgument { name: &'static str, reason: String },
    #[error("stored value for {0} is not a valid record")]
    Malformed(String),
    #[error("encoding failed: {0}")]
    Encoding(String),
}

impl From<serde_json::Error> for ContractError {
    fn from(err: serde_json::Error) -> Self {
        ContractError::Encoding(err.to_string())
    }
}
