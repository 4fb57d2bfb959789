pub mod canonical;
pub mod crypto;
pub mod error;
pub mod message;
pub mod record;

pub use error::ContractError;
pub use message::{
    CallMode, CommitStatus, NodeMessage, PublicKeyBytes, SignatureBytes, TransactionCall,
    TransactionOutcome, TransactionReply, TransactionRequest,
};
pub use record::{Payment, Record, Subject};
