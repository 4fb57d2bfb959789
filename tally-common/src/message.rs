use anyhow::Result;
use borsh::{BorshDeserialize, BorshSerialize};

pub type PublicKeyBytes = [u8; 32];
pub type SignatureBytes = [u8; 64];

/// Commit status code for a write that validated and committed.
pub const COMMIT_VALID: i32 = 0;
/// Commit status code for a write that was sequenced but failed validation.
pub const COMMIT_FAILED: i32 = 10;

/// A named transaction plus its ordered string arguments.
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct TransactionCall {
    pub name: String,
    pub args: Vec<String>,
}

impl TransactionCall {
    pub fn new(name: impl Into<String>, args: &[&str]) -> Self {
        Self {
            name: name.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum CallMode {
    /// Read-only, not sequenced into ledger history.
    Evaluate,
    /// Sequenced write, followed by a commit notification.
    Submit,
}

#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct TransactionRequest {
    pub transaction_id: String,
    pub mode: CallMode,
    pub call: TransactionCall,
    pub requester: PublicKeyBytes,
    pub signature: SignatureBytes,
}

impl TransactionRequest {
    /// The byte string covered by the request signature.
    pub fn signing_bytes(
        transaction_id: &str,
        mode: CallMode,
        call: &TransactionCall,
    ) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        transaction_id.serialize(&mut buf)?;
        mode.serialize(&mut buf)?;
        call.serialize(&mut buf)?;
        Ok(buf)
    }
}

#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub enum TransactionOutcome {
    Ok(Vec<u8>),
    Err(String),
}

#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct TransactionReply {
    pub transaction_id: String,
    pub outcome: TransactionOutcome,
}

/// Commit outcome notification for a submitted write. Sent once, after the
/// write has been sequenced.
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct CommitStatus {
    pub transaction_id: String,
    pub successful: bool,
    pub code: i32,
}

/// Node-to-client frames multiplexed over one connection.
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub enum NodeMessage {
    Reply(TransactionReply),
    Commit(CommitStatus),
}
