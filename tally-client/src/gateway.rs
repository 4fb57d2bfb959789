//! The gateway: issues named transactions against a ledger node in three
//! modes, each under its own deadline. The framed connection is established
//! once and shared by every call; a deadline that expires abandons only that
//! call and leaves the connection usable.

use tally_common::crypto::{self, Keypair};
use tally_common::message::{
    CallMode, CommitStatus, NodeMessage, TransactionCall, TransactionOutcome, TransactionReply,
    TransactionRequest,
};
use tally_network::client::Connection;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use borsh::{BorshDeserialize, BorshSerialize};
use bytes::Bytes;
use log::{trace, warn};
use thiserror::Error;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::oneshot;
use tokio::time::timeout;

#[derive(Debug, Error)]
pub enum CallError {
    /// Contract-level failure text, propagated verbatim from the node.
    #[error("{0}")]
    Contract(String),
    #[error("Transaction {transaction_id} failed to commit with status code {code}")]
    CommitFailed { transaction_id: String, code: i32 },
    #[error("{phase} deadline of {deadline:?} exceeded for transaction {transaction_id}")]
    Timeout {
        phase: &'static str,
        deadline: Duration,
        transaction_id: String,
    },
    #[error("gateway connection closed")]
    Disconnected,
    #[error("request encoding failed: {0}")]
    Encode(String),
}

/// Per-mode deadline budgets.
#[derive(Debug, Clone, Copy)]
pub struct CallOptions {
    pub evaluate_timeout: Duration,
    pub endorse_timeout: Duration,
    pub submit_timeout: Duration,
    pub commit_status_timeout: Duration,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            evaluate_timeout: Duration::from_secs(5),
            endorse_timeout: Duration::from_secs(15),
            submit_timeout: Duration::from_secs(5),
            commit_status_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct PendingCall {
    reply: Option<oneshot::Sender<TransactionReply>>,
    commit: Option<oneshot::Sender<CommitStatus>>,
}

type PendingMap = Arc<Mutex<HashMap<String, PendingCall>>>;

pub struct Gateway {
    net_sender: Sender<Bytes>,
    pending: PendingMap,
    keypair: Keypair,
    options: CallOptions,
    run_id: String,
    sequence: AtomicU64,
}

impl Gateway {
    /// Opens the shared connection and starts the frame router. The run id is
    /// injected by the caller and scopes every transaction id of this run.
    pub fn connect(
        node_addr: SocketAddr,
        keypair: Keypair,
        options: CallOptions,
        run_id: String,
    ) -> Self {
        let (net_sender, net_receiver) = Connection::spawn(node_addr);
        let pending: PendingMap = Default::default();
        spawn_router(net_receiver, pending.clone());
        Self {
            net_sender,
            pending,
            keypair,
            options,
            run_id,
            sequence: AtomicU64::new(0),
        }
    }

    /// Read-only call, not sequenced into ledger history.
    pub async fn evaluate(&self, name: &str, args: &[&str]) -> Result<Vec<u8>, CallError> {
        let (transaction_id, reply_rx, _) = self.dispatch(CallMode::Evaluate, name, args, false).await?;
        self.await_reply("evaluate", self.options.evaluate_timeout, transaction_id, reply_rx)
            .await
    }

    /// Write call; blocks until the node has accepted the write for
    /// sequencing. Acceptance is not final commit.
    pub async fn submit(&self, name: &str, args: &[&str]) -> Result<Vec<u8>, CallError> {
        let deadline = self.options.endorse_timeout + self.options.submit_timeout;
        let (transaction_id, reply_rx, _) = self.dispatch(CallMode::Submit, name, args, false).await?;
        self.await_reply("submit", deadline, transaction_id, reply_rx)
            .await
    }

    /// Write call that returns as soon as submission is acknowledged; the
    /// commit outcome is awaited separately on the returned handle.
    pub async fn submit_async(
        &self,
        name: &str,
        args: &[&str],
    ) -> Result<SubmittedTransaction, CallError> {
        let (transaction_id, reply_rx, commit_rx) =
            self.dispatch(CallMode::Submit, name, args, true).await?;
        let result = match self
            .await_reply(
                "submit",
                self.options.submit_timeout,
                transaction_id.clone(),
                reply_rx,
            )
            .await
        {
            Ok(result) => result,
            Err(e) => {
                // A rejected submit never commits, so its commit registration
                // must not outlive the failed call.
                self.pending.lock().unwrap().remove(&transaction_id);
                return Err(e);
            }
        };
        let status = commit_rx.ok_or(CallError::Disconnected)?;
        Ok(SubmittedTransaction {
            transaction_id,
            result,
            status,
            deadline: self.options.commit_status_timeout,
            pending: self.pending.clone(),
        })
    }

    /// Releases the shared connection. Consumes the gateway, so it can only
    /// happen once all borrowed in-flight calls have settled.
    pub fn close(self) {
        drop(self.net_sender);
    }

    fn next_transaction_id(&self) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.run_id, seq)
    }

    async fn dispatch(
        &self,
        mode: CallMode,
        name: &str,
        args: &[&str],
        want_commit: bool,
    ) -> Result<
        (
            String,
            oneshot::Receiver<TransactionReply>,
            Option<oneshot::Receiver<CommitStatus>>,
        ),
        CallError,
    > {
        let transaction_id = self.next_transaction_id();
        let call = TransactionCall::new(name, args);
        let payload = TransactionRequest::signing_bytes(&transaction_id, mode, &call)
            .map_err(|e| CallError::Encode(e.to_string()))?;
        let signature = crypto::sign(&self.keypair, &payload);
        let request = TransactionRequest {
            transaction_id: transaction_id.clone(),
            mode,
            call,
            requester: self.keypair.public.to_bytes(),
            signature,
        };
        let frame: Bytes = request
            .try_to_vec()
            .map_err(|e| CallError::Encode(e.to_string()))?
            .into();

        let (reply_tx, reply_rx) = oneshot::channel();
        let (commit_tx, commit_rx) = if want_commit {
            let (tx, rx) = oneshot::channel();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };
        // Register before sending so the reply cannot race the waiter.
        self.pending.lock().unwrap().insert(
            transaction_id.clone(),
            PendingCall {
                reply: Some(reply_tx),
                commit: commit_tx,
            },
        );

        trace!("dispatch {} {} ({:?})", transaction_id, name, mode);
        if self.net_sender.send(frame).await.is_err() {
            self.pending.lock().unwrap().remove(&transaction_id);
            return Err(CallError::Disconnected);
        }
        Ok((transaction_id, reply_rx, commit_rx))
    }

    async fn await_reply(
        &self,
        phase: &'static str,
        deadline: Duration,
        transaction_id: String,
        reply_rx: oneshot::Receiver<TransactionReply>,
    ) -> Result<Vec<u8>, CallError> {
        match timeout(deadline, reply_rx).await {
            Err(_) => {
                // Abandon only this call; later frames for it are dropped by
                // the router and the connection stays usable.
                self.pending.lock().unwrap().remove(&transaction_id);
                Err(CallError::Timeout {
                    phase,
                    deadline,
                    transaction_id,
                })
            }
            Ok(Err(_)) => Err(CallError::Disconnected),
            Ok(Ok(reply)) => match reply.outcome {
                TransactionOutcome::Ok(bytes) => Ok(bytes),
                TransactionOutcome::Err(message) => Err(CallError::Contract(message)),
            },
        }
    }
}

/// Pending-commit handle for an asynchronously submitted write.
#[derive(Debug)]
pub struct SubmittedTransaction {
    transaction_id: String,
    result: Vec<u8>,
    status: oneshot::Receiver<CommitStatus>,
    deadline: Duration,
    pending: PendingMap,
}

impl SubmittedTransaction {
    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    /// The transaction's immediate result, available before commit.
    pub fn result(&self) -> &[u8] {
        &self.result
    }

    /// Waits for the commit notification. A non-successful status is an
    /// explicit failure, never swallowed.
    pub async fn status(self) -> Result<CommitStatus, CallError> {
        let Self {
            transaction_id,
            status,
            deadline,
            pending,
            ..
        } = self;
        match timeout(deadline, status).await {
            Err(_) => {
                pending.lock().unwrap().remove(&transaction_id);
                Err(CallError::Timeout {
                    phase: "commit status",
                    deadline,
                    transaction_id,
                })
            }
            Ok(Err(_)) => Err(CallError::Disconnected),
            Ok(Ok(status)) => {
                if status.successful {
                    Ok(status)
                } else {
                    Err(CallError::CommitFailed {
                        transaction_id: status.transaction_id,
                        code: status.code,
                    })
                }
            }
        }
    }
}

fn spawn_router(mut net_receiver: Receiver<Bytes>, pending: PendingMap) {
    tokio::spawn(async move {
        while let Some(frame) = net_receiver.recv().await {
            let mut slice = frame.as_ref();
            match NodeMessage::deserialize(&mut slice) {
                Ok(NodeMessage::Reply(reply)) => route_reply(&pending, reply),
                Ok(NodeMessage::Commit(status)) => route_commit(&pending, status),
                Err(e) => warn!("undecodable frame from node: {}", e),
            }
        }
        trace!("node connection closed, router stopping");
    });
}

fn route_reply(pending: &PendingMap, reply: TransactionReply) {
    let waiter = {
        let mut map = pending.lock().unwrap();
        match map.remove(&reply.transaction_id) {
            Some(mut entry) => {
                let waiter = entry.reply.take();
                if entry.commit.is_some() {
                    map.insert(reply.transaction_id.clone(), entry);
                }
                waiter
            }
            None => None,
        }
    };
    match waiter {
        Some(waiter) => {
            waiter.send(reply).ok();
        }
        None => trace!("no waiter for reply {}", reply.transaction_id),
    }
}

fn route_commit(pending: &PendingMap, status: CommitStatus) {
    let waiter = {
        let mut map = pending.lock().unwrap();
        match map.remove(&status.transaction_id) {
            Some(mut entry) => {
                let waiter = entry.commit.take();
                if entry.reply.is_some() {
                    map.insert(status.transaction_id.clone(), entry);
                }
                waiter
            }
            None => None,
        }
    };
    match waiter {
        Some(waiter) => {
            waiter.send(status).ok();
        }
        // Synchronous submits never register a commit waiter.
        None => trace!("no waiter for commit status {}", status.transaction_id),
    }
}
