use crate::contract::LedgerContract;
use crate::store::MemStore;
use tally_common::crypto;
use tally_common::message::{
    CallMode, CommitStatus, NodeMessage, TransactionOutcome, TransactionReply, TransactionRequest,
    COMMIT_VALID,
};

use std::net::SocketAddr;

use anyhow::Result;
use borsh::{BorshDeserialize, BorshSerialize};
use bytes::Bytes;
use log::{debug, trace, warn};
use tally_network::server::Server;
use tokio::sync::mpsc::{channel, Receiver, Sender};

/// Client-facing actor: executes incoming transaction calls against the
/// world state, one at a time, and notifies submitters once their write has
/// been sequenced.
pub struct ClientActor {
    store: MemStore,
    contract: LedgerContract,
    net_sender: Sender<(SocketAddr, Bytes)>,
    net_receiver: Receiver<(SocketAddr, Bytes)>,
    commit_sender: Sender<(SocketAddr, CommitStatus)>,
}

impl ClientActor {
    pub async fn run(listen_addr: SocketAddr, store: MemStore) {
        let (net_sender, net_receiver) = Server::spawn(listen_addr);
        let commit_sender = CommitNotifier::spawn(net_sender.clone());
        let mut actor = Self {
            store,
            contract: LedgerContract::new(),
            net_sender,
            net_receiver,
            commit_sender,
        };
        while let Some((peer_addr, frame)) = actor.net_receiver.recv().await {
            if let Err(e) = actor.handle_frame(peer_addr, frame).await {
                warn!("dropping request from {}: {}", peer_addr, e);
            }
        }
    }

    async fn handle_frame(&mut self, peer_addr: SocketAddr, frame: Bytes) -> Result<()> {
        let mut frame = frame.as_ref();
        let request = TransactionRequest::deserialize(&mut frame)?;
        trace!(
            "request {} from {}: {} ({:?})",
            request.transaction_id,
            peer_addr,
            request.call.name,
            request.mode
        );
        let (reply, commit) = self.process(request);
        self.net_sender
            .send((peer_addr, encode_frame(&NodeMessage::Reply(reply))?))
            .await?;
        if let Some(status) = commit {
            self.commit_sender.send((peer_addr, status)).await?;
        }
        Ok(())
    }

    /// Executes one call to completion. Evaluate calls run against a fork of
    /// the state so their writes are discarded; only submit calls produce a
    /// commit status, and only when the contract accepted the write.
    fn process(&mut self, request: TransactionRequest) -> (TransactionReply, Option<CommitStatus>) {
        let outcome = self.execute(&request);
        let commit = match (&outcome, request.mode) {
            (TransactionOutcome::Ok(_), CallMode::Submit) => Some(CommitStatus {
                transaction_id: request.transaction_id.clone(),
                successful: true,
                code: COMMIT_VALID,
            }),
            _ => None,
        };
        let reply = TransactionReply {
            transaction_id: request.transaction_id,
            outcome,
        };
        (reply, commit)
    }

    fn execute(&mut self, request: &TransactionRequest) -> TransactionOutcome {
        let payload = match TransactionRequest::signing_bytes(
            &request.transaction_id,
            request.mode,
            &request.call,
        ) {
            Ok(payload) => payload,
            Err(e) => return TransactionOutcome::Err(format!("malformed request: {e}")),
        };
        if crypto::verify(request.requester, &payload, &request.signature).is_err() {
            debug!("bad signature on {}", request.transaction_id);
            return TransactionOutcome::Err("invalid request signature".to_string());
        }
        let result = match request.mode {
            CallMode::Evaluate => {
                let mut fork = self.store.fork();
                self.contract.invoke(&mut fork, &request.call)
            }
            CallMode::Submit => self.contract.invoke(&mut self.store, &request.call),
        };
        match result {
            Ok(bytes) => TransactionOutcome::Ok(bytes),
            Err(e) => TransactionOutcome::Err(e.to_string()),
        }
    }
}

/// Delivers commit notifications after the reply for the same transaction.
/// Kept as its own task so sequencing of later requests is never blocked on a
/// slow notification receiver.
struct CommitNotifier;

impl CommitNotifier {
    fn spawn(net_sender: Sender<(SocketAddr, Bytes)>) -> Sender<(SocketAddr, CommitStatus)> {
        let (sender, mut receiver) = channel::<(SocketAddr, CommitStatus)>(1000);
        tokio::spawn(async move {
            while let Some((peer_addr, status)) = receiver.recv().await {
                trace!(
                    "commit status for {}: successful={} code={}",
                    status.transaction_id,
                    status.successful,
                    status.code
                );
                match encode_frame(&NodeMessage::Commit(status)) {
                    Ok(frame) => {
                        if net_sender.send((peer_addr, frame)).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => warn!("commit status encode failed: {}", e),
                }
            }
        });
        sender
    }
}

fn encode_frame(message: &NodeMessage) -> Result<Bytes> {
    Ok(message.try_to_vec()?.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_common::crypto::Keypair;
    use tally_common::message::TransactionCall;

    fn test_actor() -> (ClientActor, Receiver<(SocketAddr, Bytes)>) {
        let (net_sender, net_rx) = channel(16);
        let (_outbound, net_receiver) = channel(16);
        let (commit_sender, _commit_rx) = channel(16);
        let actor = ClientActor {
            store: MemStore::new(),
            contract: LedgerContract::new(),
            net_sender,
            net_receiver,
            commit_sender,
        };
        (actor, net_rx)
    }

    fn signed_request(
        keypair: &Keypair,
        transaction_id: &str,
        mode: CallMode,
        name: &str,
        args: &[&str],
    ) -> TransactionRequest {
        let call = TransactionCall::new(name, args);
        let payload = TransactionRequest::signing_bytes(transaction_id, mode, &call).unwrap();
        TransactionRequest {
            transaction_id: transaction_id.to_string(),
            mode,
            call,
            requester: keypair.public.to_bytes(),
            signature: crypto::sign(keypair, &payload),
        }
    }

    #[test]
    fn submit_persists_and_produces_commit_status() {
        let (mut actor, _net) = test_actor();
        let keypair = crypto::generate_keypair();
        let (reply, commit) = actor.process(signed_request(
            &keypair,
            "run-1-0",
            CallMode::Submit,
            "CreateSubject",
            &["subject1", "Aldo", "A1"],
        ));
        assert!(matches!(reply.outcome, TransactionOutcome::Ok(_)));
        let status = commit.expect("submit must produce a commit status");
        assert_eq!(status.transaction_id, "run-1-0");
        assert!(status.successful);
        assert_eq!(status.code, COMMIT_VALID);

        let (reply, _) = actor.process(signed_request(
            &keypair,
            "run-1-1",
            CallMode::Evaluate,
            "PaymentExists",
            &["subject1"],
        ));
        match reply.outcome {
            TransactionOutcome::Ok(bytes) => assert_eq!(bytes, b"true"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn evaluate_never_persists_or_commits() {
        let (mut actor, _net) = test_actor();
        let keypair = crypto::generate_keypair();
        let (reply, commit) = actor.process(signed_request(
            &keypair,
            "run-2-0",
            CallMode::Evaluate,
            "CreateSubject",
            &["subject1", "Aldo", "A1"],
        ));
        assert!(matches!(reply.outcome, TransactionOutcome::Ok(_)));
        assert!(commit.is_none());

        let (reply, _) = actor.process(signed_request(
            &keypair,
            "run-2-1",
            CallMode::Evaluate,
            "PaymentExists",
            &["subject1"],
        ));
        match reply.outcome {
            TransactionOutcome::Ok(bytes) => assert_eq!(bytes, b"false"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn rejected_submit_surfaces_the_contract_error_verbatim() {
        let (mut actor, _net) = test_actor();
        let keypair = crypto::generate_keypair();
        let (reply, commit) = actor.process(signed_request(
            &keypair,
            "run-3-0",
            CallMode::Submit,
            "UpdatePayment",
            &[
                "payment70",
                "ord",
                "POS",
                "2024-01-01T00:00:00.000Z",
                "uri",
                "hash",
                "300",
            ],
        ));
        assert!(commit.is_none());
        match reply.outcome {
            TransactionOutcome::Err(message) => {
                assert_eq!(message, "The asset payment70 does not exist")
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn bad_signature_is_rejected_without_execution() {
        let (mut actor, _net) = test_actor();
        let keypair = crypto::generate_keypair();
        let mut request = signed_request(
            &keypair,
            "run-4-0",
            CallMode::Submit,
            "CreateSubject",
            &["subject1", "Aldo", "A1"],
        );
        request.call.args[1] = "Mallory".to_string();

        let (reply, commit) = actor.process(request);
        assert!(commit.is_none());
        assert!(matches!(reply.outcome, TransactionOutcome::Err(_)));

        let (reply, _) = actor.process(signed_request(
            &keypair,
            "run-4-1",
            CallMode::Evaluate,
            "PaymentExists",
            &["subject1"],
        ));
        match reply.outcome {
            TransactionOutcome::Ok(bytes) => assert_eq!(bytes, b"false"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
