use crate::common::{PeerChannel, Reader, Writer};

use std::collections::{hash_map::Entry, HashMap};
use std::net::SocketAddr;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use log::{error, trace, warn};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc::{channel, Receiver, Sender},
};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

/// Accepts framed TCP connections and shuttles frames between them and the
/// owning task, addressed by peer socket address.
pub struct Server {
    listen_addr: SocketAddr,
    inbound: Sender<(SocketAddr, Bytes)>,
    outbound: Receiver<(SocketAddr, Bytes)>,
    connections: HashMap<SocketAddr, Sender<Bytes>>,
}

impl Server {
    pub fn spawn(listen_addr: SocketAddr) -> PeerChannel {
        let (inbound, ret_receiver) = channel(1000);
        let (ret_sender, outbound) = channel(1000);
        tokio::spawn(async move {
            Self {
                listen_addr,
                inbound,
                outbound,
                connections: Default::default(),
            }
            .run()
            .await;
        });
        (ret_sender, ret_receiver)
    }

    async fn run(&mut self) {
        let listener = TcpListener::bind(self.listen_addr)
            .await
            .expect("Failed to bind TCP port!");
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((socket, peer_addr)) => {
                            trace!("accepted connection from {}", peer_addr);
                            let (sender, receiver) = channel(1000);
                            self.connections.insert(peer_addr, sender);
                            Connection::spawn(peer_addr, socket, self.inbound.clone(), receiver);
                        }
                        Err(e) => error!("accept failed: {e:?}"),
                    }
                }
                Some((peer_addr, frame)) = self.outbound.recv() => {
                    match self.connections.entry(peer_addr) {
                        Entry::Occupied(mut entry) => {
                            trace!("sending frame to {}", peer_addr);
                            if let Err(e) = entry.get_mut().send(frame).await {
                                warn!("disconnected from {}: {}", peer_addr, e);
                                entry.remove();
                            }
                        }
                        Entry::Vacant(_) => warn!("no connection from {}", peer_addr),
                    }
                }
            }
        }
    }
}

struct Connection {
    remote_addr: SocketAddr,
    inbound: Sender<(SocketAddr, Bytes)>,
    outbound: Receiver<Bytes>,
    reader: Reader,
    writer: Writer,
}

impl Connection {
    fn spawn(
        remote_addr: SocketAddr,
        socket: TcpStream,
        inbound: Sender<(SocketAddr, Bytes)>,
        outbound: Receiver<Bytes>,
    ) {
        let (writer, reader) = Framed::new(socket, LengthDelimitedCodec::new()).split();
        tokio::spawn(async move {
            Self {
                remote_addr,
                inbound,
                outbound,
                reader,
                writer,
            }
            .run()
            .await
        });
    }

    async fn run(&mut self) {
        loop {
            tokio::select! {
                maybe = self.reader.next() => {
                    match maybe {
                        Some(Ok(frame)) => {
                            trace!("received frame from {}", self.remote_addr);
                            if self
                                .inbound
                                .send((self.remote_addr, frame.freeze()))
                                .await
                                .is_err()
                            {
                                return;
                            }
                        }
                        Some(Err(e)) => {
                            error!("read from {} failed: {}", self.remote_addr, e);
                            return;
                        }
                        None => {
                            trace!("{} closed the connection", self.remote_addr);
                            return;
                        }
                    }
                },
                Some(frame) = self.outbound.recv() => {
                    if let Err(e) = self.writer.send(frame).await {
                        warn!("disconnected from {}: {}", self.remote_addr, e);
                        return;
                    }
                }
            }
        }
    }
}
