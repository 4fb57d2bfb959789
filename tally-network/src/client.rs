use crate::common::StreamChannel;

use std::collections::VecDeque;
use std::io::Error;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use log::{trace, warn};
use tokio::{
    net::TcpStream,
    sync::mpsc::{channel, Receiver, Sender},
    time,
};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

const BUFFER_LIMIT: usize = 1000;

/// A persistent framed connection to a single remote endpoint. Reconnects
/// with exponential backoff and shuts down when the outbound sender is
/// dropped, so the caller releases the connection exactly once.
pub struct Connection {
    remote_addr: SocketAddr,
    inbound: Sender<Bytes>,
    outbound: Receiver<Bytes>,
    buffer: VecDeque<Bytes>,
}

impl Connection {
    pub fn spawn(remote_addr: SocketAddr) -> StreamChannel {
        let (out_sender, outbound) = channel(1000);
        let (inbound, in_receiver) = channel(1000);
        tokio::spawn(async move {
            Self {
                remote_addr,
                inbound,
                outbound,
                buffer: Default::default(),
            }
            .run()
            .await;
        });
        (out_sender, in_receiver)
    }

    async fn run(&mut self) {
        let mut delay = 200;
        let mut retry = 0;
        loop {
            match TcpStream::connect(self.remote_addr).await {
                Ok(stream) => {
                    trace!("connection established with {}", self.remote_addr);
                    delay = 200;
                    retry = 0;
                    match self.exchange(stream).await {
                        Ok(()) => return,
                        Err(e) => warn!("connection to {} dropped: {}", self.remote_addr, e),
                    }
                }
                Err(e) => {
                    warn!(
                        "connect to {} failed after {} retries: {}",
                        self.remote_addr, retry, e
                    );
                    let timer = time::sleep(Duration::from_millis(delay));
                    tokio::pin!(timer);

                    'waiter: loop {
                        tokio::select! {
                            // Wait an increasing delay before reconnecting.
                            () = &mut timer => {
                                delay = std::cmp::min(2 * delay, 60_000);
                                retry += 1;
                                break 'waiter;
                            },
                            // Buffer outgoing frames so the caller is not blocked
                            // while the endpoint is unreachable.
                            maybe = self.outbound.recv() => {
                                match maybe {
                                    Some(frame) => {
                                        self.buffer.push_back(frame);
                                        if self.buffer.len() > BUFFER_LIMIT {
                                            warn!("outbound buffer full, dropping oldest frames");
                                            self.buffer.drain(0..BUFFER_LIMIT / 2);
                                        }
                                    }
                                    None => return,
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// Drains buffered frames, then shuttles frames both ways until the
    /// stream errors out or the caller drops its sender. `Ok(())` means a
    /// deliberate shutdown.
    async fn exchange(&mut self, stream: TcpStream) -> Result<(), Error> {
        let (mut writer, mut reader) = Framed::new(stream, LengthDelimitedCodec::new()).split();
        while let Some(frame) = self.buffer.pop_front() {
            writer.send(frame).await?;
        }
        loop {
            tokio::select! {
                maybe = self.outbound.recv() => {
                    match maybe {
                        Some(frame) => {
                            trace!("sending frame to {}", self.remote_addr);
                            writer.send(frame).await?;
                        }
                        None => {
                            writer.close().await.ok();
                            return Ok(());
                        }
                    }
                }
                Some(frame) = reader.next() => {
                    let frame = frame?.freeze();
                    if self.inbound.send(frame).await.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }
}
