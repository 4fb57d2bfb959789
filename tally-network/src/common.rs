use std::net::SocketAddr;

use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use tokio::{
    net::TcpStream,
    sync::mpsc::{Receiver, Sender},
};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

/// Convenient aliases for the two ends of a framed TCP stream.
pub type Writer = SplitSink<Framed<TcpStream, LengthDelimitedCodec>, Bytes>;
pub type Reader = SplitStream<Framed<TcpStream, LengthDelimitedCodec>>;

/// Addressed channel pair used by the server side.
pub type PeerChannel = (Sender<(SocketAddr, Bytes)>, Receiver<(SocketAddr, Bytes)>);
/// Channel pair for a single remote endpoint.
pub type StreamChannel = (Sender<Bytes>, Receiver<Bytes>);
