use crate::logger::MessageLogger;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::fmt;
use thiserror::Error;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

/// A live, message-oriented WebSocket connection.
pub trait Connection: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin + Send {}

impl<T> Connection for T where T: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin + Send {}

/// The two sides of a relayed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peer {
    /// The local GUI client.
    Near,
    /// The resolved remote endpoint.
    Far,
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Peer::Near => f.write_str("client"),
            Peer::Far => f.write_str("remote"),
        }
    }
}

/// The error that ended a relay. An orderly close is reported too.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0} closed the connection")]
    Closed(Peer),
    #[error("cannot read from {peer}: {source}")]
    Read { peer: Peer, source: WsError },
    #[error("cannot write to {peer}: {source}")]
    Write { peer: Peer, source: WsError },
}

impl RelayError {
    pub fn peer(&self) -> Peer {
        match self {
            RelayError::Closed(peer) => *peer,
            RelayError::Read { peer, .. } | RelayError::Write { peer, .. } => *peer,
        }
    }
}

/// Copy messages between `near` and `far` in both directions until either
/// side closes or fails, and return that first error.
///
/// Messages are forwarded unmodified, one write per read. After each
/// successful write the message text goes to the logger owning that
/// direction. When one direction ends the other is dropped mid-flight;
/// closing the connections is left to the caller.
pub async fn relay<N, F>(near: &mut N, far: &mut F, near_to_far: &dyn MessageLogger, far_to_near: &dyn MessageLogger) -> RelayError
where
    N: Connection,
    F: Connection,
{
    let (mut near_tx, mut near_rx) = near.split();
    let (mut far_tx, mut far_rx) = far.split();
    tokio::select! {
        err = copy(&mut near_rx, &mut far_tx, Peer::Near, Peer::Far, near_to_far) => err,
        err = copy(&mut far_rx, &mut near_tx, Peer::Far, Peer::Near, far_to_near) => err,
    }
}

async fn copy<S, D>(src: &mut S, dst: &mut D, from: Peer, to: Peer, log: &dyn MessageLogger) -> RelayError
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
    D: Sink<Message, Error = WsError> + Unpin,
{
    loop {
        let msg = match src.next().await {
            Some(Ok(msg)) => msg,
            Some(Err(source)) => return RelayError::Read { peer: from, source },
            None => return RelayError::Closed(from),
        };
        let text = match &msg {
            Message::Text(text) => text.clone(),
            Message::Binary(data) => String::from_utf8_lossy(data).into_owned(),
            Message::Close(frame) => {
                // Pass the close handshake on so the other peer sees the same code.
                let _ = dst.send(Message::Close(frame.clone())).await;
                return RelayError::Closed(from);
            }
            // Ping/pong are answered per hop by the WebSocket layer.
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        };
        if let Err(source) = dst.send(msg).await {
            return RelayError::Write { peer: to, source };
        }
        log.print(&text);
    }
}
