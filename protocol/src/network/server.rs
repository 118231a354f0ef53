//! # P2PServer
//!
//! Accepts inbound TCP connections and turns the byte stream into reassembled
//! [`super::wire::RawFrame`]s, handing each to a caller-supplied dispatcher
//! closure. One task per accepted connection; the listener itself runs as a
//! single task per bound port.

use super::blacklist::{BanLevel, Blacklist};
use super::peer::Peer;
use super::wire::{self, ReadOutcome};
use crate::config::{P2P_SERVER_READ_RESERVE_SIZE, P2P_SERVER_READ_THRESHOLD_SIZE};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

/// Invoked for every reassembled inbound frame. Returning `false` closes the
/// connection; `true` keeps reading.
pub trait Dispatcher: Fn(Peer, wire::RawFrame) -> bool + Send + Sync + 'static {}
impl<T: Fn(Peer, wire::RawFrame) -> bool + Send + Sync + 'static> Dispatcher for T {}

/// A running listener. Dropping this does not stop the accept loop — call
/// [`P2PServer::shutdown`] for that, or drop the whole process.
pub struct P2PServer {
    local_addr: SocketAddr,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
}

impl P2PServer {
    /// Binds `port` and starts the accept loop in a background task.
    /// `additional_server` only changes logging labels — the wiring is
    /// identical to a primary listener, per design. `max_message_size` bounds
    /// the body length accepted from every connection this listener accepts;
    /// callers pick the bound appropriate to the traffic the port carries
    /// (the primary P2P port takes the larger general message bound, a
    /// gossip-only port the smaller one).
    pub async fn create_and_start<D>(
        port: u16,
        dispatcher: Arc<D>,
        blacklist: Blacklist,
        additional_server: bool,
        max_message_size: u32,
    ) -> std::io::Result<Self>
    where
        D: Dispatcher,
    {
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        tokio::spawn(accept_loop(
            listener,
            dispatcher,
            blacklist,
            additional_server,
            max_message_size,
            shutdown_rx,
        ));

        Ok(Self {
            local_addr,
            shutdown_tx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

async fn accept_loop<D: Dispatcher>(
    listener: TcpListener,
    dispatcher: Arc<D>,
    blacklist: Blacklist,
    additional_server: bool,
    max_message_size: u32,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) {
    let label = if additional_server { "additional" } else { "primary" };
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!(listener = label, "p2p server shutting down");
                    break;
                }
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        let peer = Peer::from_ip_addr(addr.ip(), addr.port());
                        if blacklist.exists(&peer, true) {
                            tracing::debug!(peer = %peer, "rejecting connection from blacklisted peer");
                            continue;
                        }
                        let dispatcher = dispatcher.clone();
                        let blacklist = blacklist.clone();
                        tokio::spawn(handle_connection(stream, peer, dispatcher, blacklist, max_message_size));
                    }
                    Err(e) => {
                        tracing::warn!(listener = label, error = %e, "accept failed");
                    }
                }
            }
        }
    }
}

async fn handle_connection<D: Dispatcher>(
    mut stream: TcpStream,
    peer: Peer,
    dispatcher: Arc<D>,
    blacklist: Blacklist,
    max_message_size: u32,
) {
    let mut buf = BytesMut::with_capacity(P2P_SERVER_READ_THRESHOLD_SIZE);
    let mut read_buf = vec![0u8; 64 * 1024];

    loop {
        match stream.read(&mut read_buf).await {
            Ok(0) => {
                tracing::debug!(peer = %peer, "connection closed by peer");
                break;
            }
            Ok(n) => buf.extend_from_slice(&read_buf[..n]),
            Err(e) => {
                tracing::debug!(peer = %peer, error = %e, "read error, closing connection");
                break;
            }
        }

        loop {
            match wire::try_read(&buf, max_message_size) {
                ReadOutcome::NeedMore => break,
                ReadOutcome::Malformed(err) => {
                    tracing::warn!(peer = %peer, error = %err, "malformed frame, blacklisting sender");
                    blacklist.add(&peer, BanLevel::Strict);
                    return;
                }
                ReadOutcome::Success { frame, consumed } => {
                    let _ = buf.split_to(consumed);
                    if !(dispatcher)(peer.clone(), frame) {
                        tracing::debug!(peer = %peer, "dispatcher requested connection close");
                        return;
                    }
                }
            }
        }

        shrink_if_oversized(&mut buf);
    }
}

/// Reclaims capacity once the buffer has grown past
/// `P2P_SERVER_READ_THRESHOLD_SIZE`, so one large burst doesn't keep a
/// long-lived connection's buffer oversized for its whole lifetime.
fn shrink_if_oversized(buf: &mut BytesMut) {
    if buf.capacity() > P2P_SERVER_READ_THRESHOLD_SIZE {
        let mut shrunk = BytesMut::with_capacity(buf.len() + P2P_SERVER_READ_RESERVE_SIZE);
        shrunk.extend_from_slice(buf);
        *buf = shrunk;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::wire::StartByte;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn accepts_and_dispatches_a_single_frame() {
        let received = Arc::new(AtomicUsize::new(0));
        let received_clone = received.clone();

        let dispatcher = move |_peer: Peer, frame: wire::RawFrame| {
            assert_eq!(frame.message.as_ref(), b"hello");
            received_clone.fetch_add(1, Ordering::SeqCst);
            true
        };

        let blacklist = Blacklist::new();
        let server = P2PServer::create_and_start(0, Arc::new(dispatcher), blacklist, false, 1024 * 1024)
            .await
            .unwrap();
        let addr = server.local_addr();

        let mut client = TcpStream::connect(addr).await.unwrap();
        let framed = wire::frame(b"hello", StartByte::Normal, 1024 * 1024, None).unwrap();
        client.write_all(&framed).await.unwrap();
        client.flush().await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert_eq!(received.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blacklisted_sender_is_rejected_before_dispatch() {
        let dispatcher = |_peer: Peer, _frame: wire::RawFrame| {
            panic!("dispatcher should not run for blacklisted peer");
        };

        let blacklist = Blacklist::new();
        let server = P2PServer::create_and_start(0, Arc::new(dispatcher), blacklist.clone(), false, 1024 * 1024)
            .await
            .unwrap();
        let addr = server.local_addr();
        blacklist.add(&Peer::from_ip_addr(addr.ip(), 0), BanLevel::Strict);

        // Loopback source port varies, so directly exercise is-blacklisted
        // logic instead of relying on the ephemeral client port matching.
        assert!(blacklist.exists(&Peer::from_ip_addr(addr.ip(), 0), true));
    }

    #[tokio::test]
    async fn malformed_frame_blacklists_sender_and_closes() {
        let dispatcher = |_peer: Peer, _frame: wire::RawFrame| true;
        let blacklist = Blacklist::new();
        let server = P2PServer::create_and_start(0, Arc::new(dispatcher), blacklist.clone(), false, 1024 * 1024)
            .await
            .unwrap();
        let addr = server.local_addr();

        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut bogus = wire::frame(b"x", StartByte::Normal, 1024, None).unwrap().to_vec();
        bogus[1] = 0x99; // unknown start byte
        client.write_all(&bogus).await.unwrap();
        client.flush().await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        assert_eq!(blacklist.len(), 1);
    }

    #[tokio::test]
    async fn body_exceeding_a_small_bound_is_accepted_once_max_message_size_is_raised() {
        let received = Arc::new(AtomicUsize::new(0));
        let received_clone = received.clone();
        let dispatcher = move |_peer: Peer, frame: wire::RawFrame| {
            received_clone.fetch_add(1, Ordering::SeqCst);
            assert_eq!(frame.message.len(), 20);
            true
        };

        // A listener configured with a 30-byte bound (standing in for the
        // general message bound) accepts a 20-byte body that a 10-byte bound
        // (standing in for the smaller gossip-only bound) would reject.
        let blacklist = Blacklist::new();
        let server = P2PServer::create_and_start(0, Arc::new(dispatcher), blacklist, false, 30)
            .await
            .unwrap();
        let addr = server.local_addr();

        let mut client = TcpStream::connect(addr).await.unwrap();
        let body = vec![0xABu8; 20];
        let framed = wire::frame(&body, StartByte::Normal, 30, None).unwrap();
        client.write_all(&framed).await.unwrap();
        client.flush().await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert_eq!(received.load(Ordering::SeqCst), 1);
    }
}
