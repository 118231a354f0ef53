//! # PeerSendQueue
//!
//! Per-destination outbound queue: resolve → connect → send → idle →
//! reconnect, run as a single task so sends to one peer are always ordered
//! and the caller never blocks on network I/O.
//!
//! Connection failures are never surfaced to the caller (SPEC_FULL.md §4.3)
//! — the queue itself decides retry vs. drop. The only way failure is
//! observable from outside is the queue's eventual transition to `Done`.

use super::blacklist::Blacklist;
use super::peer::Peer;
use crate::config::{
    CONNECTION_TIMEOUT, IDLE_TIMEOUT_DNS, IDLE_TIMEOUT_IP_ONLY, MESSAGE_EXPIRE_TIME,
    RECONNECT_INTERVAL, SLOW_SEND_TO_REPORT,
};
use bytes::Bytes;
use std::collections::VecDeque;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// One queued outbound payload, already fully framed.
struct QueuedMessage {
    bytes: Bytes,
    allow_relaxed_blacklist: bool,
    expires_at: Instant,
}

/// Commands a [`super::send_jobs::SendJobs`] posts to a running queue task.
pub enum QueueCommand {
    Enqueue {
        bytes: Bytes,
        allow_relaxed_blacklist: bool,
    },
    Close,
}

/// Handle used by the owner (`SendJobs`) to talk to a running queue task.
#[derive(Clone)]
pub struct PeerSendQueueHandle {
    tx: mpsc::UnboundedSender<QueueCommand>,
}

impl PeerSendQueueHandle {
    pub fn enqueue(&self, bytes: Bytes, allow_relaxed_blacklist: bool) {
        let _ = self.tx.send(QueueCommand::Enqueue {
            bytes,
            allow_relaxed_blacklist,
        });
    }

    pub fn close(&self) {
        let _ = self.tx.send(QueueCommand::Close);
    }
}

/// Spawns the queue task for `peer` and returns a handle to it plus a
/// one-shot-style completion receiver the owner can poll/await to learn when
/// the queue has gone `Done` and should be erased from its map.
pub fn spawn(
    peer: Peer,
    is_multiplier: bool,
    blacklist: Blacklist,
) -> (PeerSendQueueHandle, mpsc::UnboundedReceiver<()>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (done_tx, done_rx) = mpsc::unbounded_channel();

    tokio::spawn(run(peer, cmd_rx, is_multiplier, done_tx, blacklist));

    (PeerSendQueueHandle { tx: cmd_tx }, done_rx)
}

/// The idle timeout that applies to this peer: `IDLE_TIMEOUT_DNS` for
/// hostname-bearing peers (DNS resolution is expensive, worth keeping the
/// socket warm), `IDLE_TIMEOUT_IP_ONLY` otherwise.
fn idle_timeout_for(peer: &Peer) -> std::time::Duration {
    if peer.hostname.is_some() {
        IDLE_TIMEOUT_DNS
    } else {
        IDLE_TIMEOUT_IP_ONLY
    }
}

/// Drops expired messages from the front of the queue. Peers with a
/// hostname never expire messages — the queue is meant to survive long DNS
/// dark periods.
fn drop_expired(queue: &mut VecDeque<QueuedMessage>, peer: &Peer, now: Instant) {
    if peer.hostname.is_some() {
        return;
    }
    while let Some(front) = queue.front() {
        if front.expires_at <= now {
            queue.pop_front();
        } else {
            break;
        }
    }
}

/// Drops queued messages that must not reach `peer` given its current
/// blacklist status. Run before ever dialing out, so a peer banned after its
/// messages were queued never gets connected to just to have the send
/// dropped anyway.
fn drop_blacklisted(queue: &mut VecDeque<QueuedMessage>, peer: &Peer, blacklist: &Blacklist) {
    queue.retain(|msg| {
        let honor_relaxed = !msg.allow_relaxed_blacklist;
        let blocked = blacklist.exists(peer, honor_relaxed);
        if blocked {
            tracing::debug!(peer = %peer, "dropping queued send to blacklisted peer");
        }
        !blocked
    });
}

async fn resolve(peer: &Peer) -> Option<std::net::SocketAddr> {
    match &peer.hostname {
        Some(host) => {
            let addr_str = format!("{}:{}", host, peer.port);
            tokio::net::lookup_host(addr_str)
                .await
                .ok()
                .and_then(|mut it| it.next())
        }
        None => Some(std::net::SocketAddr::new(peer.ip_addr(), peer.port)),
    }
}

async fn connect(peer: &Peer) -> std::io::Result<TcpStream> {
    let addr = resolve(peer)
        .await
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "dns resolution failed"))?;

    tokio::time::timeout(CONNECTION_TIMEOUT, TcpStream::connect(addr))
        .await
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"))?
}

/// Half-close, drain, then drop — a graceful close that does not surface
/// errors to the caller (the socket is going away regardless).
async fn close_gracefully(mut stream: TcpStream) {
    let _ = stream.shutdown().await;
}

async fn run(
    peer: Peer,
    mut cmd_rx: mpsc::UnboundedReceiver<QueueCommand>,
    is_multiplier: bool,
    done_tx: mpsc::UnboundedSender<()>,
    blacklist: Blacklist,
) {
    let mut queue: VecDeque<QueuedMessage> = VecDeque::new();
    let mut stream: Option<TcpStream> = None;
    let idle_timeout = idle_timeout_for(&peer);

    loop {
        if !peer.is_routable() {
            tracing::debug!(peer = %peer, "dropping unroutable peer send queue");
            break;
        }

        let wait_for = if stream.is_none() && !queue.is_empty() {
            // Actively (re)connecting — poll commands without long idle wait.
            std::time::Duration::from_millis(10)
        } else if is_multiplier {
            // Multipliers never idle-time-out.
            std::time::Duration::from_secs(u64::MAX / 2)
        } else {
            idle_timeout
        };

        let recv = tokio::time::timeout(wait_for, cmd_rx.recv()).await;

        match recv {
            Ok(Some(QueueCommand::Enqueue {
                bytes,
                allow_relaxed_blacklist,
            })) => {
                queue.push_back(QueuedMessage {
                    bytes,
                    allow_relaxed_blacklist,
                    expires_at: Instant::now() + MESSAGE_EXPIRE_TIME,
                });
            }
            Ok(Some(QueueCommand::Close)) => {
                if let Some(s) = stream.take() {
                    close_gracefully(s).await;
                }
                break;
            }
            Ok(None) => {
                // Sender dropped — owner is gone.
                if let Some(s) = stream.take() {
                    close_gracefully(s).await;
                }
                break;
            }
            Err(_elapsed) => {
                if stream.is_some() && queue.is_empty() {
                    tracing::debug!(peer = %peer, "send queue idle, closing");
                    if let Some(s) = stream.take() {
                        close_gracefully(s).await;
                    }
                    if !is_multiplier {
                        break;
                    }
                }
                // Retry connect below on the next loop iteration.
            }
        }

        drop_expired(&mut queue, &peer, Instant::now());
        drop_blacklisted(&mut queue, &peer, &blacklist);

        if queue.is_empty() {
            if stream.is_none() && !is_multiplier {
                // Nothing to send and nothing connected: give up.
                break;
            }
            continue;
        }

        if stream.is_none() {
            match connect(&peer).await {
                Ok(s) => stream = Some(s),
                Err(e) => {
                    tracing::debug!(peer = %peer, error = %e, "connect failed, will retry");
                    tokio::time::sleep(RECONNECT_INTERVAL).await;
                    continue;
                }
            }
        }

        while let Some(msg) = queue.front() {
            if msg.expires_at <= Instant::now() && peer.hostname.is_none() {
                queue.pop_front();
                continue;
            }

            // A message queued before the peer was banned (or one explicitly
            // marked to survive a relaxed ban) must still be checked at the
            // moment it's actually about to go out, since blacklist state can
            // change at any time after enqueue.
            let honor_relaxed = !msg.allow_relaxed_blacklist;
            if blacklist.exists(&peer, honor_relaxed) {
                tracing::debug!(peer = %peer, "dropping queued send to blacklisted peer");
                queue.pop_front();
                continue;
            }

            let bytes = msg.bytes.clone();
            let started = Instant::now();
            let write_result = stream.as_mut().unwrap().write_all(&bytes).await;
            let elapsed = started.elapsed();

            if elapsed > SLOW_SEND_TO_REPORT {
                tracing::warn!(peer = %peer, elapsed_ms = elapsed.as_millis(), "slow send to peer");
            }

            match write_result {
                Ok(()) => {
                    queue.pop_front();
                }
                Err(e) => {
                    tracing::debug!(peer = %peer, error = %e, "write failed, reconnecting");
                    if let Some(s) = stream.take() {
                        close_gracefully(s).await;
                    }
                    tokio::time::sleep(RECONNECT_INTERVAL).await;
                    break;
                }
            }
        }
    }

    let _ = done_tx.send(());
}
