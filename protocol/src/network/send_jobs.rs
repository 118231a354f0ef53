//! # SendJobs
//!
//! Single-owner registry of [`super::send_queue`] tasks, one per destination
//! peer. Every outbound frame for a given peer is posted to the same queue,
//! so ordering between two sends to the same peer is preserved even though
//! sends to different peers run fully concurrently.
//!
//! Mirrors the single `io_context`-owned `SendJobs` singleton in the
//! original source: there, one thread drains a job queue and hands work to
//! per-peer `PeerSendQueue`s; here the "thread" is this struct's owner task
//! and the per-peer work is a spawned `tokio` task per [`super::send_queue`].

use super::blacklist::Blacklist;
use super::peer::{Peer, PeerKey};
use super::send_queue::{self, PeerSendQueueHandle};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

struct Entry {
    handle: PeerSendQueueHandle,
}

/// Shared handle; cloneable, cheap, safe to hand to every connection task and
/// RPC handler that needs to originate outbound traffic.
#[derive(Clone)]
pub struct SendJobs {
    queues: Arc<Mutex<HashMap<PeerKey, Entry>>>,
    blacklist: Blacklist,
}

impl SendJobs {
    pub fn new(blacklist: Blacklist) -> Self {
        Self {
            queues: Arc::new(Mutex::new(HashMap::new())),
            blacklist,
        }
    }

    /// Sends `bytes` to `peer`, creating its queue task on first use.
    /// `is_multiplier` marks peers (e.g. a lookup's broadcast fan-out list)
    /// whose queue should never idle-time-out. No frame leaves this registry
    /// for a strictly-blacklisted peer.
    pub fn send_message(&self, peer: &Peer, bytes: Bytes, is_multiplier: bool) {
        if !peer.is_routable() {
            tracing::debug!(peer = %peer, "refusing to enqueue send to unroutable peer");
            return;
        }
        if self.blacklist.exists(peer, true) {
            tracing::debug!(peer = %peer, "refusing to enqueue send to blacklisted peer");
            return;
        }

        let key = peer.key();
        let handle = {
            let mut queues = self.queues.lock();
            if let Some(entry) = queues.get(&key) {
                entry.handle.clone()
            } else {
                let (handle, done_rx) = send_queue::spawn(peer.clone(), is_multiplier, self.blacklist.clone());
                queues.insert(key.clone(), Entry { handle: handle.clone() });
                self.reap_on_done(key, done_rx);
                handle
            }
        };

        handle.enqueue(bytes, false);
    }

    /// Same as [`Self::send_message`] but allows the frame through even if a
    /// relaxed blacklist entry exists for the destination (used for replies
    /// that must reach a peer we've only soft-banned). A strict entry still
    /// blocks the send.
    pub fn send_message_allow_relaxed(&self, peer: &Peer, bytes: Bytes, is_multiplier: bool) {
        if !peer.is_routable() {
            return;
        }
        if self.blacklist.exists(peer, false) {
            tracing::debug!(peer = %peer, "refusing to enqueue send to strictly blacklisted peer");
            return;
        }
        let key = peer.key();
        let handle = {
            let mut queues = self.queues.lock();
            if let Some(entry) = queues.get(&key) {
                entry.handle.clone()
            } else {
                let (handle, done_rx) = send_queue::spawn(peer.clone(), is_multiplier, self.blacklist.clone());
                queues.insert(key.clone(), Entry { handle: handle.clone() });
                self.reap_on_done(key, done_rx);
                handle
            }
        };
        handle.enqueue(bytes, true);
    }

    /// Broadcasts `bytes` to every peer in `peers`, each through its own
    /// queue so one slow/unreachable peer cannot stall delivery to others.
    pub fn broadcast(&self, peers: &[Peer], bytes: Bytes) {
        for peer in peers {
            self.send_message(peer, bytes.clone(), false);
        }
    }

    pub fn close(&self, peer: &Peer) {
        if let Some(entry) = self.queues.lock().remove(&peer.key()) {
            entry.handle.close();
        }
    }

    pub fn active_peer_count(&self) -> usize {
        self.queues.lock().len()
    }

    /// Removes the map entry once the underlying queue task finishes on its
    /// own (idle timeout with nothing left to send, or unroutable peer).
    fn reap_on_done(&self, key: PeerKey, mut done_rx: mpsc::UnboundedReceiver<()>) {
        let queues = self.queues.clone();
        tokio::spawn(async move {
            done_rx.recv().await;
            queues.lock().remove(&key);
        });
    }
}
