//! # P2P
//!
//! The single shared facade applications hold: owns the listener(s), the
//! outbound send machinery, the broadcast dedup cache, and the gossip
//! engine, and turns raw inbound frames into calls on a caller-supplied
//! `Message` dispatcher closure.

use super::blacklist::{BanLevel, Blacklist};
use super::peer::Peer;
use super::rumor::{GossipHeader, RumorManager};
use super::send_jobs::SendJobs;
use super::server::P2PServer;
use super::wire::{self, RawFrame, StartByte};
use crate::config::{
    BROADCAST_EXPIRY, BROADCAST_INTERVAL, MAX_GOSSIP_MSG_SIZE_IN_BYTES, MAX_MESSAGE_SIZE_IN_BYTES,
};
use crate::crypto::keys::NovaKeypair;
use bytes::Bytes;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

/// A reassembled message handed to the application layer, independent of
/// which wire class it arrived as.
///
/// `trace` mirrors whatever `inject_trace` the sender passed to
/// `send_message`/`send_broadcast_message`; it never crosses the wire, so on
/// the inbound side it carries [`RawFrame::trace_info`] (always `None` today)
/// rather than anything the remote peer set.
#[derive(Clone, Debug)]
pub struct Message {
    pub body: Bytes,
    pub from: Peer,
    pub start_byte: StartByte,
    pub trace: Option<String>,
}

/// Application-supplied callback invoked for every message the core decides
/// should be dispatched upward. Returning `false` closes the connection it
/// arrived on (mirrors `P2PServer`'s per-frame callback contract).
pub trait MessageDispatcher: Fn(Message) -> bool + Send + Sync + 'static {}
impl<T: Fn(Message) -> bool + Send + Sync + 'static> MessageDispatcher for T {}

struct SelfIdentity {
    peer: Peer,
    keypair: NovaKeypair,
}

#[derive(Default)]
struct BroadcastDedup {
    seen: std::collections::HashSet<[u8; 32]>,
    order: VecDeque<([u8; 32], Instant)>,
}

impl BroadcastDedup {
    fn insert_if_new(&mut self, hash: [u8; 32]) -> bool {
        if self.seen.contains(&hash) {
            return false;
        }
        self.seen.insert(hash);
        self.order.push_back((hash, Instant::now()));
        true
    }

    fn evict_expired(&mut self) {
        let cutoff = Instant::now().checked_sub(BROADCAST_EXPIRY).unwrap_or(Instant::now());
        while let Some((hash, seen_at)) = self.order.front() {
            if *seen_at <= cutoff {
                self.seen.remove(hash);
                self.order.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Shared handle; clone and pass to everything that needs to originate or
/// receive P2P traffic.
#[derive(Clone)]
pub struct P2p {
    self_identity: Arc<Mutex<Option<SelfIdentity>>>,
    send_jobs: SendJobs,
    blacklist: Blacklist,
    rumor: RumorManager,
    dedup: Arc<Mutex<BroadcastDedup>>,
    servers: Arc<Mutex<Vec<P2PServer>>>,
}

impl P2p {
    pub fn new(self_listen_port: u16, blacklist: Blacklist) -> Self {
        Self {
            self_identity: Arc::new(Mutex::new(None)),
            send_jobs: SendJobs::new(blacklist.clone()),
            blacklist,
            rumor: RumorManager::new(self_listen_port),
            dedup: Arc::new(Mutex::new(BroadcastDedup::default())),
            servers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Must be called before [`Self::start_server`].
    pub fn set_self_identity(&self, peer: Peer, keypair: NovaKeypair) {
        *self.self_identity.lock() = Some(SelfIdentity { peer, keypair });
    }

    pub fn self_peer(&self) -> Option<Peer> {
        self.self_identity.lock().as_ref().map(|s| s.peer.clone())
    }

    /// Number of peers with a live (or being-(re)connected) send queue.
    pub fn active_peer_count(&self) -> usize {
        self.send_jobs.active_peer_count()
    }

    /// Bound address of the primary listener, once [`Self::start_server`]
    /// has completed. Mainly useful in tests that bind to port 0.
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.servers.lock().first().map(|s| s.local_addr())
    }

    /// Spawns a primary listener on `port`, and a second on `additional_port`
    /// if given — both feed the same `dispatcher`.
    pub async fn start_server<D>(
        &self,
        port: u16,
        additional_port: Option<u16>,
        dispatcher: Arc<D>,
    ) -> std::io::Result<()>
    where
        D: MessageDispatcher,
    {
        let this = self.clone();
        let dispatch_closure = move |from: Peer, frame: RawFrame| this.dispatch_message(from, frame, dispatcher.clone());

        let primary = P2PServer::create_and_start(
            port,
            Arc::new(dispatch_closure.clone()),
            self.blacklist.clone(),
            false,
            MAX_MESSAGE_SIZE_IN_BYTES,
        )
        .await?;
        self.servers.lock().push(primary);

        if let Some(extra_port) = additional_port {
            let additional = P2PServer::create_and_start(
                extra_port,
                Arc::new(dispatch_closure),
                self.blacklist.clone(),
                true,
                MAX_MESSAGE_SIZE_IN_BYTES,
            )
            .await?;
            self.servers.lock().push(additional);
        }

        self.spawn_dedup_eviction_job();
        Ok(())
    }

    fn spawn_dedup_eviction_job(&self) {
        let dedup = self.dedup.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(BROADCAST_INTERVAL).await;
                dedup.lock().evict_expired();
            }
        });
    }

    /// Sends `body` as a `NORMAL` message to `peer`. `inject_trace` is a
    /// caller-supplied tracing correlation id; it is not carried on the wire.
    pub fn send_message(&self, peer: &Peer, body: Bytes, inject_trace: Option<String>) {
        match wire::frame(&body, StartByte::Normal, MAX_MESSAGE_SIZE_IN_BYTES, inject_trace.as_deref()) {
            Ok(framed) => self.send_jobs.send_message(peer, framed, false),
            Err(e) => tracing::warn!(peer = %peer, error = %e, "refusing to send oversized message"),
        }
    }

    pub fn send_message_to_many(&self, peers: &[Peer], body: Bytes, inject_trace: Option<String>) {
        for peer in peers {
            self.send_message(peer, body.clone(), inject_trace.clone());
        }
    }

    /// Hashes `body`, records the hash so our own re-receipt of it over
    /// gossip/broadcast is ignored, and sends it as `BROADCAST` to `peers`.
    pub fn send_broadcast_message(&self, peers: &[Peer], body: Bytes, inject_trace: Option<String>) {
        let hash = {
            let digest = Sha256::digest(&body);
            let mut out = [0u8; 32];
            out.copy_from_slice(&digest);
            out
        };
        self.dedup.lock().insert_if_new(hash);

        match wire::frame(&body, StartByte::Broadcast, MAX_MESSAGE_SIZE_IN_BYTES, inject_trace.as_deref()) {
            Ok(framed) => {
                for peer in peers {
                    self.send_jobs.send_message(peer, framed.clone(), false);
                }
            }
            Err(e) => tracing::warn!(error = %e, "refusing to broadcast oversized message"),
        }
    }

    /// Synchronous escape hatch for CLI tooling: connects, sends, and closes
    /// without going through `SendJobs`. Must not be used by consensus code.
    pub async fn send_message_no_queue(peer: &Peer, body: &[u8], start_byte: StartByte) -> std::io::Result<()> {
        use tokio::io::AsyncWriteExt;
        let framed = wire::frame(body, start_byte, MAX_MESSAGE_SIZE_IN_BYTES, None)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
        let mut stream = tokio::net::TcpStream::connect((peer.ip_addr(), peer.port)).await?;
        stream.write_all(&framed).await?;
        stream.shutdown().await
    }

    pub fn initialize_rumor_manager(&self, peers: impl IntoIterator<Item = Peer>) {
        let actions = self.rumor.initialize(peers);
        self.dispatch_rumor_actions(actions);
    }

    pub fn start_gossip_rounds(&self) {
        let mut round_actions = self.rumor.start_rounds();
        let this = self.clone();
        tokio::spawn(async move {
            while let Some(actions) = round_actions.recv().await {
                this.dispatch_rumor_actions(actions);
            }
        });
    }

    pub fn stop_gossip_rounds(&self) {
        self.rumor.stop_rounds();
    }

    pub fn spread_rumor(&self, body: Bytes) -> bool {
        let (accepted, actions) = self.rumor.add_rumor(body);
        self.dispatch_rumor_actions(actions);
        accepted
    }

    pub fn send_rumor_to_foreign_peer(&self, peer: &Peer, body: &[u8]) {
        let keypair = {
            let guard = self.self_identity.lock();
            match guard.as_ref() {
                Some(id) => id.keypair.clone(),
                None => {
                    tracing::warn!("send_rumor_to_foreign_peer called before set_self_identity");
                    return;
                }
            }
        };
        let wrapped = self.rumor.send_rumor_to_foreign_peer(&keypair, body);
        self.send_gossip_frame(peer, wrapped);
    }

    fn dispatch_rumor_actions(&self, actions: Vec<super::rumor::RumorAction>) {
        // `action.payload` is already a fully encoded gossip header + body
        // (built by `RumorManager`); this just frames and routes it.
        for action in actions {
            self.send_gossip_frame(&action.to, action.payload);
        }
    }

    fn send_gossip_frame(&self, peer: &Peer, gossip_payload: Bytes) {
        match wire::frame(&gossip_payload, StartByte::Gossip, MAX_GOSSIP_MSG_SIZE_IN_BYTES, None) {
            Ok(framed) => self.send_jobs.send_message(peer, framed, true),
            Err(e) => tracing::warn!(peer = %peer, error = %e, "refusing to send oversized gossip frame"),
        }
    }

    /// Invoked by every [`P2PServer`] for each reassembled inbound frame.
    fn dispatch_message<D: MessageDispatcher>(&self, from: Peer, frame: RawFrame, dispatcher: Arc<D>) -> bool {
        match frame.start_byte {
            StartByte::Normal => dispatcher(Message {
                body: frame.message,
                from,
                start_byte: StartByte::Normal,
                trace: frame.trace_info,
            }),

            StartByte::Broadcast => {
                let Some(hash) = frame.broadcast_hash else {
                    self.blacklist.add(&from, BanLevel::Strict);
                    return false;
                };
                let computed = Sha256::digest(&frame.message);
                if computed.as_slice() != hash {
                    self.blacklist.add(&from, BanLevel::Strict);
                    return false;
                }

                let is_new = self.dedup.lock().insert_if_new(hash);
                if !is_new {
                    return true;
                }

                dispatcher(Message {
                    body: frame.message,
                    from,
                    start_byte: StartByte::Broadcast,
                    trace: frame.trace_info,
                })
            }

            StartByte::Gossip => {
                let Some((header, payload)) = GossipHeader::decode(&frame.message) else {
                    self.blacklist.add(&from, BanLevel::Strict);
                    return false;
                };

                let remote_listener = Peer::new(from.ip, header.sender_port as u16);
                let outcome = self.rumor.rumor_received(remote_listener, header.msg_type, payload);
                self.dispatch_rumor_actions(outcome.actions);

                if let Some(body) = outcome.dispatch {
                    return dispatcher(Message {
                        body,
                        from,
                        start_byte: StartByte::Gossip,
                        trace: frame.trace_info,
                    });
                }
                true
            }
        }
    }
}
