//! # RumorManager
//!
//! Rumour-Riding-Stochastic (RRS) push-pull epidemic gossip. A rumour's
//! 32-byte hash travels first and cheaply; the body is pulled on demand and
//! dispatched upward exactly once per node, the first time it arrives.
//!
//! This module is deliberately stateless with respect to sockets: it
//! consumes [`RumorMessageType`]/bytes and returns [`ReceiveOutcome`]s
//! describing what to send next, the same way [`super::sync`] keeps the sync
//! engine transport-agnostic. The caller (the [`super::p2p`] dispatcher)
//! turns `RumorAction`s into actual `GOSSIP`-framed sends via
//! [`super::send_jobs::SendJobs`].

use super::peer::{Peer, PeerKey};
use crate::config::ROUND_TIME_IN_MS;
use crate::crypto::keys::{NovaPublicKey, NovaSignature};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use parking_lot::Mutex;

pub const GOSSIP_MESSAGE_HEADER_LEN: usize = 9;

/// Rumours are pushed for this many rounds before the holder gives up
/// advertising them further (the rest of the network is expected to have
/// converged by then via pull).
const MAX_PUSH_ROUNDS: u8 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RumorMessageType {
    Undefined,
    EmptyPush,
    EmptyPull,
    LazyPush,
    LazyPull,
    Push,
    Pull,
    Forward,
}

impl RumorMessageType {
    pub fn to_byte(self) -> u8 {
        match self {
            RumorMessageType::Undefined => 0,
            RumorMessageType::EmptyPush => 1,
            RumorMessageType::EmptyPull => 2,
            RumorMessageType::LazyPush => 3,
            RumorMessageType::LazyPull => 4,
            RumorMessageType::Push => 5,
            RumorMessageType::Pull => 6,
            RumorMessageType::Forward => 7,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            0 => RumorMessageType::Undefined,
            1 => RumorMessageType::EmptyPush,
            2 => RumorMessageType::EmptyPull,
            3 => RumorMessageType::LazyPush,
            4 => RumorMessageType::LazyPull,
            5 => RumorMessageType::Push,
            6 => RumorMessageType::Pull,
            7 => RumorMessageType::Forward,
            _ => return None,
        })
    }
}

/// `[type:1][round:4 BE][sender_port:4 BE]`, immediately followed by
/// whatever payload the message type carries (a hash, or a raw body).
pub struct GossipHeader {
    pub msg_type: RumorMessageType,
    pub round: u32,
    pub sender_port: u32,
}

impl GossipHeader {
    pub fn encode(&self, payload: &[u8]) -> Bytes {
        let mut out = BytesMut::with_capacity(GOSSIP_MESSAGE_HEADER_LEN + payload.len());
        out.put_u8(self.msg_type.to_byte());
        out.put_u32(self.round);
        out.put_u32(self.sender_port);
        out.put_slice(payload);
        out.freeze()
    }

    /// Returns the header plus a slice of whatever trailed it.
    pub fn decode(buf: &[u8]) -> Option<(Self, &[u8])> {
        if buf.len() < GOSSIP_MESSAGE_HEADER_LEN {
            return None;
        }
        let mut cursor = buf;
        let msg_type = RumorMessageType::from_byte(cursor.get_u8())?;
        let round = cursor.get_u32();
        let sender_port = cursor.get_u32();
        Some((
            GossipHeader {
                msg_type,
                round,
                sender_port,
            },
            cursor,
        ))
    }
}

/// One unit of outbound work the caller should turn into a `GOSSIP`-framed
/// send.
pub struct RumorAction {
    pub to: Peer,
    pub msg_type: RumorMessageType,
    pub payload: Bytes,
}

/// What processing an inbound rumour message produced.
#[derive(Default)]
pub struct ReceiveOutcome {
    pub actions: Vec<RumorAction>,
    /// `Some(body)` exactly once, the first time a rumour's body is known.
    pub dispatch: Option<Bytes>,
}

type Hash = [u8; 32];

struct Inner {
    peers: HashMap<PeerKey, Peer>,
    rumor_id_by_hash: HashMap<Hash, u64>,
    hash_by_rumor_id: HashMap<u64, Hash>,
    next_rumor_id: u64,
    body_by_hash: HashMap<Hash, Bytes>,
    subscribers: HashMap<Hash, HashSet<PeerKey>>,
    pending_pushes: HashMap<Hash, u8>,
    buffered_raw: Vec<Bytes>,
    running: bool,
    round: u32,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            peers: HashMap::new(),
            rumor_id_by_hash: HashMap::new(),
            hash_by_rumor_id: HashMap::new(),
            next_rumor_id: 1,
            body_by_hash: HashMap::new(),
            subscribers: HashMap::new(),
            pending_pushes: HashMap::new(),
            buffered_raw: Vec::new(),
            running: false,
            round: 0,
        }
    }
}

/// Shared handle to the gossip engine for one node.
#[derive(Clone)]
pub struct RumorManager {
    inner: Arc<Mutex<Inner>>,
    self_listen_port: u16,
    wake: Arc<Notify>,
}

impl RumorManager {
    pub fn new(self_listen_port: u16) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            self_listen_port,
            wake: Arc::new(Notify::new()),
        }
    }

    /// (Re)initialises gossip membership. Flushes anything buffered before
    /// peers were known.
    pub fn initialize(&self, peers: impl IntoIterator<Item = Peer>) -> Vec<RumorAction> {
        let mut guard = self.inner.lock();
        guard.peers = peers.into_iter().map(|p| (p.key(), p)).collect();

        if guard.peers.is_empty() {
            return Vec::new();
        }

        let buffered: Vec<Bytes> = guard.buffered_raw.drain(..).collect();
        drop(guard);

        buffered
            .into_iter()
            .flat_map(|body| self.add_rumor(body).1)
            .collect()
    }

    /// Starts the round-timer task and returns the channel its per-round
    /// `LazyPush` advertisements arrive on. The caller (`P2p`) is responsible
    /// for draining it and turning each batch into actual `GOSSIP`-framed
    /// sends via [`super::p2p::P2p::dispatch_rumor_actions`], the same way
    /// `spread_rumor`/`initialize_rumor_manager` dispatch their own actions.
    pub fn start_rounds(&self) -> mpsc::UnboundedReceiver<Vec<RumorAction>> {
        self.inner.lock().running = true;
        let (actions_tx, actions_rx) = mpsc::unbounded_channel();
        let manager = self.clone();
        tokio::spawn(async move { manager.round_loop(actions_tx).await });
        actions_rx
    }

    pub fn stop_rounds(&self) {
        self.inner.lock().running = false;
        self.wake.notify_waiters();
    }

    async fn round_loop(&self, actions_tx: mpsc::UnboundedSender<Vec<RumorAction>>) {
        loop {
            let running = self.inner.lock().running;
            if !running {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(std::time::Duration::from_millis(ROUND_TIME_IN_MS)) => {}
                _ = self.wake.notified() => {
                    if !self.inner.lock().running {
                        break;
                    }
                }
            }

            if !self.inner.lock().running {
                break;
            }

            let actions = self.advance_round();
            if !actions.is_empty() && actions_tx.send(actions).is_err() {
                // Receiver (P2p's drain task) is gone; nothing left to do.
                break;
            }
        }
    }

    /// Advances the round counter and returns the push work due this tick.
    /// Exposed separately from the background loop so callers (and tests)
    /// can drive rounds deterministically without waiting on real timers.
    pub fn advance_round(&self) -> Vec<RumorAction> {
        let mut guard = self.inner.lock();
        guard.round = guard.round.wrapping_add(1);
        let round = guard.round;
        let peers: Vec<Peer> = guard.peers.values().cloned().collect();

        let mut due = Vec::new();
        let mut exhausted = Vec::new();
        for (hash, remaining) in guard.pending_pushes.iter_mut() {
            if *remaining == 0 {
                exhausted.push(*hash);
                continue;
            }
            *remaining -= 1;
            due.push(*hash);
        }
        for hash in exhausted {
            guard.pending_pushes.remove(&hash);
        }
        drop(guard);

        let mut actions = Vec::new();
        for hash in due {
            let header = GossipHeader {
                msg_type: RumorMessageType::LazyPush,
                round,
                sender_port: self.self_listen_port as u32,
            };
            let payload = header.encode(&hash);
            for peer in &peers {
                actions.push(RumorAction {
                    to: peer.clone(),
                    msg_type: RumorMessageType::LazyPush,
                    payload: payload.clone(),
                });
            }
        }
        actions
    }

    /// Offers a locally-originated rumour to the network. Returns `(accepted,
    /// actions)`; `accepted=false` with no actions means rounds aren't
    /// running yet (buffered) or the rumour is already known.
    pub fn add_rumor(&self, body: Bytes) -> (bool, Vec<RumorAction>) {
        let mut guard = self.inner.lock();

        if !guard.running {
            guard.buffered_raw.push(body);
            return (false, Vec::new());
        }

        if guard.peers.is_empty() {
            return (true, Vec::new());
        }

        let hash = hash_of(&body);
        if guard.rumor_id_by_hash.contains_key(&hash) {
            return (false, Vec::new());
        }

        let rumor_id = guard.next_rumor_id;
        guard.next_rumor_id += 1;
        guard.rumor_id_by_hash.insert(hash, rumor_id);
        guard.hash_by_rumor_id.insert(rumor_id, hash);
        guard.body_by_hash.insert(hash, body);
        guard.pending_pushes.insert(hash, MAX_PUSH_ROUNDS);

        (true, Vec::new())
    }

    /// Processes one inbound gossip message from `sender`.
    pub fn rumor_received(
        &self,
        sender: Peer,
        msg_type: RumorMessageType,
        payload: &[u8],
    ) -> ReceiveOutcome {
        let mut guard = self.inner.lock();
        if !guard.peers.contains_key(&sender.key()) {
            return ReceiveOutcome::default();
        }

        match msg_type {
            RumorMessageType::EmptyPush | RumorMessageType::EmptyPull => ReceiveOutcome::default(),

            RumorMessageType::LazyPush | RumorMessageType::LazyPull => {
                let Some(hash) = hash_from_payload(payload) else {
                    return ReceiveOutcome::default();
                };

                let need_pull = match guard.rumor_id_by_hash.get(&hash) {
                    None => {
                        let rumor_id = guard.next_rumor_id;
                        guard.next_rumor_id += 1;
                        guard.rumor_id_by_hash.insert(hash, rumor_id);
                        guard.hash_by_rumor_id.insert(rumor_id, hash);
                        true
                    }
                    Some(_) => !guard.body_by_hash.contains_key(&hash),
                };

                if !need_pull {
                    return ReceiveOutcome::default();
                }

                let header = GossipHeader {
                    msg_type: RumorMessageType::Pull,
                    round: guard.round,
                    sender_port: self.self_listen_port as u32,
                };
                ReceiveOutcome {
                    actions: vec![RumorAction {
                        to: sender,
                        msg_type: RumorMessageType::Pull,
                        payload: header.encode(&hash),
                    }],
                    dispatch: None,
                }
            }

            RumorMessageType::Pull => {
                let Some(hash) = hash_from_payload(payload) else {
                    return ReceiveOutcome::default();
                };

                match guard.body_by_hash.get(&hash).cloned() {
                    Some(body) => {
                        let header = GossipHeader {
                            msg_type: RumorMessageType::Push,
                            round: guard.round,
                            sender_port: self.self_listen_port as u32,
                        };
                        ReceiveOutcome {
                            actions: vec![RumorAction {
                                to: sender,
                                msg_type: RumorMessageType::Push,
                                payload: header.encode(&body),
                            }],
                            dispatch: None,
                        }
                    }
                    None => {
                        guard
                            .subscribers
                            .entry(hash)
                            .or_default()
                            .insert(sender.key());
                        ReceiveOutcome::default()
                    }
                }
            }

            RumorMessageType::Push => {
                let body = Bytes::copy_from_slice(payload);
                let hash = hash_of(&body);

                if !guard.rumor_id_by_hash.contains_key(&hash) {
                    // We never asked for this — unsolicited, ignore.
                    return ReceiveOutcome::default();
                }

                let is_new = !guard.body_by_hash.contains_key(&hash);
                guard.body_by_hash.insert(hash, body.clone());

                let subscribers: Vec<PeerKey> = guard
                    .subscribers
                    .remove(&hash)
                    .map(|s| s.into_iter().filter(|k| *k != sender.key()).collect())
                    .unwrap_or_default();

                let peer_lookup = guard.peers.clone();
                let round = guard.round;
                drop(guard);

                let header = GossipHeader {
                    msg_type: RumorMessageType::Push,
                    round,
                    sender_port: self.self_listen_port as u32,
                };
                let encoded = header.encode(&body);

                let actions = subscribers
                    .into_iter()
                    .filter_map(|key| peer_lookup.get(&key).cloned())
                    .map(|peer| RumorAction {
                        to: peer,
                        msg_type: RumorMessageType::Push,
                        payload: encoded.clone(),
                    })
                    .collect();

                ReceiveOutcome {
                    actions,
                    dispatch: if is_new { Some(body) } else { None },
                }
            }

            RumorMessageType::Forward => {
                drop(guard);
                match verify_forward_envelope(payload) {
                    Some(body) => {
                        let hash = hash_of(&body);
                        let mut guard = self.inner.lock();
                        let is_new = !guard.body_by_hash.contains_key(&hash);
                        guard.body_by_hash.insert(hash, body.clone());
                        ReceiveOutcome {
                            actions: Vec::new(),
                            dispatch: if is_new { Some(body) } else { None },
                        }
                    }
                    None => ReceiveOutcome::default(),
                }
            }

            RumorMessageType::Undefined => ReceiveOutcome::default(),
        }
    }

    /// Wraps `body` as a `FORWARD` envelope and returns the message ready to
    /// be sent as a `GOSSIP` frame to `peer`.
    pub fn send_rumor_to_foreign_peer(&self, keypair: &crate::crypto::keys::NovaKeypair, body: &[u8]) -> Bytes {
        let envelope = sign_forward_envelope(keypair, body);
        let header = GossipHeader {
            msg_type: RumorMessageType::Forward,
            round: 0,
            sender_port: self.self_listen_port as u32,
        };
        header.encode(&envelope)
    }
}

fn hash_of(body: &[u8]) -> Hash {
    let digest = Sha256::digest(body);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

fn hash_from_payload(payload: &[u8]) -> Option<Hash> {
    if payload.len() != 32 {
        return None;
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(payload);
    Some(out)
}

/// `[pubkey:32][signature:64][body...]`.
fn sign_forward_envelope(keypair: &crate::crypto::keys::NovaKeypair, body: &[u8]) -> Bytes {
    let signature = keypair.sign(body);
    let mut out = BytesMut::with_capacity(32 + 64 + body.len());
    out.put_slice(&keypair.public_key_bytes());
    out.put_slice(signature.as_bytes());
    out.put_slice(body);
    out.freeze()
}

fn verify_forward_envelope(payload: &[u8]) -> Option<Bytes> {
    if payload.len() < 32 + 64 {
        return None;
    }
    let pubkey = NovaPublicKey::try_from_slice(&payload[..32]).ok()?;
    let mut sig_bytes = [0u8; 64];
    sig_bytes.copy_from_slice(&payload[32..96]);
    let signature = NovaSignature::from_bytes(sig_bytes);
    let body = &payload[96..];

    if pubkey.verify(body, &signature) {
        Some(Bytes::copy_from_slice(body))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::NovaKeypair;

    fn peer(n: u128) -> Peer {
        Peer::new(n, 9740)
    }

    #[test]
    fn gossip_header_round_trips() {
        let header = GossipHeader {
            msg_type: RumorMessageType::LazyPush,
            round: 42,
            sender_port: 9741,
        };
        let encoded = header.encode(b"payload");
        let (decoded, rest) = GossipHeader::decode(&encoded).unwrap();
        assert_eq!(decoded.msg_type, RumorMessageType::LazyPush);
        assert_eq!(decoded.round, 42);
        assert_eq!(decoded.sender_port, 9741);
        assert_eq!(rest, b"payload");
    }

    #[test]
    fn add_rumor_before_rounds_start_is_buffered() {
        let rm = RumorManager::new(9740);
        let (accepted, actions) = rm.add_rumor(Bytes::from_static(b"hello"));
        assert!(!accepted);
        assert!(actions.is_empty());
    }

    #[test]
    fn initialize_flushes_buffered_rumors_once_peers_known() {
        let rm = RumorManager::new(9740);
        rm.add_rumor(Bytes::from_static(b"hello"));
        rm.inner.lock().running = true;

        let actions = rm.initialize(vec![peer(1), peer(2)]);
        // add_rumor re-run after init has peers and rounds running; no push
        // actions are produced directly by add_rumor (pushes happen via
        // advance_round), so the buffered message is simply now tracked.
        assert!(actions.is_empty());
        assert_eq!(rm.inner.lock().pending_pushes.len(), 1);
    }

    #[test]
    fn unknown_sender_is_ignored() {
        let rm = RumorManager::new(9740);
        rm.inner.lock().running = true;
        let outcome = rm.rumor_received(peer(99), RumorMessageType::Pull, &[0u8; 32]);
        assert!(outcome.actions.is_empty());
        assert!(outcome.dispatch.is_none());
    }

    #[test]
    fn lazy_push_of_unknown_hash_triggers_pull() {
        let rm = RumorManager::new(9740);
        rm.initialize(vec![peer(1)]);
        let hash = hash_of(b"body");
        let header = GossipHeader {
            msg_type: RumorMessageType::LazyPush,
            round: 1,
            sender_port: 9741,
        };
        let payload = header.encode(&hash);
        let (_decoded, hash_bytes) = GossipHeader::decode(&payload).unwrap();

        let outcome = rm.rumor_received(peer(1), RumorMessageType::LazyPush, hash_bytes);
        assert_eq!(outcome.actions.len(), 1);
        assert_eq!(outcome.actions[0].msg_type, RumorMessageType::Pull);
    }

    #[test]
    fn pull_of_known_hash_sends_push() {
        let rm = RumorManager::new(9740);
        rm.initialize(vec![peer(1)]);
        rm.inner.lock().running = true;
        let body = Bytes::from_static(b"known body");
        let hash = hash_of(&body);
        rm.inner.lock().body_by_hash.insert(hash, body.clone());

        let outcome = rm.rumor_received(peer(1), RumorMessageType::Pull, &hash);
        assert_eq!(outcome.actions.len(), 1);
        assert_eq!(outcome.actions[0].msg_type, RumorMessageType::Push);
    }

    #[test]
    fn pull_of_unknown_hash_subscribes_requester() {
        let rm = RumorManager::new(9740);
        rm.initialize(vec![peer(1)]);
        let hash = [7u8; 32];

        let outcome = rm.rumor_received(peer(1), RumorMessageType::Pull, &hash);
        assert!(outcome.actions.is_empty());
        assert!(rm.inner.lock().subscribers.get(&hash).unwrap().contains(&peer(1).key()));
    }

    #[test]
    fn push_dispatches_upward_exactly_once_and_notifies_subscribers() {
        let rm = RumorManager::new(9740);
        rm.initialize(vec![peer(1), peer(2)]);
        let body = Bytes::from_static(b"the rumor body");
        let hash = hash_of(&body);

        // We must have solicited this rumour id first (via a prior LazyPush).
        {
            let mut guard = rm.inner.lock();
            let id = guard.next_rumor_id;
            guard.next_rumor_id += 1;
            guard.rumor_id_by_hash.insert(hash, id);
            guard.subscribers.entry(hash).or_default().insert(peer(2).key());
        }

        let outcome = rm.rumor_received(peer(1), RumorMessageType::Push, &body);
        assert_eq!(outcome.dispatch.as_deref(), Some(body.as_ref()));
        assert_eq!(outcome.actions.len(), 1);
        assert_eq!(outcome.actions[0].to, peer(2));

        // Second identical push must not re-dispatch.
        let outcome2 = rm.rumor_received(peer(1), RumorMessageType::Push, &body);
        assert!(outcome2.dispatch.is_none());
    }

    #[test]
    fn unsolicited_push_is_ignored() {
        let rm = RumorManager::new(9740);
        rm.initialize(vec![peer(1)]);
        let outcome = rm.rumor_received(peer(1), RumorMessageType::Push, b"never asked for this");
        assert!(outcome.dispatch.is_none());
    }

    #[test]
    fn forward_envelope_round_trips_through_sign_and_verify() {
        let keypair = NovaKeypair::generate();
        let rm = RumorManager::new(9740);
        rm.initialize(vec![peer(1)]);

        let wrapped = rm.send_rumor_to_foreign_peer(&keypair, b"gossip from afar");
        let (header, payload) = GossipHeader::decode(&wrapped).unwrap();
        assert_eq!(header.msg_type, RumorMessageType::Forward);

        let outcome = rm.rumor_received(peer(1), RumorMessageType::Forward, payload);
        assert_eq!(outcome.dispatch.as_deref(), Some(&b"gossip from afar"[..]));
    }

    #[test]
    fn forward_envelope_with_bad_signature_is_rejected() {
        let keypair = NovaKeypair::generate();
        let other = NovaKeypair::generate();
        let rm = RumorManager::new(9740);
        rm.initialize(vec![peer(1)]);

        let mut wrapped = sign_forward_envelope(&keypair, b"tampered").to_vec();
        // Swap in a different public key so the signature no longer matches.
        wrapped[0..32].copy_from_slice(&other.public_key_bytes());

        let outcome = rm.rumor_received(peer(1), RumorMessageType::Forward, &wrapped);
        assert!(outcome.dispatch.is_none());
    }

    #[test]
    fn advance_round_pushes_pending_rumors_to_all_peers() {
        let rm = RumorManager::new(9740);
        rm.initialize(vec![peer(1), peer(2)]);
        rm.inner.lock().running = true;
        rm.add_rumor(Bytes::from_static(b"x"));

        let actions = rm.advance_round();
        assert_eq!(actions.len(), 2);
        assert!(actions.iter().all(|a| a.msg_type == RumorMessageType::LazyPush));
    }
}
