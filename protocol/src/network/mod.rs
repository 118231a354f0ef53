//! # Network Module
//!
//! P2P networking layer for the NOVA protocol. Handles validator node
//! lifecycle, consensus (hybrid PoS+PoA), transaction mempool management,
//! gossip-based message propagation, RPC API definitions, and state
//! synchronization between peers.
//!
//! ## Architecture
//!
//! ```text
//! node.rs          — Validator node lifecycle and peer management
//! consensus.rs      — Hybrid PoS+PoA consensus engine with BFT finality
//! mempool.rs        — Priority-ordered transaction pool with thread-safe access
//! rpc.rs            — JSON-RPC method definitions and request/response types
//! sync.rs           — Chain state synchronization protocol
//!
//! peer.rs           — Peer identity (IP/port/hostname/node_id)
//! wire.rs           — Frame codec for the TCP wire protocol
//! blacklist.rs      — Process-wide banned-peer set
//! guard.rs          — Static guard key sets and IP exclusion ranges
//! reputation.rs     — Per-IP numeric reputation feeding the blacklist
//! send_queue.rs     — Per-peer outbound queue state machine
//! send_jobs.rs      — Registry owning one send queue per peer
//! server.rs         — TCP accept loop and per-connection framing
//! rumor.rs          — RRS push-pull epidemic gossip engine
//! ds_composition.rs — Directory-service committee rotation
//! api_pool.rs       — Bridge between the network core and RPC handlers
//! p2p.rs            — Top-level facade tying the above together
//! ```
//!
//! ## Design Decisions
//!
//! - Consensus uses round-robin proposer selection weighted by stake (PoS)
//!   with an authority set for block signing (PoA). This gives us fast
//!   finality without the energy waste of pure PoW.
//! - The mempool is protected by `parking_lot::RwLock` rather than `tokio::Mutex`
//!   because mempool reads vastly outnumber writes, and we want zero-cost
//!   reads on the hot path (block production).
//! - Broadcast deduplication uses a bounded seen-hash cache (SHA-256, since
//!   broadcast frames carry a SHA-256 integrity hash already); a sweep evicts
//!   entries older than `BROADCAST_EXPIRY`.
//! - The RPC layer defines types only — actual HTTP serving happens in the
//!   node binary via axum. The protocol crate stays transport-agnostic; the
//!   network core's only bridge to it is `api_pool::ApiThreadPool`.

pub mod api_pool;
pub mod blacklist;
pub mod consensus;
pub mod consensus_loop;
pub mod ds_composition;
pub mod guard;
pub mod mempool;
pub mod node;
pub mod p2p;
pub mod peer;
pub mod producer;
pub mod reputation;
pub mod rpc;
pub mod rumor;
pub mod send_jobs;
pub mod send_queue;
pub mod server;
pub mod sync;
pub mod wire;

pub use api_pool::{ApiThreadPool, Handler as ApiHandler, Request as ApiRequest, Response as ApiResponse};
pub use blacklist::{BanLevel, Blacklist};
pub use consensus::{
    ConsensusConfig, ConsensusEngine, ConsensusRound, FinalizedBlock, ValidatorInfo, ValidatorSet,
    Vote,
};
pub use consensus_loop::{ConsensusLoop, ConsensusLoopConfig, ConsensusLoopError};
pub use ds_composition::{
    update_ds_committee_composition, CommitteeMember, GuardMode, MinerInfo, NodeRole, RotationInput,
};
pub use guard::Guard;
pub use mempool::{Mempool, MempoolConfig};
pub use node::{NodeStatus, ValidatorNode};
pub use p2p::{Message, MessageDispatcher, P2p};
pub use peer::{ip_to_u128, u128_to_ip, Peer, PeerKey};
pub use producer::{BlockProducer, BlockProductionError, ProducedBlock, TxResult};
pub use reputation::ReputationManager;
pub use rpc::{RpcError, RpcMethod, RpcRequest, RpcResponse};
pub use rumor::{GossipHeader, RumorAction, RumorManager, RumorMessageType};
pub use send_jobs::SendJobs;
pub use send_queue::PeerSendQueueHandle;
pub use server::P2PServer;
pub use sync::{SyncProtocol, SyncRequest, SyncResponse};
pub use wire::{frame, try_read, RawFrame, ReadOutcome, StartByte, WireError};
