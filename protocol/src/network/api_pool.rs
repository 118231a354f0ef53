//! # APIThreadPool
//!
//! The sole supported bridge between the network core and higher-level RPC
//! handlers. N synchronous worker threads (handlers may block on storage —
//! this pool does not assume an async-friendly handler) pop requests off a
//! bounded queue, invoke a user handler, and push responses onto a second
//! queue. Overflowing the request queue synthesises a `503` instead of
//! blocking the caller.

use super::peer::Peer;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::Notify;

#[derive(Clone, Debug)]
pub struct Request {
    pub id: u64,
    pub is_websocket: bool,
    pub from: Peer,
    pub body: Bytes,
}

#[derive(Clone, Debug)]
pub struct Response {
    pub id: u64,
    pub is_websocket: bool,
    pub code: u16,
    pub body: Bytes,
}

impl Response {
    fn service_unavailable(id: u64, is_websocket: bool) -> Self {
        Self {
            id,
            is_websocket,
            code: 503,
            body: Bytes::from_static(b"service unavailable: request queue full"),
        }
    }
}

/// Per-worker saturation marker, used only for structured logging: `'I'`dle
/// or `'W'`orking.
const OCCUPANCY_IDLE: u8 = b'I';
const OCCUPANCY_WORKING: u8 = b'W';

pub type Handler = dyn Fn(Request) -> Response + Send + Sync;

struct Shared {
    response_queue: parking_lot::Mutex<VecDeque<Response>>,
    response_notify: Arc<Notify>,
    in_flight: AtomicUsize,
    max_queue_size: usize,
}

/// Handle to a running pool. Clone freely; worker threads and the queue are
/// shared via `Arc`.
#[derive(Clone)]
pub struct ApiThreadPool {
    request_tx: std_mpsc::Sender<Request>,
    shared: Arc<Shared>,
    occupancy: Arc<Vec<AtomicU8>>,
}

impl ApiThreadPool {
    pub fn new(num_threads: usize, max_queue_size: usize, handler: Arc<Handler>) -> Self {
        let (request_tx, request_rx) = std_mpsc::channel::<Request>();
        let request_rx = Arc::new(std::sync::Mutex::new(request_rx));

        let shared = Arc::new(Shared {
            response_queue: parking_lot::Mutex::new(VecDeque::new()),
            response_notify: Arc::new(Notify::new()),
            in_flight: AtomicUsize::new(0),
            max_queue_size,
        });

        let occupancy: Arc<Vec<AtomicU8>> = Arc::new(
            (0..num_threads)
                .map(|_| AtomicU8::new(OCCUPANCY_IDLE))
                .collect(),
        );

        let mut workers = Vec::with_capacity(num_threads);
        for worker_idx in 0..num_threads {
            let request_rx = request_rx.clone();
            let shared = shared.clone();
            let occupancy = occupancy.clone();
            let handler = handler.clone();

            let join: JoinHandle<()> = std::thread::Builder::new()
                .name(format!("api-pool-{worker_idx}"))
                .spawn(move || loop {
                    let request = {
                        let rx = request_rx.lock().expect("request_rx mutex poisoned");
                        rx.recv()
                    };
                    let Ok(request) = request else {
                        break;
                    };

                    occupancy[worker_idx].store(OCCUPANCY_WORKING, Ordering::Relaxed);
                    shared.in_flight.fetch_sub(1, Ordering::SeqCst);

                    let response = handler(request);
                    push_response(&shared, response);

                    occupancy[worker_idx].store(OCCUPANCY_IDLE, Ordering::Relaxed);
                })
                .expect("failed to spawn api pool worker thread");
            workers.push(join);
        }
        // Worker join handles are intentionally detached: the pool's
        // lifetime is the process lifetime, and `request_tx` dropping when
        // `ApiThreadPool` is dropped is what unwinds the threads.
        std::mem::forget(workers);

        Self {
            request_tx,
            shared,
            occupancy,
        }
    }

    /// Enqueues `request`. Synthesises a `503` response directly (without
    /// touching the worker queue) when `max_queue_size` would be exceeded.
    pub fn push_request(&self, request: Request) {
        let in_flight = self.shared.in_flight.fetch_add(1, Ordering::SeqCst);
        if in_flight >= self.shared.max_queue_size {
            self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
            push_response(
                &self.shared,
                Response::service_unavailable(request.id, request.is_websocket),
            );
            return;
        }

        if self.request_tx.send(request).is_err() {
            tracing::error!("api pool request channel closed, workers gone");
        }
    }

    /// Drains every response currently queued. Call after being woken by
    /// [`Self::response_ready`].
    pub fn drain_responses(&self) -> Vec<Response> {
        let mut queue = self.shared.response_queue.lock();
        queue.drain(..).collect()
    }

    /// Resolves once the response queue has transitioned from empty to
    /// non-empty. Mirrors the edge-triggered wakeup in the original: callers
    /// that are already awake and draining don't get redundant notifications.
    pub async fn response_ready(&self) {
        self.shared.response_notify.notified().await;
    }

    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    /// One character per worker: `'W'` if busy, `'I'` if idle. Intended for
    /// a single structured log field summarising pool saturation.
    pub fn occupancy_string(&self) -> String {
        self.occupancy
            .iter()
            .map(|c| c.load(Ordering::Relaxed) as char)
            .collect()
    }
}

fn push_response(shared: &Shared, response: Response) {
    let mut queue = shared.response_queue.lock();
    queue.push_back(response);
    if queue.len() == 1 {
        shared.response_notify.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn echo_handler() -> Arc<Handler> {
        Arc::new(|req: Request| Response {
            id: req.id,
            is_websocket: req.is_websocket,
            code: 200,
            body: req.body,
        })
    }

    fn req(id: u64) -> Request {
        Request {
            id,
            is_websocket: false,
            from: Peer::new(1, 9740),
            body: Bytes::from_static(b"ping"),
        }
    }

    #[tokio::test]
    async fn request_is_echoed_back_as_response() {
        let pool = ApiThreadPool::new(2, 16, echo_handler());
        pool.push_request(req(1));

        tokio::time::timeout(Duration::from_secs(2), pool.response_ready())
            .await
            .expect("should have received a response notification");

        let responses = pool.drain_responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].code, 200);
    }

    #[tokio::test]
    async fn overflow_synthesises_503_without_touching_workers() {
        let pool = ApiThreadPool::new(1, 0, echo_handler());
        pool.push_request(req(1));

        tokio::time::timeout(Duration::from_secs(2), pool.response_ready())
            .await
            .unwrap();
        let responses = pool.drain_responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].code, 503);
    }

    #[tokio::test]
    async fn many_requests_all_get_responses() {
        let pool = ApiThreadPool::new(4, 128, echo_handler());
        for i in 0..50 {
            pool.push_request(req(i));
        }

        let mut collected = Vec::new();
        while collected.len() < 50 {
            tokio::time::timeout(Duration::from_secs(2), pool.response_ready())
                .await
                .expect("timed out waiting for all responses");
            collected.extend(pool.drain_responses());
        }
        assert_eq!(collected.len(), 50);
    }

    #[test]
    fn occupancy_string_has_one_char_per_worker() {
        let pool = ApiThreadPool::new(3, 16, echo_handler());
        assert_eq!(pool.occupancy_string().len(), 3);
    }
}
