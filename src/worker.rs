//! Running render passes on a dedicated thread.
//!
//! The owner moves a surface and an owned snapshot of the matrix to the worker,
//! which renders with its own [`QrRenderer`] and hands the surface back. Each
//! submission gets a [`RenderPassId`]; the reply is routed to the matching
//! [`PendingRender`] by that id alone.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use tiny_skia::Pixmap;
use tokio::runtime::Runtime;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::assets::{Bitmap, FetchLoader};
use crate::canvas::Canvas;
use crate::config::StyleConfiguration;
use crate::error::{RenderError, RenderResult};
use crate::matrix::{ModuleGrid, QrMatrix};
use crate::render::{QrRenderer, RenderReport};

pub type RenderPassId = u64;

type PendingMap = Arc<Mutex<HashMap<RenderPassId, oneshot::Sender<WorkerResponse>>>>;

/// Message sent from the owner to the worker thread.
#[derive(Debug)]
pub enum WorkerRequest {
    Render {
        render_pass_id: RenderPassId,
        style: Box<StyleConfiguration>,
        matrix: ModuleGrid,
        frame_asset: Option<Bitmap>,
        surface: Pixmap,
    },
    Shutdown,
}

/// Reply for one finished pass. The surface comes back even when the pass
/// failed part way through.
#[derive(Debug)]
pub enum WorkerResponse {
    Done {
        render_pass_id: RenderPassId,
        surface: Pixmap,
        outcome: RenderResult<RenderReport>,
    },
}

impl WorkerResponse {
    pub fn render_pass_id(&self) -> RenderPassId {
        match self {
            Self::Done { render_pass_id, .. } => *render_pass_id,
        }
    }

    /// Splits the reply into the surface and the pass result.
    pub fn into_parts(self) -> (Pixmap, RenderResult<RenderReport>) {
        match self {
            Self::Done { surface, outcome, .. } => (surface, outcome),
        }
    }
}

/// A submitted pass that has not been collected yet.
#[derive(Debug)]
pub struct PendingRender {
    id: RenderPassId,
    rx: oneshot::Receiver<WorkerResponse>,
}

impl PendingRender {
    pub fn id(&self) -> RenderPassId {
        self.id
    }

    /// Waits for the worker's reply.
    ///
    /// # Errors
    ///
    /// [`RenderError::WorkerUnavailable`] if the worker stopped before replying.
    pub async fn wait(self) -> RenderResult<WorkerResponse> {
        self.rx.await.map_err(|_| RenderError::WorkerUnavailable)
    }

    /// Blocking variant of [`wait`](Self::wait). Must not be called from
    /// inside an async runtime.
    pub fn wait_blocking(self) -> RenderResult<WorkerResponse> {
        self.rx.blocking_recv().map_err(|_| RenderError::WorkerUnavailable)
    }
}

/// Handle to the render worker thread. Dropping it stops the worker.
pub struct WorkerBridge {
    requests: Option<mpsc::Sender<WorkerRequest>>,
    pending: PendingMap,
    next_id: AtomicU64,
    thread: Option<JoinHandle<()>>,
}

impl WorkerBridge {
    /// Starts the worker thread with its own single-threaded runtime.
    ///
    /// # Errors
    ///
    /// [`RenderError::Io`] if the runtime or the thread cannot be created.
    pub fn spawn() -> RenderResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (tx, rx) = mpsc::channel();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let worker_pending = Arc::clone(&pending);

        let thread = std::thread::Builder::new()
            .name("qr-render-worker".to_string())
            .spawn(move || run_worker(runtime, rx, worker_pending))?;
        debug!("render worker started");

        Ok(Self {
            requests: Some(tx),
            pending,
            next_id: AtomicU64::new(1),
            thread: Some(thread),
        })
    }

    /// Queues a pass on the worker. `surface` is moved to the worker and
    /// returned in the reply.
    pub fn submit(
        &self,
        matrix: &dyn QrMatrix,
        style: &StyleConfiguration,
        frame_asset: Option<Bitmap>,
        surface: Pixmap,
    ) -> RenderResult<PendingRender> {
        let requests = self.requests.as_ref().ok_or(RenderError::WorkerUnavailable)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.lock_pending().insert(id, tx);

        let request = WorkerRequest::Render {
            render_pass_id: id,
            style: Box::new(style.clone()),
            matrix: ModuleGrid::from_matrix(matrix),
            frame_asset,
            surface,
        };
        if requests.send(request).is_err() {
            self.lock_pending().remove(&id);
            return Err(RenderError::WorkerUnavailable);
        }
        debug!(render_pass_id = id, "render pass submitted");
        Ok(PendingRender { id, rx })
    }

    /// Number of submitted passes without a reply yet.
    pub fn pending_count(&self) -> usize {
        self.lock_pending().len()
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<RenderPassId, oneshot::Sender<WorkerResponse>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for WorkerBridge {
    fn drop(&mut self) {
        if let Some(requests) = self.requests.take() {
            let _ = requests.send(WorkerRequest::Shutdown);
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("render worker panicked");
            }
        }
    }
}

fn run_worker(runtime: Runtime, requests: mpsc::Receiver<WorkerRequest>, pending: PendingMap) {
    let renderer = QrRenderer::new(FetchLoader::new());

    while let Ok(request) = requests.recv() {
        let (render_pass_id, style, matrix, frame_asset, surface) = match request {
            WorkerRequest::Render {
                render_pass_id,
                style,
                matrix,
                frame_asset,
                surface,
            } => (render_pass_id, style, matrix, frame_asset, surface),
            WorkerRequest::Shutdown => break,
        };

        let mut canvas = Canvas::from_pixmap(surface);
        let outcome = runtime.block_on(renderer.render(&matrix, &style, &mut canvas, frame_asset));
        let response = WorkerResponse::Done {
            render_pass_id,
            surface: canvas.into_pixmap(),
            outcome,
        };

        let waiter = pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&render_pass_id);
        match waiter {
            Some(tx) => {
                if tx.send(response).is_err() {
                    debug!(render_pass_id, "render result dropped by caller");
                }
            }
            None => warn!(render_pass_id, "no pending render for finished pass"),
        }
    }
    debug!("render worker stopped");
}
