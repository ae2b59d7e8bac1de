//! Single-flight dispatcher for text actions.
//!
//! At most one text action runs at a time. [`Dispatcher::submit`] either
//! starts a unit of work on the tokio runtime or rejects the request
//! synchronously; it never queues and never pre-empts.
//!
//! ```text
//!            submit (accepted)
//!   Idle ─────────────────────────▶ Running
//!    ▲                                 │ worker sends Progress(50)
//!    │                                 │ remote call
//!    │                                 │ worker sends Progress(100)
//!    │        Finished polled          ▼
//!    └──────────────── Succeeded | Failed | Cancelled
//! ```
//!
//! The worker reports back through one channel per task. The interactive
//! side drains it with [`Dispatcher::try_event`] (non-blocking),
//! [`Dispatcher::next_event`] (async) or [`Dispatcher::blocking_next_event`].
//! Exactly one [`TaskEvent::Finished`] is delivered per accepted submit; the
//! dispatcher returns to idle when that event is handed out.
//!
//! ## Cancellation
//!
//! [`Dispatcher::cancel`] sets a shared flag. The worker checks it
//! immediately before the remote call and immediately after the call
//! returns. The call itself is never interrupted, and a cancellation seen
//! after the call wins over whatever the call produced, errors included.

use crate::error::{TaskError, ViewerError};
use crate::pipeline::llm::{Completion, TextService};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// Progress reported before the remote call.
pub const PROGRESS_AWAITING: u8 = 50;
/// Progress reported once the remote call has returned.
pub const PROGRESS_RECEIVED: u8 = 100;

/// One text action ready to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Fully rendered prompt.
    pub prompt: String,
    /// Title to show the result under.
    pub result_label: String,
    /// Human-readable action name, used in busy and progress messages.
    pub action_name: String,
}

/// Cooperative cancellation flag shared with the worker.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent; every clone observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStage {
    /// The request is about to be sent.
    AwaitingResponse,
    /// The remote call has returned.
    ResponseReceived,
}

/// Which checkpoint observed the cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelStage {
    /// The remote call was never issued.
    BeforeCall,
    /// The call completed but its result was discarded.
    AfterCall,
}

/// Terminal outcome of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskOutcome {
    Success(String),
    Failed(TaskError),
    Cancelled(CancelStage),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success(_))
    }
}

/// The finished task, with the labels it was submitted under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    pub action_name: String,
    pub result_label: String,
    pub outcome: TaskOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskEvent {
    Progress { stage: TaskStage, percent: u8 },
    Finished(TaskReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Running { action: String },
}

impl fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatcherState::Idle => f.write_str("idle"),
            DispatcherState::Running { action } => write!(f, "running {action}"),
        }
    }
}

struct ActiveTask {
    action_name: String,
    result_label: String,
    cancel: CancellationToken,
    events: UnboundedReceiver<TaskEvent>,
}

pub struct Dispatcher {
    handle: Handle,
    service: Option<Arc<dyn TextService>>,
    active: Option<ActiveTask>,
}

impl Dispatcher {
    /// Create an idle dispatcher that spawns work on `handle`.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            service: None,
            active: None,
        }
    }

    /// Install or clear the text service. Does not affect a running task.
    pub fn set_service(&mut self, service: Option<Arc<dyn TextService>>) {
        self.service = service;
    }

    pub fn has_service(&self) -> bool {
        self.service.is_some()
    }

    pub fn state(&self) -> DispatcherState {
        match &self.active {
            Some(task) => DispatcherState::Running {
                action: task.action_name.clone(),
            },
            None => DispatcherState::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Start `request` if the dispatcher is idle.
    ///
    /// # Errors
    /// - [`ViewerError::ServiceNotConfigured`] when no service is installed
    /// - [`ViewerError::Busy`] naming the running action; that task is untouched
    pub fn submit(&mut self, request: TaskRequest) -> Result<(), ViewerError> {
        let service = self
            .service
            .clone()
            .ok_or_else(|| ViewerError::ServiceNotConfigured {
                provider: "text service".to_string(),
                hint: "Check the API key and model in settings.".to_string(),
            })?;

        if let Some(task) = &self.active {
            debug!(
                "Rejected {}: {} still running",
                request.action_name, task.action_name
            );
            return Err(ViewerError::Busy {
                action: task.action_name.clone(),
            });
        }

        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let TaskRequest {
            prompt,
            result_label,
            action_name,
        } = request;

        info!("Starting {}", action_name);
        // The worker is detached; it stops at its next cancellation check.
        self.handle.spawn(run_task(
            service,
            prompt,
            action_name.clone(),
            result_label.clone(),
            cancel.clone(),
            tx,
        ));

        self.active = Some(ActiveTask {
            action_name,
            result_label,
            cancel,
            events: rx,
        });
        Ok(())
    }

    /// Request cancellation of the running task. Returns `false` when idle.
    pub fn cancel(&self) -> bool {
        match &self.active {
            Some(task) => {
                info!("Cancelling {}", task.action_name);
                task.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// A clone of the running task's token, for signal handlers.
    pub fn cancellation_token(&self) -> Option<CancellationToken> {
        self.active.as_ref().map(|t| t.cancel.clone())
    }

    /// Next pending event without waiting.
    pub fn try_event(&mut self) -> Option<TaskEvent> {
        let task = self.active.as_mut()?;
        match task.events.try_recv() {
            Ok(event) => Some(self.observe(event)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.worker_lost()),
        }
    }

    /// Wait for the next event. `None` when idle.
    pub async fn next_event(&mut self) -> Option<TaskEvent> {
        let task = self.active.as_mut()?;
        match task.events.recv().await {
            Some(event) => Some(self.observe(event)),
            None => Some(self.worker_lost()),
        }
    }

    /// Block the current thread until the next event. `None` when idle.
    ///
    /// Must not be called from within an async context.
    pub fn blocking_next_event(&mut self) -> Option<TaskEvent> {
        let task = self.active.as_mut()?;
        match task.events.blocking_recv() {
            Some(event) => Some(self.observe(event)),
            None => Some(self.worker_lost()),
        }
    }

    fn observe(&mut self, event: TaskEvent) -> TaskEvent {
        if let TaskEvent::Finished(report) = &event {
            debug!("{} finished: {:?}", report.action_name, report.outcome);
            self.active = None;
        }
        event
    }

    fn worker_lost(&mut self) -> TaskEvent {
        let (action_name, result_label) = match self.active.take() {
            Some(task) => (task.action_name, task.result_label),
            None => (String::new(), String::new()),
        };
        warn!("{} ended without reporting a result", action_name);
        TaskEvent::Finished(TaskReport {
            action_name,
            result_label,
            outcome: TaskOutcome::Failed(TaskError::WorkerLost),
        })
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if let Some(task) = &self.active {
            debug!("Dispatcher dropped; cancelling {}", task.action_name);
            task.cancel.cancel();
        }
    }
}

async fn run_task(
    service: Arc<dyn TextService>,
    prompt: String,
    action_name: String,
    result_label: String,
    cancel: CancellationToken,
    tx: UnboundedSender<TaskEvent>,
) {
    let outcome = execute(service.as_ref(), &prompt, &cancel, &tx).await;
    match &outcome {
        TaskOutcome::Success(text) => info!("{} succeeded ({} chars)", action_name, text.len()),
        TaskOutcome::Failed(e) => warn!("{} failed: {}", action_name, e),
        TaskOutcome::Cancelled(stage) => info!("{} cancelled ({:?})", action_name, stage),
    }
    // The receiver is gone only if the dispatcher was dropped.
    let _ = tx.send(TaskEvent::Finished(TaskReport {
        action_name,
        result_label,
        outcome,
    }));
}

async fn execute(
    service: &dyn TextService,
    prompt: &str,
    cancel: &CancellationToken,
    tx: &UnboundedSender<TaskEvent>,
) -> TaskOutcome {
    if cancel.is_cancelled() {
        return TaskOutcome::Cancelled(CancelStage::BeforeCall);
    }
    let _ = tx.send(TaskEvent::Progress {
        stage: TaskStage::AwaitingResponse,
        percent: PROGRESS_AWAITING,
    });

    let result = service.complete(prompt).await;

    if cancel.is_cancelled() {
        return TaskOutcome::Cancelled(CancelStage::AfterCall);
    }
    let _ = tx.send(TaskEvent::Progress {
        stage: TaskStage::ResponseReceived,
        percent: PROGRESS_RECEIVED,
    });

    match result {
        Ok(Completion::Text(text)) if !text.is_empty() => TaskOutcome::Success(text),
        Ok(Completion::Text(_)) => TaskOutcome::Failed(TaskError::InvalidResponse {
            detail: "the response contained no text".to_string(),
        }),
        Ok(Completion::Rejected(detail)) => TaskOutcome::Failed(TaskError::InvalidResponse {
            detail: detail.unwrap_or_else(|| "unknown response format".to_string()),
        }),
        Err(e) => TaskOutcome::Failed(TaskError::Api { detail: e.0 }),
    }
}
