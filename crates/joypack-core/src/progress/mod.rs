//! In-process publish/subscribe channel for installation progress.
//!
//! The bus is an explicit handle constructed once by the front end and passed
//! to the [`Installer`](crate::orchestration::Installer). Delivery is
//! synchronous on the publishing task, so every subscriber observes the steps
//! of a given server in the order they were published. A panicking handler is
//! contained at the bus boundary and never reaches the publisher; this relies
//! on the binary being built with `panic = "unwind"`.

mod tracker;

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::{Deserialize, Serialize};

pub use tracker::{ProgressTracker, ServerProgress};

/// Status of a single installation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Complete,
    Error,
}

impl StepStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in-progress",
            StepStatus::Complete => "complete",
            StepStatus::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Complete | StepStatus::Error)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress event for one step of one server's setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationStep {
    pub server: String,
    pub step: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl InstallationStep {
    pub fn new(server: impl Into<String>, step: impl Into<String>, status: StepStatus) -> Self {
        Self {
            server: server.into(),
            step: step.into(),
            status,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

type Handler = Arc<dyn Fn(&InstallationStep) + Send + Sync>;

struct Subscriber {
    id: u64,
    server: Option<String>,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl BusInner {
    fn remove(&self, id: u64) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|subscriber| subscriber.id != id);
    }
}

/// Handle to the progress channel. Clones share the same subscriber list.
#[derive(Clone, Default)]
pub struct ProgressBus {
    inner: Arc<BusInner>,
}

impl fmt::Debug for ProgressBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl ProgressBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every step for every server.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&InstallationStep) + Send + Sync + 'static,
    {
        self.add_subscriber(None, Arc::new(handler))
    }

    /// Receive only the steps published for `server`.
    pub fn subscribe_server<F>(&self, server: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&InstallationStep) + Send + Sync + 'static,
    {
        self.add_subscriber(Some(server.into()), Arc::new(handler))
    }

    fn add_subscriber(&self, server: Option<String>, handler: Handler) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber {
                id,
                server,
                handler,
            });
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deliver `step` to every matching subscriber before returning.
    pub fn publish(&self, step: InstallationStep) {
        // Handlers run outside the lock so they may subscribe or unsubscribe.
        let handlers: Vec<Handler> = {
            let subscribers = self
                .inner
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers
                .iter()
                .filter(|s| s.server.as_deref().is_none_or(|name| name == step.server))
                .map(|s| Arc::clone(&s.handler))
                .collect()
        };

        for handler in handlers {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(&step))) {
                tracing::error!(
                    server = %step.server,
                    step = %step.step,
                    "Progress subscriber panicked: {}",
                    panic_message(panic.as_ref())
                );
            }
        }
    }

    pub fn pending(&self, server: &str, step: &str, message: impl Into<String>) {
        self.emit(server, step, StepStatus::Pending, message);
    }

    pub fn started(&self, server: &str, step: &str, message: impl Into<String>) {
        self.emit(server, step, StepStatus::InProgress, message);
    }

    pub fn completed(&self, server: &str, step: &str, message: impl Into<String>) {
        self.emit(server, step, StepStatus::Complete, message);
    }

    pub fn failed(&self, server: &str, step: &str, message: impl Into<String>) {
        self.emit(server, step, StepStatus::Error, message);
    }

    fn emit(&self, server: &str, step: &str, status: StepStatus, message: impl Into<String>) {
        self.publish(InstallationStep::new(server, step, status).with_message(message));
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// Registration returned by [`ProgressBus::subscribe`].
///
/// Dropping the subscription detaches the handler.
#[must_use = "dropping a Subscription immediately unsubscribes its handler"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            inner.remove(self.id);
        }
    }
}
