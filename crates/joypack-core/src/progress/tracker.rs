//! Last-write-wins projection of the progress stream.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::{InstallationStep, ProgressBus, StepStatus, Subscription};

/// Steps observed for one server, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerProgress {
    steps: Vec<InstallationStep>,
    active: Option<String>,
}

impl ServerProgress {
    /// Fold one event into the projection; a step name already present is
    /// replaced in place.
    pub fn apply(&mut self, step: &InstallationStep) {
        if step.status == StepStatus::InProgress {
            self.active = Some(step.step.clone());
        } else if self.active.as_deref() == Some(step.step.as_str()) && step.status.is_terminal() {
            self.active = None;
        }

        match self.steps.iter_mut().find(|s| s.step == step.step) {
            Some(existing) => *existing = step.clone(),
            None => self.steps.push(step.clone()),
        }
    }

    pub fn steps(&self) -> &[InstallationStep] {
        &self.steps
    }

    pub fn step(&self, name: &str) -> Option<&InstallationStep> {
        self.steps.iter().find(|s| s.step == name)
    }

    /// Step currently reported as in progress.
    pub fn active_step(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn has_error(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Error)
    }
}

/// Bus subscriber that keeps a [`ServerProgress`] per server.
#[derive(Debug)]
pub struct ProgressTracker {
    state: Arc<Mutex<HashMap<String, ServerProgress>>>,
    _subscription: Subscription,
}

impl ProgressTracker {
    /// Track every server published on `bus`.
    pub fn attach(bus: &ProgressBus) -> Self {
        let state = Arc::new(Mutex::new(HashMap::new()));
        let sink = Arc::clone(&state);
        let subscription = bus.subscribe(move |step| record(&sink, step));
        Self {
            state,
            _subscription: subscription,
        }
    }

    /// Track a single server.
    pub fn attach_server(bus: &ProgressBus, server: &str) -> Self {
        let state = Arc::new(Mutex::new(HashMap::new()));
        let sink = Arc::clone(&state);
        let subscription = bus.subscribe_server(server, move |step| record(&sink, step));
        Self {
            state,
            _subscription: subscription,
        }
    }

    pub fn snapshot(&self, server: &str) -> Option<ServerProgress> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(server)
            .cloned()
    }

    /// Forget a server's steps, e.g. before a retry.
    pub fn reset(&self, server: &str) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(server);
    }
}

fn record(state: &Mutex<HashMap<String, ServerProgress>>, step: &InstallationStep) {
    state
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(step.server.clone())
        .or_default()
        .apply(step);
}
