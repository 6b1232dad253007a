//! Progress reporting for a single server's pipeline.

use std::future::Future;

use crate::error::SetupError;
use crate::progress::ProgressBus;

/// Publishes step events for one server.
#[derive(Debug, Clone, Copy)]
pub struct StepReporter<'a> {
    bus: &'a ProgressBus,
    server: &'a str,
}

impl<'a> StepReporter<'a> {
    pub fn new(bus: &'a ProgressBus, server: &'a str) -> Self {
        Self { bus, server }
    }

    pub fn server(&self) -> &'a str {
        self.server
    }

    pub fn pending(&self, step: &str) {
        self.bus.pending(self.server, step, "Waiting");
    }

    pub fn start(&self, step: &str, message: impl Into<String>) {
        tracing::debug!(server = self.server, step, "Step started");
        self.bus.started(self.server, step, message);
    }

    pub fn complete(&self, step: &str, message: impl Into<String>) {
        tracing::debug!(server = self.server, step, "Step complete");
        self.bus.completed(self.server, step, message);
    }

    pub fn fail(&self, step: &str, err: &SetupError) {
        tracing::debug!(server = self.server, step, kind = err.kind(), "Step failed");
        self.bus.failed(self.server, step, format!("Error: {err}"));
    }

    /// Run `work` as `step`: in-progress first, then complete or error.
    pub async fn track<T, F>(
        &self,
        step: &str,
        message: impl Into<String>,
        work: F,
    ) -> Result<T, SetupError>
    where
        F: Future<Output = Result<T, SetupError>>,
    {
        self.start(step, message);
        match work.await {
            Ok(value) => {
                self.complete(step, format!("{step} complete"));
                Ok(value)
            }
            Err(err) => {
                self.fail(step, &err);
                Err(err)
            }
        }
    }
}
