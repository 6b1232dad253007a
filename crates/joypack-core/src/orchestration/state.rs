//! Lifecycle of a single install attempt.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallState {
    Idle,
    PrerequisitesChecking,
    Provisioning,
    Building,
    EnvironmentWrite,
    WrapperCreation,
    RegistryUpdate,
    Done,
    Failed,
}

impl InstallState {
    pub fn is_terminal(self) -> bool {
        matches!(self, InstallState::Done | InstallState::Failed)
    }

    /// Provisioning may skip `Building` for strategies without a checkout.
    pub fn can_transition_to(self, next: InstallState) -> bool {
        use InstallState::*;
        match (self, next) {
            (Idle, PrerequisitesChecking)
            | (PrerequisitesChecking, Provisioning)
            | (Provisioning, Building)
            | (Provisioning, EnvironmentWrite)
            | (Building, EnvironmentWrite)
            | (EnvironmentWrite, WrapperCreation)
            | (EnvironmentWrite, RegistryUpdate)
            | (WrapperCreation, RegistryUpdate)
            | (RegistryUpdate, Done) => true,
            (Idle, Failed) => false,
            (current, Failed) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InstallState::Idle => "idle",
            InstallState::PrerequisitesChecking => "prerequisites-checking",
            InstallState::Provisioning => "provisioning",
            InstallState::Building => "building",
            InstallState::EnvironmentWrite => "environment-write",
            InstallState::WrapperCreation => "wrapper-creation",
            InstallState::RegistryUpdate => "registry-update",
            InstallState::Done => "done",
            InstallState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// State history of one attempt.
#[derive(Debug, Clone)]
pub struct InstallRun {
    server: String,
    history: Vec<InstallState>,
}

impl InstallRun {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            history: vec![InstallState::Idle],
        }
    }

    pub fn state(&self) -> InstallState {
        self.history
            .last()
            .copied()
            .unwrap_or(InstallState::Idle)
    }

    pub fn history(&self) -> &[InstallState] {
        &self.history
    }

    pub fn into_history(self) -> Vec<InstallState> {
        self.history
    }

    /// Move to `next`; illegal transitions are ignored and logged.
    pub fn advance(&mut self, next: InstallState) -> bool {
        let current = self.state();
        if !current.can_transition_to(next) {
            tracing::warn!(
                server = %self.server,
                from = %current,
                to = %next,
                "Ignoring illegal install transition"
            );
            return false;
        }
        tracing::debug!(server = %self.server, from = %current, to = %next, "Install state");
        self.history.push(next);
        true
    }

    pub fn fail(&mut self) -> bool {
        self.advance(InstallState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_install_skips_building() {
        let mut run = InstallRun::new("echo");
        for state in [
            InstallState::PrerequisitesChecking,
            InstallState::Provisioning,
            InstallState::EnvironmentWrite,
            InstallState::WrapperCreation,
            InstallState::RegistryUpdate,
            InstallState::Done,
        ] {
            assert!(run.advance(state), "{state}");
        }
        assert_eq!(run.state(), InstallState::Done);
        assert!(!run.fail());
    }

    #[test]
    fn direct_command_skips_wrapper_creation() {
        let mut run = InstallRun::new("notes");
        for state in [
            InstallState::PrerequisitesChecking,
            InstallState::Provisioning,
            InstallState::EnvironmentWrite,
            InstallState::RegistryUpdate,
            InstallState::Done,
        ] {
            assert!(run.advance(state), "{state}");
        }
        assert!(!run.history().contains(&InstallState::WrapperCreation));
    }

    #[test]
    fn registry_update_cannot_be_skipped() {
        let mut run = InstallRun::new("echo");
        run.advance(InstallState::PrerequisitesChecking);
        assert!(!run.advance(InstallState::RegistryUpdate));
        assert!(!run.advance(InstallState::Done));
        assert!(run.fail());
        assert_eq!(run.history().last(), Some(&InstallState::Failed));
    }

    #[test]
    fn idle_cannot_fail() {
        assert!(!InstallState::Idle.can_transition_to(InstallState::Failed));
    }
}
