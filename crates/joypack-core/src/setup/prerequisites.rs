//! Tool prerequisite checks and installation through the package installer.

use std::sync::Arc;

use crate::error::SetupError;
use crate::process::{CommandRunner, CommandSpec, run_to_completion};

use super::StepReporter;

/// Installer sub-commands for each tool joypack knows how to install.
pub fn installer_steps(tool: &str) -> Option<&'static [&'static [&'static str]]> {
    let steps: &'static [&'static [&'static str]] = match tool {
        "node" | "npm" => &[&["install", "node"]],
        "uv" => &[&["install", "uv"]],
        "pnpm" => &[&["install", "pnpm"]],
        "vault" => &[&["tap", "hashicorp/tap"], &["install", "hashicorp/tap/vault"]],
        _ => return None,
    };
    Some(steps)
}

pub fn prerequisite_step(tool: &str) -> String {
    format!("Prerequisite: {tool}")
}

#[derive(Debug, Clone)]
pub struct PrerequisiteChecker {
    runner: Arc<dyn CommandRunner>,
    installer: String,
}

impl PrerequisiteChecker {
    pub fn new(runner: Arc<dyn CommandRunner>, installer: impl Into<String>) -> Self {
        Self {
            runner,
            installer: installer.into(),
        }
    }

    /// Whether `tool` resolves on the system path.
    pub async fn is_available(&self, tool: &str) -> bool {
        let lookup = CommandSpec::new("which").arg(tool);
        matches!(self.runner.run(&lookup).await, Ok(output) if output.is_success())
    }

    /// Check each tool in order, installing missing ones. Stops at the first
    /// tool that is neither present nor installable.
    pub async fn ensure_prerequisites(
        &self,
        reporter: StepReporter<'_>,
        tools: &[String],
    ) -> Result<(), SetupError> {
        for tool in tools {
            let step = prerequisite_step(tool);
            reporter
                .track(&step, format!("Checking for {tool}"), self.ensure(reporter, &step, tool))
                .await?;
        }
        Ok(())
    }

    async fn ensure(
        &self,
        reporter: StepReporter<'_>,
        step: &str,
        tool: &str,
    ) -> Result<(), SetupError> {
        if self.is_available(tool).await {
            tracing::debug!(tool, "Prerequisite already installed");
            return Ok(());
        }

        let steps = installer_steps(tool).ok_or_else(|| SetupError::UnmetPrerequisite {
            tool: tool.to_string(),
            reason: "unknown".to_string(),
        })?;

        reporter.start(step, format!("Installing {tool} with {}", self.installer));
        for args in steps {
            let command = CommandSpec::new(&self.installer).args(args.iter().copied());
            run_to_completion(self.runner.as_ref(), &command)
                .await
                .map_err(|reason| SetupError::UnmetPrerequisite {
                    tool: tool.to_string(),
                    reason,
                })?;
        }
        tracing::info!(tool, installer = %self.installer, "Installed prerequisite");
        Ok(())
    }
}
