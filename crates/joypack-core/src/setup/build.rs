//! Dependency installation and build of a cloned checkout.
//!
//! The generic routine is chosen by runtime. A server may register its own
//! routine in [`BuildOverrides`]; the table is consulted once before the
//! build starts.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{BuildOverrideEntry, expand_home};
use crate::error::SetupError;
use crate::process::{CommandRunner, CommandSpec, run_to_completion};
use crate::types::Runtime;

use super::StepReporter;

/// Everything a routine needs to build one checkout.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    pub checkout: &'a Path,
    pub home_dir: &'a Path,
    pub runner: &'a dyn CommandRunner,
    pub reporter: StepReporter<'a>,
}

impl<'a> BuildContext<'a> {
    pub fn server(&self) -> &'a str {
        self.reporter.server()
    }
}

/// A labelled command run as one progress step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPhase {
    pub label: String,
    pub command: CommandSpec,
}

impl BuildPhase {
    pub fn new(label: impl Into<String>, command: CommandSpec) -> Self {
        Self {
            label: label.into(),
            command,
        }
    }
}

#[async_trait]
pub trait BuildRoutine: Send + Sync + fmt::Debug {
    /// Step labels, in the order [`BuildRoutine::build`] reports them.
    fn phase_labels(&self) -> Vec<String>;

    async fn build(&self, ctx: BuildContext<'_>) -> Result<(), SetupError>;
}

/// Run phases in order, stopping at the first failure.
pub async fn run_phases(ctx: BuildContext<'_>, phases: &[BuildPhase]) -> Result<(), SetupError> {
    for phase in phases {
        ctx.reporter
            .track(&phase.label, format!("Running {}", phase.command), async {
                run_to_completion(ctx.runner, &phase.command)
                    .await
                    .map(|_| ())
                    .map_err(|reason| SetupError::Build {
                        phase: phase.label.clone(),
                        reason,
                    })
            })
            .await?;
    }
    Ok(())
}

/// Install-then-build for node toolchains, `uv sync` for uv.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericBuild {
    runtime: Runtime,
}

impl GenericBuild {
    pub fn new(runtime: Runtime) -> Self {
        Self { runtime }
    }

    pub fn phases(&self, checkout: &Path) -> Vec<BuildPhase> {
        let tool = self.runtime.build_tool();
        let in_checkout = |args: &[&str]| {
            CommandSpec::new(tool)
                .args(args.iter().copied())
                .current_dir(checkout)
        };
        match self.runtime {
            Runtime::Node | Runtime::Npm | Runtime::Pnpm => vec![
                BuildPhase::new("Dependencies Installation", in_checkout(&["install"])),
                BuildPhase::new("Build", in_checkout(&["run", "build"])),
            ],
            Runtime::Uv => vec![BuildPhase::new("Dependencies Sync", in_checkout(&["sync"]))],
        }
    }
}

#[async_trait]
impl BuildRoutine for GenericBuild {
    fn phase_labels(&self) -> Vec<String> {
        self.phases(Path::new("."))
            .into_iter()
            .map(|phase| phase.label)
            .collect()
    }

    async fn build(&self, ctx: BuildContext<'_>) -> Result<(), SetupError> {
        run_phases(ctx, &self.phases(ctx.checkout)).await
    }
}

/// Routine declared as `[[build_override]]` in joypack.toml.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedBuild {
    entry: BuildOverrideEntry,
}

impl ScriptedBuild {
    pub fn new(entry: BuildOverrideEntry) -> Self {
        Self { entry }
    }

    /// Resolve `{server}` and `~` in each step.
    pub fn phases(&self, server: &str, checkout: &Path, home: &Path) -> Vec<BuildPhase> {
        self.entry
            .steps
            .iter()
            .map(|step| {
                let args = step.args.iter().map(|arg| {
                    let arg = arg.replace("{server}", server);
                    expand_home(&arg, home).to_string_lossy().into_owned()
                });
                let dir: PathBuf = match &step.working_dir {
                    Some(dir) => expand_home(&dir.replace("{server}", server), home),
                    None => checkout.to_path_buf(),
                };
                BuildPhase::new(
                    step.label.clone(),
                    CommandSpec::new(&step.program).args(args).current_dir(dir),
                )
            })
            .collect()
    }
}

#[async_trait]
impl BuildRoutine for ScriptedBuild {
    fn phase_labels(&self) -> Vec<String> {
        self.entry.steps.iter().map(|step| step.label.clone()).collect()
    }

    async fn build(&self, ctx: BuildContext<'_>) -> Result<(), SetupError> {
        let phases = self.phases(ctx.server(), ctx.checkout, ctx.home_dir);
        run_phases(ctx, &phases).await
    }
}

/// Per-server replacements for the generic build.
#[derive(Debug, Clone, Default)]
pub struct BuildOverrides {
    routines: HashMap<String, Arc<dyn BuildRoutine>>,
}

impl BuildOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(entries: &[BuildOverrideEntry]) -> Self {
        let mut overrides = Self::new();
        for entry in entries {
            overrides.insert(entry.server.clone(), Arc::new(ScriptedBuild::new(entry.clone())));
        }
        overrides
    }

    pub fn insert(&mut self, server: impl Into<String>, routine: Arc<dyn BuildRoutine>) {
        self.routines.insert(server.into(), routine);
    }

    pub fn contains(&self, server: &str) -> bool {
        self.routines.contains_key(server)
    }

    /// The override for `server`, else the generic routine for `runtime`.
    pub fn resolve(&self, server: &str, runtime: Runtime) -> Arc<dyn BuildRoutine> {
        match self.routines.get(server) {
            Some(routine) => Arc::clone(routine),
            None => Arc::new(GenericBuild::new(runtime)),
        }
    }
}
