#![allow(dead_code)]

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use joypack_core::context::AppContext;
use joypack_core::orchestration::Installer;
use joypack_core::process::{CommandOutput, CommandRunner, CommandSpec};
use joypack_core::progress::{InstallationStep, ProgressBus, Subscription};
use joypack_core::types::{LaunchStrategy, Runtime, ServerDescriptor};

/// Records every command and answers from a script instead of spawning.
///
/// `which` succeeds unless the tool was marked missing, `git clone` creates
/// the destination directory, and anything registered with `fail` exits 1.
#[derive(Debug, Default)]
pub struct FakeRunner {
    calls: Mutex<Vec<CommandSpec>>,
    missing: Mutex<Vec<String>>,
    failures: Mutex<Vec<(String, Option<String>, String)>>,
}

impl FakeRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn missing_tool(&self, tool: &str) {
        self.missing.lock().unwrap().push(tool.to_string());
    }

    pub fn fail(&self, program: &str, subcommand: Option<&str>, stderr: &str) {
        self.failures.lock().unwrap().push((
            program.to_string(),
            subcommand.map(str::to_string),
            stderr.to_string(),
        ));
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(|call| call.to_string()).collect()
    }

    /// Command lines excluding `which` lookups.
    pub fn executed(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter(|call| call.program != "which")
            .map(|call| call.to_string())
            .collect()
    }

    pub fn calls_to(&self, program: &str) -> Vec<CommandSpec> {
        self.calls()
            .into_iter()
            .filter(|call| call.program == program)
            .collect()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, command: &CommandSpec) -> io::Result<CommandOutput> {
        self.calls.lock().unwrap().push(command.clone());

        if command.program == "which" {
            let tool = command.args.first().cloned().unwrap_or_default();
            let missing = self.missing.lock().unwrap().contains(&tool);
            return Ok(if missing {
                CommandOutput::failure(1, "")
            } else {
                CommandOutput::success()
            });
        }

        let failure = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(program, subcommand, _)| {
                *program == command.program
                    && subcommand
                        .as_deref()
                        .is_none_or(|sub| Some(sub) == command.subcommand())
            })
            .map(|(_, _, stderr)| stderr.clone());
        if let Some(stderr) = failure {
            return Ok(CommandOutput::failure(1, stderr));
        }

        if command.program == "git" && command.subcommand() == Some("clone") {
            if let Some(destination) = command.args.last() {
                std::fs::create_dir_all(destination)?;
            }
        }
        Ok(CommandOutput::success())
    }
}

pub struct Harness {
    pub temp: TempDir,
    pub home: PathBuf,
    pub ctx: AppContext,
    pub bus: ProgressBus,
    pub runner: Arc<FakeRunner>,
}

pub fn harness() -> Harness {
    let temp = TempDir::new().unwrap();
    let home = temp.path().join("home");
    std::fs::create_dir_all(&home).unwrap();
    let ctx = AppContext::for_home(home.clone()).unwrap();
    Harness {
        temp,
        home,
        ctx,
        bus: ProgressBus::new(),
        runner: FakeRunner::new(),
    }
}

impl Harness {
    pub fn installer(&self) -> Installer {
        Installer::new(self.ctx.clone(), self.bus.clone(), self.runner.clone())
    }

    pub fn registry_path(&self) -> PathBuf {
        self.home.join(".codeium/windsurf/mcp_config.json")
    }

    pub fn env_dir(&self) -> PathBuf {
        self.home.join(".mcp")
    }

    pub fn repos_dir(&self) -> PathBuf {
        self.home.join(".mcp/repos")
    }

    pub fn registry_json(&self) -> serde_json::Value {
        let content = std::fs::read_to_string(self.registry_path()).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    pub fn record_steps(&self) -> (Arc<Mutex<Vec<InstallationStep>>>, Subscription) {
        record_steps(&self.bus)
    }
}

pub fn record_steps(bus: &ProgressBus) -> (Arc<Mutex<Vec<InstallationStep>>>, Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = bus.subscribe(move |step| sink.lock().unwrap().push(step.clone()));
    (seen, subscription)
}

pub fn echo_server() -> ServerDescriptor {
    ServerDescriptor::new(
        "echo-server",
        LaunchStrategy::PackageRegistry {
            package_name: "echo-mcp".into(),
            invocation_args: vec!["echo-mcp".into(), "--stdio".into()],
        },
    )
}

pub fn local_server(name: &str, runtime: Runtime) -> ServerDescriptor {
    ServerDescriptor::new(
        name,
        LaunchStrategy::LocalRepo {
            repository_url: format!("https://github.com/acme/{name}-mcp.git"),
            runtime,
            entry_point: "dist/index.js".into(),
        },
    )
}

pub fn docker_server() -> ServerDescriptor {
    ServerDescriptor::new(
        "github",
        LaunchStrategy::ContainerImage {
            image_reference: "ghcr.io/github/github-mcp-server".into(),
        },
    )
}
