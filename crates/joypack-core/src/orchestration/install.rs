//! The install pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::SetupError;
use crate::process::{CommandSpec, run_to_completion};
use crate::setup::{BuildContext, BuildRoutine, StepReporter, prerequisite_step};
use crate::types::{EnvValues, LaunchConfig, LaunchStrategy, ServerDescriptor};

use super::service::Installer;
use super::state::{InstallRun, InstallState};

pub const SETUP_STEP: &str = "Setup Started";
pub const CLONE_STEP: &str = "Repository Clone";
pub const PACKAGE_STEP: &str = "Package Installation";
pub const CONTAINER_STEP: &str = "Container Image";
pub const ENV_FILE_STEP: &str = "Environment File";
pub const WRAPPER_STEP: &str = "Wrapper Creation";
pub const REGISTRY_STEP: &str = "MCP Configuration";

/// Outcome of a successful install.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub server: String,
    pub launch_config: LaunchConfig,
    /// `None` for direct commands, which are registered without a wrapper.
    pub wrapper_path: Option<PathBuf>,
    pub env_file: PathBuf,
    pub checkout: Option<PathBuf>,
    pub states: Vec<InstallState>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Steps and tools decided before anything runs.
#[derive(Debug)]
pub struct InstallPlan {
    pub tools: Vec<String>,
    pub build: Option<Arc<dyn BuildRoutine>>,
    pub steps: Vec<String>,
}

struct PipelineOutput {
    launch_config: LaunchConfig,
    wrapper_path: Option<PathBuf>,
    env_file: PathBuf,
    checkout: Option<PathBuf>,
}

impl Installer {
    /// Resolve the step list for `descriptor`, including the build routine.
    pub fn plan(&self, descriptor: &ServerDescriptor) -> InstallPlan {
        let tools = descriptor.required_tools();
        let mut steps: Vec<String> = tools.iter().map(|tool| prerequisite_step(tool)).collect();

        let build = match &descriptor.launch_strategy {
            LaunchStrategy::LocalRepo { runtime, .. } => {
                let routine = self.build_overrides.resolve(&descriptor.name, *runtime);
                steps.push(CLONE_STEP.to_string());
                steps.extend(routine.phase_labels());
                Some(routine)
            }
            LaunchStrategy::PackageRegistry { .. } => {
                steps.push(PACKAGE_STEP.to_string());
                None
            }
            LaunchStrategy::ContainerImage { .. } => {
                steps.push(CONTAINER_STEP.to_string());
                None
            }
            LaunchStrategy::DirectCommand { .. } => None,
        };
        steps.push(ENV_FILE_STEP.to_string());
        if descriptor.launch_strategy.uses_wrapper() {
            steps.push(WRAPPER_STEP.to_string());
        }
        steps.push(REGISTRY_STEP.to_string());

        InstallPlan {
            tools,
            build,
            steps,
        }
    }

    /// Run the full setup for `descriptor`. The registry is written last, so
    /// a failed attempt never leaves the server registered.
    pub async fn install(
        &self,
        descriptor: &ServerDescriptor,
        values: &EnvValues,
    ) -> Result<InstallReport, SetupError> {
        let _guard = self.locks.acquire(&descriptor.name).await;
        let started_at = Utc::now();
        let reporter = StepReporter::new(&self.bus, &descriptor.name);
        let mut run = InstallRun::new(&descriptor.name);

        tracing::info!(
            server = %descriptor.name,
            strategy = descriptor.launch_strategy.label(),
            "Installing server"
        );
        reporter.start(SETUP_STEP, format!("Setting up {}", descriptor.title()));
        let plan = self.plan(descriptor);
        for step in &plan.steps {
            reporter.pending(step);
        }

        match self.run_pipeline(descriptor, values, &plan, reporter, &mut run).await {
            Ok(output) => {
                run.advance(InstallState::Done);
                reporter.complete(SETUP_STEP, format!("{} installed", descriptor.title()));
                tracing::info!(
                    server = %descriptor.name,
                    wrapper = ?output.wrapper_path,
                    "Installed server"
                );
                Ok(InstallReport {
                    server: descriptor.name.clone(),
                    launch_config: output.launch_config,
                    wrapper_path: output.wrapper_path,
                    env_file: output.env_file,
                    checkout: output.checkout,
                    states: run.into_history(),
                    started_at,
                    finished_at: Utc::now(),
                })
            }
            Err(err) => {
                run.fail();
                reporter.fail(SETUP_STEP, &err);
                tracing::warn!(
                    server = %descriptor.name,
                    kind = err.kind(),
                    "Install failed: {}",
                    err
                );
                Err(err)
            }
        }
    }

    async fn run_pipeline(
        &self,
        descriptor: &ServerDescriptor,
        values: &EnvValues,
        plan: &InstallPlan,
        reporter: StepReporter<'_>,
        run: &mut InstallRun,
    ) -> Result<PipelineOutput, SetupError> {
        let server = descriptor.name.as_str();

        run.advance(InstallState::PrerequisitesChecking);
        self.prerequisite_checker()
            .ensure_prerequisites(reporter, &plan.tools)
            .await?;

        run.advance(InstallState::Provisioning);
        let checkout = match &descriptor.launch_strategy {
            LaunchStrategy::LocalRepo { repository_url, .. } => {
                let checkout = reporter
                    .track(
                        CLONE_STEP,
                        format!("Cloning {repository_url}"),
                        self.provisioner.clone_repository(repository_url),
                    )
                    .await?;

                run.advance(InstallState::Building);
                if let Some(routine) = &plan.build {
                    routine
                        .build(BuildContext {
                            checkout: &checkout,
                            home_dir: self.ctx.home_dir(),
                            runner: self.runner.as_ref(),
                            reporter,
                        })
                        .await?;
                }
                Some(checkout)
            }
            LaunchStrategy::PackageRegistry { package_name, .. } => {
                let command = CommandSpec::new("npx")
                    .args(["-y", "@smithery/cli", "install"])
                    .arg(package_name)
                    .args(["--client", self.ctx.package_client()]);
                reporter
                    .track(PACKAGE_STEP, format!("Installing {package_name}"), async {
                        run_to_completion(self.runner.as_ref(), &command)
                            .await
                            .map(|_| ())
                            .map_err(|reason| SetupError::Build {
                                phase: PACKAGE_STEP.to_string(),
                                reason,
                            })
                    })
                    .await?;
                None
            }
            LaunchStrategy::ContainerImage { image_reference } => {
                reporter.start(CONTAINER_STEP, format!("Using {image_reference}"));
                reporter.complete(CONTAINER_STEP, "Image is pulled on first launch");
                None
            }
            LaunchStrategy::DirectCommand { .. } => None,
        };

        run.advance(InstallState::EnvironmentWrite);
        let env_values = descriptor.environment_values(values);
        let env_file = reporter
            .track(ENV_FILE_STEP, "Writing environment file", async {
                self.ctx.env_file_store().write(server, &env_values)
            })
            .await?;

        let (wrapper_path, config) = match &descriptor.launch_strategy {
            LaunchStrategy::DirectCommand { command, args } => {
                let config = LaunchConfig {
                    args: (!args.is_empty()).then(|| args.clone()),
                    ..LaunchConfig::for_command(command)
                };
                (None, config.with_disabled_tools(descriptor.current_disabled_tools()))
            }
            strategy => {
                run.advance(InstallState::WrapperCreation);
                let wrapper = reporter
                    .track(WRAPPER_STEP, "Creating wrapper script", async {
                        self.ctx.wrapper_generator().generate(
                            server,
                            strategy,
                            checkout.as_deref(),
                            &env_file,
                            descriptor.current_disabled_tools(),
                        )
                    })
                    .await?;
                (Some(wrapper.path), wrapper.launch_config)
            }
        };

        run.advance(InstallState::RegistryUpdate);
        let launch_config = reporter
            .track(REGISTRY_STEP, "Updating MCP configuration", async {
                self.ctx
                    .registry_store()
                    .register(server, config, self.ctx.home_dir())
            })
            .await?;

        Ok(PipelineOutput {
            launch_config,
            wrapper_path,
            env_file,
            checkout,
        })
    }
}
