//! Launcher scripts that load a server's environment file and start it.

use std::path::{Path, PathBuf};

use crate::error::SetupError;
use crate::types::{LaunchConfig, LaunchStrategy};

use super::repository::repository_dir_name;

const DEFAULT_CONTAINER_REGISTRY: &str = "ghcr.io";

/// A written wrapper and the registry record pointing at it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedWrapper {
    pub path: PathBuf,
    pub launch_config: LaunchConfig,
}

#[derive(Debug, Clone)]
pub struct WrapperGenerator {
    env_dir: PathBuf,
    repos_dir: PathBuf,
}

impl WrapperGenerator {
    pub fn new(env_dir: PathBuf, repos_dir: PathBuf) -> Self {
        Self { env_dir, repos_dir }
    }

    /// Where the wrapper for `server` lives, `None` for strategies that run
    /// without one. Local servers keep it inside their checkout (`checkout`
    /// when given, else the default location).
    pub fn script_path(
        &self,
        server: &str,
        strategy: &LaunchStrategy,
        checkout: Option<&Path>,
    ) -> Option<PathBuf> {
        let path = match strategy {
            LaunchStrategy::LocalRepo { repository_url, .. } => self
                .checkout_dir(repository_url, checkout)
                .join(format!("{server}-wrapper.sh")),
            LaunchStrategy::PackageRegistry { .. } => {
                self.env_dir.join(format!("{server}-npx-wrapper.sh"))
            }
            LaunchStrategy::ContainerImage { .. } => {
                self.env_dir.join(format!("{server}-docker-wrapper.sh"))
            }
            LaunchStrategy::DirectCommand { .. } => return None,
        };
        Some(path)
    }

    /// Write the wrapper, mark it executable, and describe how to launch it.
    pub fn generate(
        &self,
        server: &str,
        strategy: &LaunchStrategy,
        checkout: Option<&Path>,
        env_file: &Path,
        disabled_tools: Vec<String>,
    ) -> Result<GeneratedWrapper, SetupError> {
        let path = self
            .script_path(server, strategy, checkout)
            .ok_or_else(|| SetupError::UnknownStrategy {
                server: server.to_string(),
                reason: format!("{} servers have no wrapper script", strategy.label()),
            })?;
        let launch_line = self.launch_line(strategy, checkout, env_file);
        let script = render_script(&launch_line, env_file, strategy);

        write_executable(&path, &script).map_err(|source| SetupError::WrapperCreation {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(server, path = %path.display(), "Wrote wrapper script");

        let launch_config = LaunchConfig::for_command(path.to_string_lossy())
            .with_disabled_tools(disabled_tools);
        Ok(GeneratedWrapper {
            path,
            launch_config,
        })
    }

    fn checkout_dir(&self, repository_url: &str, checkout: Option<&Path>) -> PathBuf {
        checkout
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.repos_dir.join(repository_dir_name(repository_url)))
    }

    fn launch_line(
        &self,
        strategy: &LaunchStrategy,
        checkout: Option<&Path>,
        env_file: &Path,
    ) -> String {
        match strategy {
            LaunchStrategy::LocalRepo {
                repository_url,
                runtime,
                entry_point,
            } => {
                let entry = self.checkout_dir(repository_url, checkout).join(entry_point);
                format!("{} {}", runtime.launch_command(), entry.display())
            }
            LaunchStrategy::PackageRegistry {
                invocation_args, ..
            } => format!("npx {}", invocation_args.join(" ")),
            LaunchStrategy::ContainerImage { image_reference } => format!(
                "docker run --rm -i --env-file {} {}",
                env_file.display(),
                image_reference
            ),
            LaunchStrategy::DirectCommand { command, args } => {
                std::iter::once(command.as_str())
                    .chain(args.iter().map(String::as_str))
                    .collect::<Vec<_>>()
                    .join(" ")
            }
        }
    }
}

/// Registry host named by an image reference, `ghcr.io` when it names none.
pub fn registry_host(image_reference: &str) -> &str {
    match image_reference.split_once('/') {
        Some((first, _))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            first
        }
        _ => DEFAULT_CONTAINER_REGISTRY,
    }
}

fn render_script(launch_line: &str, env_file: &Path, strategy: &LaunchStrategy) -> String {
    let env_file = env_file.display();
    let mut script = String::from("#!/bin/bash\n");
    match strategy {
        LaunchStrategy::ContainerImage { image_reference } => {
            script.push_str(&format!(
                "GITHUB_TOKEN=$(grep GITHUB_PERSONAL_ACCESS_TOKEN \"{env_file}\" \
                 | cut -d '=' -f2)\n"
            ));
            script.push_str(&format!(
                "echo $GITHUB_TOKEN | docker login {} -u token --password-stdin\n",
                registry_host(image_reference)
            ));
        }
        _ => {
            script.push_str(&format!("ENV_FILE=\"{env_file}\"\n"));
            script.push_str("if [ -s \"$ENV_FILE\" ]; then\n");
            script.push_str("  export $(grep -v '^\\s*$' \"$ENV_FILE\" | xargs)\n");
            script.push_str("fi\n");
        }
    }
    script.push_str(launch_line);
    script.push('\n');
    script
}

fn write_executable(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Runtime;

    fn generator(root: &Path) -> WrapperGenerator {
        WrapperGenerator::new(root.join("env"), root.join("repos"))
    }

    #[test]
    fn registry_host_defaults_to_ghcr() {
        assert_eq!(registry_host("ghcr.io/github/github-mcp-server"), "ghcr.io");
        assert_eq!(
            registry_host("registry.example.com:5000/team/img:1"),
            "registry.example.com:5000"
        );
        assert_eq!(registry_host("mcp/server"), "ghcr.io");
        assert_eq!(registry_host("alpine"), "ghcr.io");
    }

    #[test]
    fn local_wrapper_runs_entry_point_from_checkout() {
        let temp = tempfile::TempDir::new().unwrap();
        let generator = generator(temp.path());
        let strategy = LaunchStrategy::LocalRepo {
            repository_url: "https://github.com/org/bamboohr-mcp.git".into(),
            runtime: Runtime::Uv,
            entry_point: "server.py".into(),
        };
        let env_file = temp.path().join("env").join("bamboohr.env");

        let wrapper = generator
            .generate("bamboohr", &strategy, None, &env_file, Vec::new())
            .unwrap();

        let checkout = temp.path().join("repos").join("bamboohr-mcp");
        assert_eq!(wrapper.path, checkout.join("bamboohr-wrapper.sh"));
        let script = std::fs::read_to_string(&wrapper.path).unwrap();
        assert!(script.starts_with("#!/bin/bash\n"));
        let last = script.lines().last().unwrap();
        assert_eq!(last, format!("uv run {}", checkout.join("server.py").display()));
    }

    #[test]
    fn docker_wrapper_logs_in_then_runs() {
        let temp = tempfile::TempDir::new().unwrap();
        let generator = generator(temp.path());
        let strategy = LaunchStrategy::ContainerImage {
            image_reference: "ghcr.io/github/github-mcp-server".into(),
        };
        let env_file = temp.path().join("env").join("github.env");

        let wrapper = generator
            .generate("github", &strategy, None, &env_file, vec!["push".into()])
            .unwrap();

        assert_eq!(wrapper.path, temp.path().join("env").join("github-docker-wrapper.sh"));
        let script = std::fs::read_to_string(&wrapper.path).unwrap();
        assert!(script.contains("docker login ghcr.io -u token --password-stdin"));
        assert!(script.contains(&format!(
            "docker run --rm -i --env-file {} ghcr.io/github/github-mcp-server",
            env_file.display()
        )));
        assert_eq!(wrapper.launch_config.disabled_tools.as_deref().unwrap(), ["push"]);
        assert!(wrapper.launch_config.args.is_none());
        assert!(wrapper.launch_config.disabled.is_none());
    }

    #[test]
    fn direct_command_has_no_script() {
        let temp = tempfile::TempDir::new().unwrap();
        let generator = generator(temp.path());
        let strategy = LaunchStrategy::DirectCommand {
            command: "notes-mcp".into(),
            args: Vec::new(),
        };
        assert!(generator.script_path("notes", &strategy, None).is_none());

        let err = generator
            .generate("notes", &strategy, None, &temp.path().join("notes.env"), Vec::new())
            .unwrap_err();
        assert_eq!(err.kind(), "UnknownStrategyError");
        assert!(!temp.path().join("env").exists());
    }

    #[cfg(unix)]
    #[test]
    fn wrapper_is_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::TempDir::new().unwrap();
        let strategy = LaunchStrategy::PackageRegistry {
            package_name: "echo-mcp".into(),
            invocation_args: vec!["echo-mcp".into()],
        };
        let wrapper = generator(temp.path())
            .generate("echo", &strategy, None, &temp.path().join("echo.env"), Vec::new())
            .unwrap();
        let mode = std::fs::metadata(&wrapper.path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
