//! Repository checkouts under the repos directory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SetupError;
use crate::process::{CommandRunner, CommandSpec, run_to_completion};

/// Directory name for a checkout: the last path segment of `url` without a
/// trailing `.git`, or `repo` when that leaves nothing.
pub fn repository_dir_name(url: &str) -> String {
    let last = url.rsplit('/').next().unwrap_or_default();
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() {
        "repo".to_string()
    } else {
        name.to_string()
    }
}

/// Creates and removes local checkouts of server repositories.
#[async_trait]
pub trait Provisioner: Send + Sync + fmt::Debug {
    fn checkout_path(&self, url: &str) -> PathBuf;

    /// Clone `url` and return the checkout path.
    async fn clone_repository(&self, url: &str) -> Result<PathBuf, SetupError>;

    /// Remove the checkout. Never fails; problems are logged.
    async fn teardown(&self, url: &str);
}

/// Provisioner that shells out to `git clone`.
#[derive(Debug, Clone)]
pub struct GitProvisioner {
    repos_dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl GitProvisioner {
    pub fn new(repos_dir: PathBuf, runner: Arc<dyn CommandRunner>) -> Self {
        Self { repos_dir, runner }
    }

    pub fn repos_dir(&self) -> &Path {
        &self.repos_dir
    }
}

#[async_trait]
impl Provisioner for GitProvisioner {
    fn checkout_path(&self, url: &str) -> PathBuf {
        self.repos_dir.join(repository_dir_name(url))
    }

    async fn clone_repository(&self, url: &str) -> Result<PathBuf, SetupError> {
        tokio::fs::create_dir_all(&self.repos_dir)
            .await
            .map_err(|err| SetupError::Clone {
                url: url.to_string(),
                reason: format!(
                    "Failed to create {}: {}",
                    self.repos_dir.display(),
                    err
                ),
            })?;

        let destination = self.checkout_path(url);
        let command = CommandSpec::new("git")
            .arg("clone")
            .arg(url)
            .arg(destination.to_string_lossy());
        run_to_completion(self.runner.as_ref(), &command)
            .await
            .map_err(|reason| SetupError::Clone {
                url: url.to_string(),
                reason,
            })?;

        tracing::info!(url, path = %destination.display(), "Cloned repository");
        Ok(destination)
    }

    async fn teardown(&self, url: &str) {
        let path = self.checkout_path(url);
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed checkout"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %path.display(), "Failed to remove checkout: {}", err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::SystemRunner;

    #[test]
    fn dir_name_strips_git_suffix() {
        assert_eq!(repository_dir_name("https://github.com/org/echo-mcp.git"), "echo-mcp");
        assert_eq!(repository_dir_name("git@github.com:org/tools"), "tools");
        assert_eq!(repository_dir_name("https://github.com/org/tools/"), "repo");
        assert_eq!(repository_dir_name(".git"), "repo");
        assert_eq!(repository_dir_name(""), "repo");
    }

    #[tokio::test]
    async fn teardown_of_missing_checkout_is_noop() {
        let temp = tempfile::TempDir::new().unwrap();
        let provisioner = GitProvisioner::new(temp.path().join("repos"), Arc::new(SystemRunner));
        provisioner.teardown("https://example.com/absent.git").await;
        assert!(!temp.path().join("repos").exists());
    }

    #[tokio::test]
    async fn teardown_removes_checkout() {
        let temp = tempfile::TempDir::new().unwrap();
        let provisioner = GitProvisioner::new(temp.path().join("repos"), Arc::new(SystemRunner));
        let checkout = provisioner.checkout_path("https://example.com/echo.git");
        std::fs::create_dir_all(checkout.join("src")).unwrap();

        provisioner.teardown("https://example.com/echo.git").await;
        assert!(!checkout.exists());
    }
}
