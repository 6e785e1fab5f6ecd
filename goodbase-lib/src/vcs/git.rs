use super::{LOG_TARGET, Vcs};
use crate::Result;
use camino::Utf8Path;
use core::time::Duration;
use ohno::{IntoAppError, bail};
use std::process::{Output, Stdio};
use std::time::Instant;
use tokio::process::Command;

const GIT_TIMEOUT: Duration = Duration::from_mins(5);

/// [`Vcs`] implemented by running the `git` executable.
#[derive(Debug, Clone)]
pub struct Git {
    timeout: Duration,
}

impl Default for Git {
    fn default() -> Self {
        Self { timeout: GIT_TIMEOUT }
    }
}

impl Git {
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run(&self, directory: &Utf8Path, args: &[&str]) -> Result<()> {
        let start_time = Instant::now();
        let output = self.run_with_timeout(directory, args).await?;
        check_git_output(&output, args)?;

        log::debug!(
            target: LOG_TARGET,
            "'git {}' in '{directory}' completed in {:.3}s",
            args.join(" "),
            start_time.elapsed().as_secs_f64()
        );
        Ok(())
    }

    async fn run_with_timeout(&self, directory: &Utf8Path, args: &[&str]) -> Result<Output> {
        let child = Command::new("git")
            .arg("-C")
            .arg(directory.as_str())
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .into_app_err("could not spawn git command")?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(e).into_app_err_with(|| format!("'git {}' failed to run", args.join(" "))),
            Err(_) => {
                bail!("'git {}' timed out after {} seconds", args.join(" "), self.timeout.as_secs());
            }
        }
    }
}

impl Vcs for Git {
    async fn fetch(&self, directory: &Utf8Path) -> Result<()> {
        self.run(directory, &["fetch", "origin"]).await
    }

    async fn checkout(&self, revision: &str, directory: &Utf8Path, branch: Option<&str>) -> Result<()> {
        match branch {
            Some(branch) => self.run(directory, &["checkout", "-b", branch, revision]).await,
            None => self.run(directory, &["checkout", revision]).await,
        }
    }

    async fn rebase(&self, revision: &str, directory: &Utf8Path) -> Result<()> {
        self.run(directory, &["rebase", revision]).await
    }

    async fn merge(&self, revision: &str, directory: &Utf8Path) -> Result<()> {
        self.run(directory, &["merge", revision]).await
    }
}

fn check_git_output(output: &Output, args: &[&str]) -> Result<()> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("'git {}' failed: {}", args.join(" "), stderr.trim());
    }
    Ok(())
}
