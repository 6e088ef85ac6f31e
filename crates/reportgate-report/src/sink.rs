//! Persistence hand-off for published reports.
//!
//! The gate only ever reads the previous report and, when it decides to
//! publish, writes the new one. Runs against the same destination must be
//! serialized by the caller: reading and writing are separate steps.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::SinkError;

#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Human-readable destination for logs.
    fn destination(&self) -> String;

    /// Returns the last persisted report, or `None` on first run.
    async fn read_previous(&self) -> Result<Option<String>, SinkError>;

    /// Persists `text`. `message` labels the change (used as commit message).
    async fn publish(&self, text: &str, message: &str) -> Result<(), SinkError>;
}

/// Writes the report to a plain file.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ReportSink for FileSink {
    fn destination(&self) -> String {
        self.path.display().to_string()
    }

    async fn read_previous(&self) -> Result<Option<String>, SinkError> {
        read_optional(&self.path).await
    }

    async fn publish(&self, text: &str, _message: &str) -> Result<(), SinkError> {
        write_creating_parents(&self.path, text).await
    }
}

/// Where [`GitSink`] pushes after committing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTarget {
    pub remote: String,
    /// Branch to update; `None` pushes the current branch.
    pub branch: Option<String>,
}

/// Writes the report inside a git working tree and commits it.
///
/// Without a push target the previous report is the version committed at
/// `HEAD`. With one it is the version on the remote-tracking branch, so a
/// commit whose push failed is still seen as unpublished and the next run
/// pushes it again.
#[derive(Debug, Clone)]
pub struct GitSink {
    repo_dir: PathBuf,
    /// Report path relative to `repo_dir`.
    report_path: PathBuf,
    push: Option<PushTarget>,
    /// Committer `(name, email)` passed as `-c user.*` overrides.
    identity: Option<(String, String)>,
}

impl GitSink {
    #[must_use]
    pub fn new(repo_dir: impl Into<PathBuf>, report_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            report_path: report_path.into(),
            push: None,
            identity: None,
        }
    }

    #[must_use]
    pub fn with_identity(mut self, name: &str, email: &str) -> Self {
        self.identity = Some((name.to_owned(), email.to_owned()));
        self
    }

    #[must_use]
    pub fn with_push(mut self, target: PushTarget) -> Self {
        self.push = Some(target);
        self
    }

    fn absolute_report_path(&self) -> PathBuf {
        self.repo_dir.join(&self.report_path)
    }

    /// Report path with forward slashes, as git expects on every platform.
    fn tree_path(&self) -> String {
        self.report_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn head_spec(&self) -> String {
        format!("HEAD:{}", self.tree_path())
    }

    /// `<rev>:<path>` of the last published report.
    async fn previous_spec(&self) -> Result<String, SinkError> {
        let Some(target) = &self.push else {
            return Ok(self.head_spec());
        };
        let branch = match &target.branch {
            Some(branch) => branch.clone(),
            None => self
                .git_checked(&["symbolic-ref", "--quiet", "--short", "HEAD"])
                .await?
                .trim()
                .to_owned(),
        };
        Ok(format!(
            "refs/remotes/{}/{branch}:{}",
            target.remote,
            self.tree_path()
        ))
    }

    async fn git(&self, args: &[&str]) -> Result<std::process::Output, SinkError> {
        let mut command = Command::new("git");
        if let Some((name, email)) = &self.identity {
            command
                .arg("-c")
                .arg(format!("user.name={name}"))
                .arg("-c")
                .arg(format!("user.email={email}"));
        }
        command
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .await
            .map_err(|e| SinkError::Git {
                command: args.join(" "),
                stderr: format!("could not run git: {e}"),
            })
    }

    async fn git_checked(&self, args: &[&str]) -> Result<String, SinkError> {
        let output = self.git(args).await?;
        if !output.status.success() {
            return Err(SinkError::Git {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ReportSink for GitSink {
    fn destination(&self) -> String {
        format!("git:{}", self.absolute_report_path().display())
    }

    async fn read_previous(&self) -> Result<Option<String>, SinkError> {
        let spec = self.previous_spec().await?;
        // Missing file, unborn HEAD or an unknown tracking ref all mean "no prior report".
        let exists = self.git(&["cat-file", "-e", &spec]).await?;
        if !exists.status.success() {
            return Ok(None);
        }
        let output = self.git(&["show", &spec]).await?;
        if !output.status.success() {
            return Err(SinkError::Git {
                command: format!("show {spec}"),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        String::from_utf8(output.stdout)
            .map(Some)
            .map_err(|_| SinkError::NotUtf8 {
                path: self.report_path.clone(),
            })
    }

    async fn publish(&self, text: &str, message: &str) -> Result<(), SinkError> {
        write_creating_parents(&self.absolute_report_path(), text).await?;

        let path = self.report_path.to_string_lossy().into_owned();
        self.git_checked(&["add", "--", &path]).await?;

        // Identical to HEAD when an earlier commit was never pushed.
        let staged = self.git(&["diff", "--cached", "--quiet", "--", &path]).await?;
        if staged.status.success() {
            tracing::info!(path = %path, "report already committed, nothing new to commit");
        } else {
            self.git_checked(&["commit", "--quiet", "-m", message]).await?;
            tracing::info!(path = %path, "committed report");
        }

        if let Some(target) = &self.push {
            let refspec = match &target.branch {
                Some(branch) => format!("HEAD:refs/heads/{branch}"),
                None => "HEAD".to_owned(),
            };
            self.git_checked(&["push", &target.remote, &refspec]).await?;
            tracing::info!(remote = %target.remote, refspec = %refspec, "pushed report commit");
        }
        Ok(())
    }
}

async fn read_optional(path: &Path) -> Result<Option<String>, SinkError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| SinkError::NotUtf8 {
                path: path.to_path_buf(),
            }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SinkError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

async fn write_creating_parents(path: &Path, text: &str) -> Result<(), SinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| SinkError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
    }
    tokio::fs::write(path, text)
        .await
        .map_err(|e| SinkError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}
