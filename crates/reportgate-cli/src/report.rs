//! The `sonarqube` / `azure-devops` subcommands: wire a source and a sink into
//! one pipeline run and turn its outcome into an exit status.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{ArgAction, Args, ValueEnum};
use reportgate_core::AppConfig;
use reportgate_report::{
    FileSink, GitSink, Pipeline, PublishStatus, PushTarget, ReportSink, RunOptions,
};
use reportgate_source::{
    AzureDevOpsSource, Credential, ReportSource, SonarQubeSource, SourceHttp,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourceKind {
    SonarQube,
    AzureDevOps,
}

impl SourceKind {
    fn slug(self) -> &'static str {
        match self {
            SourceKind::SonarQube => "sonarqube",
            SourceKind::AzureDevOps => "azure-devops",
        }
    }

    /// `SonarQube` takes user tokens as bearer credentials; Azure `DevOps`
    /// expects a personal access token as the basic-auth password.
    fn credential(self, token: &str) -> Credential {
        match self {
            SourceKind::SonarQube => Credential::bearer(token),
            SourceKind::AzureDevOps => Credential::token_as_password(token),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum SinkKind {
    /// Overwrite a file on disk
    File,
    /// Commit the file in a git working tree
    Git,
}

#[derive(Clone, Args)]
pub(crate) struct ReportArgs {
    /// Server or organization base URL
    #[arg(long, env = "REPORTGATE_URL")]
    pub url: String,
    /// Access token for the source
    #[arg(long, env = "REPORTGATE_TOKEN", hide_env_values = true)]
    pub token: String,
    /// Report path; relative to --repo-dir for the git sink
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Keep private projects in the report
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub include_restricted: bool,
    /// Where the report is published
    #[arg(long, value_enum, default_value_t = SinkKind::File)]
    pub sink: SinkKind,
    /// Git working tree holding the report (git sink only)
    #[arg(long, default_value = ".")]
    pub repo_dir: PathBuf,
    /// Push after committing (git sink only)
    #[arg(long)]
    pub push: bool,
    /// Remote to push to
    #[arg(long, default_value = "origin")]
    pub remote: String,
    /// Branch to push to; defaults to the current branch
    #[arg(long, requires = "push")]
    pub push_branch: Option<String>,
    /// Render and compare, print the report, never publish
    #[arg(long)]
    pub dry_run: bool,
}

impl fmt::Debug for ReportArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportArgs")
            .field("url", &self.url)
            .field("token", &"[redacted]")
            .field("output", &self.output)
            .field("include_restricted", &self.include_restricted)
            .field("sink", &self.sink)
            .field("repo_dir", &self.repo_dir)
            .field("push", &self.push)
            .field("remote", &self.remote)
            .field("push_branch", &self.push_branch)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl ReportArgs {
    pub(crate) fn output_path(&self, kind: SourceKind) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("reports/{}-report.md", kind.slug())))
    }

    fn build_sink(&self, kind: SourceKind) -> anyhow::Result<Box<dyn ReportSink>> {
        let output = self.output_path(kind);
        match self.sink {
            SinkKind::File => {
                if self.push {
                    anyhow::bail!("--push needs --sink git");
                }
                Ok(Box::new(FileSink::new(output)))
            }
            SinkKind::Git => {
                let mut sink = GitSink::new(&self.repo_dir, output);
                if self.push {
                    sink = sink.with_push(PushTarget {
                        remote: self.remote.clone(),
                        branch: self.push_branch.clone(),
                    });
                }
                Ok(Box::new(sink))
            }
        }
    }
}

/// Runs one report for `kind`.
///
/// # Errors
///
/// Returns an error when the source cannot be listed, the run is cancelled or
/// exceeds its deadline, or the sink rejects a changed report.
pub(crate) async fn run_report<C>(
    config: &AppConfig,
    kind: SourceKind,
    args: &ReportArgs,
    cancel: C,
) -> anyhow::Result<()>
where
    C: Future<Output = ()>,
{
    let http = SourceHttp::new(
        &args.url,
        kind.credential(&args.token),
        config.request_timeout(),
        &config.user_agent,
    )
    .with_context(|| format!("invalid {kind} connection settings"))?;

    let source: Box<dyn ReportSource> = match kind {
        SourceKind::SonarQube => Box::new(SonarQubeSource::new(http)),
        SourceKind::AzureDevOps => Box::new(AzureDevOpsSource::new(http)),
    };
    let sink = args.build_sink(kind)?;

    let mut options = RunOptions::from_config(config, args.include_restricted);
    options.dry_run = args.dry_run;

    let outcome = Pipeline::new(source.as_ref(), sink.as_ref(), options)
        .run(Utc::now(), cancel)
        .await
        .with_context(|| format!("{kind} report run failed"))?;

    let summary = outcome.report.summary();
    tracing::info!(
        items = summary.total_records,
        failed_items = summary.failed_records,
        reason = %outcome.decision.reason,
        "report complete"
    );

    if args.dry_run {
        print!("{}", outcome.text);
    }

    publish_result(outcome.status, &sink.destination())
}

/// Exit status of a completed run: only a rejected publish is an error.
fn publish_result(status: PublishStatus, destination: &str) -> anyhow::Result<()> {
    match status {
        PublishStatus::Published => {
            tracing::info!(destination, "report published");
            Ok(())
        }
        PublishStatus::Skipped | PublishStatus::DryRun => Ok(()),
        PublishStatus::Failed(e) => {
            Err(anyhow::Error::new(e).context(format!("publishing to {destination} failed")))
        }
    }
}
