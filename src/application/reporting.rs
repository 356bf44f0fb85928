use anyhow::Result;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::domain::LedgerEntry;
use crate::io::{
    render_financial_statement, render_trial_balance, render_yearly_cash, write_report,
    LedgerSnapshot,
};

/// State string reported for a scope the runner does not know.
pub const UNKNOWN_SCOPE: &str = "unknown";

/// The three ledger reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportScope {
    /// Trial balance of every account
    Accounts,
    /// Cash balance per financial year
    Yearly,
    /// Categorized financial statement
    Fs,
}

impl ReportScope {
    pub const ALL: [ReportScope; 3] = [ReportScope::Accounts, ReportScope::Yearly, ReportScope::Fs];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportScope::Accounts => "accounts",
            ReportScope::Yearly => "yearly",
            ReportScope::Fs => "fs",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "accounts" => Some(ReportScope::Accounts),
            "yearly" => Some(ReportScope::Yearly),
            "fs" => Some(ReportScope::Fs),
            _ => None,
        }
    }

    /// Output file name inside the output directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            ReportScope::Accounts => "accounts.csv",
            ReportScope::Yearly => "yearly.csv",
            ReportScope::Fs => "fs.csv",
        }
    }

    pub fn render(&self, entries: &[LedgerEntry]) -> Result<String> {
        match self {
            ReportScope::Accounts => render_trial_balance(entries),
            ReportScope::Yearly => render_yearly_cash(entries),
            ReportScope::Fs => render_financial_statement(entries),
        }
    }
}

impl std::fmt::Display for ReportScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of one report scope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReportState {
    #[default]
    Idle,
    Processing,
    Finished {
        elapsed: Duration,
    },
    Error(String),
}

impl ReportState {
    pub fn is_finished(&self) -> bool {
        matches!(self, ReportState::Finished { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ReportState::Error(_))
    }
}

impl std::fmt::Display for ReportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportState::Idle => write!(f, "idle"),
            ReportState::Processing => write!(f, "processing"),
            ReportState::Finished { elapsed } => {
                write!(f, "finished in {:.2}s", elapsed.as_secs_f64())
            }
            ReportState::Error(message) => write!(f, "error: {}", message),
        }
    }
}

/// Runs ledger reports in the background and tracks their state.
///
/// Triggering a scope that is already processing starts a second,
/// independent run. Whichever run finishes last owns both the state and
/// the output file.
#[derive(Clone)]
pub struct ReportRunner {
    output_dir: PathBuf,
    states: Arc<RwLock<HashMap<ReportScope, ReportState>>>,
}

impl ReportRunner {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let states: HashMap<ReportScope, ReportState> = ReportScope::ALL
            .into_iter()
            .map(|scope| (scope, ReportState::Idle))
            .collect();
        Self {
            output_dir: output_dir.into(),
            states: Arc::new(RwLock::new(states)),
        }
    }

    pub fn output_path(&self, scope: ReportScope) -> PathBuf {
        self.output_dir.join(scope.file_name())
    }

    /// Current state of a scope.
    pub fn status(&self, scope: ReportScope) -> ReportState {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&scope)
            .cloned()
            .unwrap_or_default()
    }

    /// State string for a scope name; `"unknown"` for anything but
    /// `accounts`, `yearly` and `fs`.
    pub fn state(&self, scope: &str) -> String {
        match ReportScope::from_str(scope) {
            Some(scope) => self.status(scope).to_string(),
            None => UNKNOWN_SCOPE.to_string(),
        }
    }

    /// Start a report run over `snapshot` and return immediately.
    /// Must be called from within a tokio runtime.
    pub fn trigger(&self, scope: ReportScope, snapshot: Arc<LedgerSnapshot>) -> ReportHandle {
        tracing::info!(%scope, entries = snapshot.entries.len(), "Report triggered");
        let runner = self.clone();
        self.spawn_run(scope, async move { runner.run(scope, &snapshot).await })
    }

    /// Trigger every scope over the same snapshot.
    pub fn trigger_all(&self, snapshot: Arc<LedgerSnapshot>) -> Vec<ReportHandle> {
        ReportScope::ALL
            .into_iter()
            .map(|scope| self.trigger(scope, Arc::clone(&snapshot)))
            .collect()
    }

    /// Mark `scope` processing and run `job` in the background. The job
    /// gets its own task so a panic in it still lands in the shared state.
    fn spawn_run<F>(&self, scope: ReportScope, job: F) -> ReportHandle
    where
        F: Future<Output = Result<PathBuf>> + Send + 'static,
    {
        self.set_state(scope, ReportState::Processing);

        let runner = self.clone();
        let task = tokio::spawn(async move {
            let started = Instant::now();
            let outcome = match tokio::spawn(job).await {
                Ok(result) => result,
                Err(e) => Err(anyhow::anyhow!("report task failed: {}", e)),
            };
            let state = match outcome {
                Ok(path) => {
                    let elapsed = started.elapsed();
                    tracing::info!(%scope, path = %path.display(), ?elapsed, "Report finished");
                    ReportState::Finished { elapsed }
                }
                Err(e) => {
                    tracing::error!(%scope, error = %format!("{:#}", e), "Report failed");
                    ReportState::Error(format!("{:#}", e))
                }
            };
            runner.set_state(scope, state.clone());
            state
        });

        ReportHandle {
            scope,
            runner: self.clone(),
            task,
        }
    }

    async fn run(&self, scope: ReportScope, snapshot: &LedgerSnapshot) -> Result<PathBuf> {
        let contents = scope.render(&snapshot.entries)?;
        let path = self.output_path(scope);
        write_report(&path, &contents).await?;
        Ok(path)
    }

    fn set_state(&self, scope: ReportScope, state: ReportState) {
        self.states
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(scope, state);
    }
}

/// Handle to one report run.
pub struct ReportHandle {
    scope: ReportScope,
    runner: ReportRunner,
    task: JoinHandle<ReportState>,
}

impl ReportHandle {
    pub fn scope(&self) -> ReportScope {
        self.scope
    }

    /// Wait for the run and return the state it ended in.
    pub async fn wait(self) -> ReportState {
        match self.task.await {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(scope = %self.scope, error = %e, "Report task did not complete");
                let state = ReportState::Error(e.to_string());
                self.runner.set_state(self.scope, state.clone());
                state
            }
        }
    }
}
