//! Statement download orchestration.
//!
//! A run moves through these stages:
//!
//! ```text
//! Start ──► ProfilesFetched ──► BalancesFetched ──► StatementsDownloaded ──► Done
//!   │              │                   │                      │
//!   └──────────────┴───────────────────┴──────────────────────┴──► Cancelled
//! ```
//!
//! Balances and statements are fetched in two waves of concurrent workers.
//! The second wave only starts once every worker of the first has finished.
//! Workers share one [`Cancellation`]: the first failure trips it, and every
//! worker checks it before and after its remote call.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use wise::{Balance, Profile, ProfileId, ProfileType, StatementRequest, StatementType, WiseApi};

use crate::cancel::Cancellation;
use crate::output::{DownloadReporter, StatementSink};

// ============================================================================
// Job description
// ============================================================================

/// Which profile types take part in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileSelection {
    pub personal: bool,
    pub business: bool,
}

impl ProfileSelection {
    pub fn includes(&self, profile_type: ProfileType) -> bool {
        match profile_type {
            ProfileType::Personal => self.personal,
            ProfileType::Business => self.business,
            ProfileType::Unknown => false,
        }
    }
}

/// Parameters of one run.
#[derive(Debug, Clone, Copy)]
pub struct StatementJob {
    pub selection: ProfileSelection,
    pub interval_start: DateTime<Utc>,
    pub interval_end: DateTime<Utc>,
    pub statement_type: StatementType,
    pub dry_run: bool,
}

/// One statement to fetch.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub name: String,
    pub request: StatementRequest,
}

// ============================================================================
// Outcome
// ============================================================================

/// Stage a run was in when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Profiles,
    Balances,
    Statements,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Profiles => "listing profiles",
            Stage::Balances => "fetching balances",
            Stage::Statements => "downloading statements",
        })
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("cancelled while {stage}: {cause}")]
    Cancelled { stage: Stage, cause: String },
}

#[derive(Debug, Default)]
pub struct RunSummary {
    /// Selected profiles.
    pub profiles: usize,
    /// Names of every planned statement, dry-run included.
    pub planned: Vec<String>,
    /// Locations of written statements.
    pub written: Vec<String>,
}

// ============================================================================
// Naming
// ============================================================================

/// Deterministic statement name: `<type>--<full name>--<currency>`.
///
/// Spaces and path separators in the full name become underscores, so the
/// name is always a single file name.
pub fn statement_name(profile: &Profile, balance: &Balance) -> String {
    format!(
        "{}--{}--{}",
        profile.profile_type,
        profile
            .full_name
            .replace(|c: char| c == ' ' || c == '/' || c == '\\', "_"),
        balance.currency
    )
}

/// Cross product of selected profiles with their balances.
///
/// Profiles without a balances entry are skipped. A balance id seen twice
/// for the same profile yields one task. When a profile holds several
/// balances in one currency, their names get the balance id appended.
pub fn plan_downloads(
    profiles: &BTreeMap<ProfileId, Profile>,
    balances: &BTreeMap<ProfileId, Vec<Balance>>,
    job: &StatementJob,
) -> Vec<DownloadTask> {
    let mut tasks = Vec::new();

    for (profile_id, profile) in profiles {
        let Some(profile_balances) = balances.get(profile_id) else {
            continue;
        };

        let mut seen = HashSet::new();
        let unique: Vec<&Balance> = profile_balances
            .iter()
            .filter(|balance| seen.insert(balance.id))
            .collect();

        let mut per_currency: HashMap<&str, usize> = HashMap::new();
        for balance in &unique {
            *per_currency.entry(balance.currency.as_str()).or_default() += 1;
        }

        for balance in unique {
            let mut name = statement_name(profile, balance);
            if per_currency[balance.currency.as_str()] > 1 {
                name = format!("{}--{}", name, balance.id);
            }

            tasks.push(DownloadTask {
                name,
                request: StatementRequest {
                    profile_id: profile.id,
                    balance_id: balance.id,
                    interval_start: job.interval_start,
                    interval_end: job.interval_end,
                    statement_type: job.statement_type,
                },
            });
        }
    }

    tasks
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct StatementDownloader {
    api: Arc<dyn WiseApi>,
    sink: Arc<dyn StatementSink>,
    reporter: Arc<dyn DownloadReporter>,
    cancel: Cancellation,
}

impl StatementDownloader {
    pub fn new(
        api: Arc<dyn WiseApi>,
        sink: Arc<dyn StatementSink>,
        reporter: Arc<dyn DownloadReporter>,
        cancel: Cancellation,
    ) -> Self {
        Self {
            api,
            sink,
            reporter,
            cancel,
        }
    }

    /// Run the job to completion or cancellation.
    pub async fn run(&self, job: &StatementJob) -> Result<RunSummary, RunError> {
        if self.cancel.is_tripped() {
            return Err(self.cancelled(Stage::Profiles));
        }

        info!("Getting profiles");
        let profiles = match self.api.list_profiles().await {
            Ok(profiles) => profiles,
            Err(e) => {
                error!(error = %e, "Failed to get profiles");
                self.cancel.trip(format!("failed to get profiles: {}", e));
                return Err(self.cancelled(Stage::Profiles));
            }
        };

        let profiles: BTreeMap<ProfileId, Profile> = profiles
            .into_iter()
            .filter(|profile| job.selection.includes(profile.profile_type))
            .map(|profile| (profile.id, profile))
            .collect();
        debug!(count = profiles.len(), "Selected profiles");

        if self.cancel.is_tripped() {
            return Err(self.cancelled(Stage::Profiles));
        }

        let balances = self.fetch_balances(&profiles).await;
        if self.cancel.is_tripped() {
            return Err(self.cancelled(Stage::Balances));
        }

        let tasks = plan_downloads(&profiles, &balances, job);
        let planned = tasks.iter().map(|task| task.name.clone()).collect();

        let written = self.download_statements(tasks, job.dry_run).await;
        if self.cancel.is_tripped() {
            return Err(self.cancelled(Stage::Statements));
        }

        Ok(RunSummary {
            profiles: profiles.len(),
            planned,
            written,
        })
    }

    fn cancelled(&self, stage: Stage) -> RunError {
        RunError::Cancelled {
            stage,
            cause: self.cancel.cause().unwrap_or("cancelled").to_string(),
        }
    }

    /// First wave: one worker per profile.
    async fn fetch_balances(
        &self,
        profiles: &BTreeMap<ProfileId, Profile>,
    ) -> BTreeMap<ProfileId, Vec<Balance>> {
        let mut workers = JoinSet::new();

        for profile_id in profiles.keys().copied() {
            let api = Arc::clone(&self.api);
            let cancel = self.cancel.clone();

            workers.spawn(async move {
                if cancel.is_tripped() {
                    return None;
                }

                debug!(profile_id, "Getting balances");
                match api.get_balances(profile_id).await {
                    Ok(balances) if !cancel.is_tripped() => Some((profile_id, balances)),
                    Ok(_) => None,
                    Err(e) => {
                        error!(profile_id, error = %e, "Failed to get balances");
                        cancel.trip(format!(
                            "failed to get balances of profile {}: {}",
                            profile_id, e
                        ));
                        None
                    }
                }
            });
        }

        let mut balances = BTreeMap::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Some((profile_id, found))) => {
                    balances.insert(profile_id, found);
                }
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "Balances worker failed");
                    self.cancel.trip(format!("balances worker failed: {}", e));
                }
            }
        }

        balances
    }

    /// Second wave: one worker per statement.
    async fn download_statements(&self, tasks: Vec<DownloadTask>, dry_run: bool) -> Vec<String> {
        let mut workers = JoinSet::new();

        for task in tasks {
            let api = Arc::clone(&self.api);
            let sink = Arc::clone(&self.sink);
            let reporter = Arc::clone(&self.reporter);
            let cancel = self.cancel.clone();

            workers.spawn(async move {
                download_statement(task, dry_run, &*api, &*sink, &*reporter, &cancel).await
            });
        }

        let mut written = Vec::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Some(location)) => written.push(location),
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "Download worker failed");
                    self.cancel.trip(format!("download worker failed: {}", e));
                }
            }
        }

        written
    }
}

async fn download_statement(
    task: DownloadTask,
    dry_run: bool,
    api: &dyn WiseApi,
    sink: &dyn StatementSink,
    reporter: &dyn DownloadReporter,
    cancel: &Cancellation,
) -> Option<String> {
    info!("Downloading {}", task.name);

    if dry_run {
        debug!(name = %task.name, "Dry run, skipping download");
        return None;
    }

    if cancel.is_tripped() {
        return None;
    }

    let pdf = match api.get_statement_pdf(&task.request).await {
        Ok(pdf) => pdf,
        Err(e) => {
            error!(
                profile_id = task.request.profile_id,
                balance_id = task.request.balance_id,
                error = %e,
                "Failed to download statement"
            );
            cancel.trip(format!("failed to download {}: {}", task.name, e));
            return None;
        }
    };

    if cancel.is_tripped() {
        return None;
    }

    let location = match sink.write(&task.name, &pdf).await {
        Ok(location) => location,
        Err(e) => {
            error!(name = %task.name, error = %e, "Failed to write statement");
            cancel.trip(format!("failed to write {}: {}", task.name, e));
            return None;
        }
    };

    debug!(name = %task.name, location = %location, "Statement written");
    reporter.downloaded(&location);
    Some(location)
}
