//! Pending updates and their security status.
//!
//! Three commands feed one record set:
//! - `dnf check-update --quiet` lists `name.arch  version  repo` rows and
//!   exits 100 when updates are pending
//! - `dnf updateinfo list --security --available` lists security advisories
//!   as `ADVISORY  SEVERITY  NEVRA`
//! - `rpm -qa` supplies the installed version of each package
//!
//! If any of them fails the whole category is unavailable; an update list
//! without security flags would silently under-report.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::parse::{data_lines, is_metadata_banner, parse_nevra, strip_arch};
use super::{ensure_parsed, run_checked, Collected, CollectionError, Collector, Coverage};
use crate::config::AnalysisConfig;
use crate::exec::CommandRunner;

const CHECK_UPDATE: &[&str] = &["check-update", "--quiet"];
const SECURITY: &[&str] = &["updateinfo", "list", "--security", "--available"];
const INSTALLED: &[&str] = &["-qa", "--queryformat", "%{NAME}|%{VERSION}-%{RELEASE}\\n"];

/// check-update exits 100 when there is something to install
const UPDATES_AVAILABLE: i32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRecord {
    pub name: String,
    pub current_version: Option<String>,
    pub candidate_version: String,
    pub repository: String,
    pub security: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSummary {
    pub total: usize,
    pub security_count: usize,
    pub updates: Vec<UpdateRecord>,
}

impl UpdateSummary {
    pub fn from_records(updates: Vec<UpdateRecord>) -> Self {
        UpdateSummary {
            total: updates.len(),
            security_count: updates.iter().filter(|u| u.security).count(),
            updates,
        }
    }
}

/// One row of `dnf check-update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpdate {
    pub name: String,
    pub candidate_version: String,
    pub repository: String,
}

pub struct UpdatesCollector;

impl Collector for UpdatesCollector {
    type Output = UpdateSummary;

    fn name(&self) -> &'static str {
        "updates"
    }

    fn enabled(&self, analysis: &AnalysisConfig) -> bool {
        analysis.include_updates
    }

    fn collect(
        &self,
        runner: &dyn CommandRunner,
        _analysis: &AnalysisConfig,
    ) -> Result<Collected<UpdateSummary>, CollectionError> {
        let output = run_checked(runner, "dnf", CHECK_UPDATE, &[0, UPDATES_AVAILABLE])?;
        let (pending, pending_coverage) = parse_check_update(&output.stdout);
        ensure_parsed("dnf", CHECK_UPDATE, pending_coverage)?;

        if pending.is_empty() {
            return Ok(Collected {
                data: UpdateSummary::from_records(Vec::new()),
                coverage: pending_coverage,
            });
        }

        let output = run_checked(runner, "dnf", SECURITY, &[0])?;
        let (security, security_coverage) = parse_security_advisories(&output.stdout);

        let output = run_checked(runner, "rpm", INSTALLED, &[0])?;
        let (installed, installed_coverage) = parse_installed_versions(&output.stdout);
        ensure_parsed("rpm", INSTALLED, installed_coverage)?;

        let records = pending
            .into_iter()
            .map(|p| UpdateRecord {
                current_version: installed.get(&p.name).cloned(),
                security: security.contains(&p.name),
                name: p.name,
                candidate_version: p.candidate_version,
                repository: p.repository,
            })
            .collect();

        Ok(Collected {
            data: UpdateSummary::from_records(records),
            coverage: pending_coverage
                .merge(security_coverage)
                .merge(installed_coverage),
        })
    }
}

pub fn parse_check_update(stdout: &str) -> (Vec<PendingUpdate>, Coverage) {
    let mut updates = Vec::new();
    let mut coverage = Coverage::default();
    // dnf wraps long `name.arch` fields onto their own line
    let mut wrapped: Option<&str> = None;

    for line in data_lines(stdout) {
        if line.starts_with("Obsoleting Packages") {
            break;
        }
        if is_metadata_banner(line) || line.starts_with("Security:") {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let row = match (fields.as_slice(), wrapped.take()) {
            ([name_arch], dangling) => {
                // an earlier wrapped name never got its row
                if dangling.is_some() {
                    coverage.record(false);
                }
                wrapped = Some(*name_arch);
                continue;
            }
            ([version, repo], Some(name_arch)) => Some((name_arch, *version, *repo)),
            ([name_arch, version, repo], dangling) => {
                if dangling.is_some() {
                    coverage.record(false);
                }
                Some((*name_arch, *version, *repo))
            }
            (_, dangling) => {
                if dangling.is_some() {
                    coverage.record(false);
                }
                None
            }
        };

        coverage.record(row.is_some());
        match row {
            Some((name_arch, version, repo)) => updates.push(PendingUpdate {
                name: strip_arch(name_arch).to_string(),
                candidate_version: version.to_string(),
                repository: repo.to_string(),
            }),
            None => debug!(line, "updates: skipping malformed check-update line"),
        }
    }

    if wrapped.is_some() {
        coverage.record(false);
    }

    (updates, coverage)
}

/// Package names covered by at least one security advisory.
pub fn parse_security_advisories(stdout: &str) -> (BTreeSet<String>, Coverage) {
    let mut names = BTreeSet::new();
    let mut coverage = Coverage::default();

    for line in data_lines(stdout) {
        if is_metadata_banner(line) {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        // dnf5 prints a column header
        if fields.first() == Some(&"Name") {
            continue;
        }

        let name = fields
            .iter()
            .skip(2)
            .find_map(|f| parse_nevra(f))
            .map(|n| n.name);

        coverage.record(name.is_some());
        match name {
            Some(n) => {
                names.insert(n);
            }
            None => debug!(line, "updates: skipping malformed advisory line"),
        }
    }

    (names, coverage)
}

/// `NAME|VERSION-RELEASE` rows from rpm. Later rows win for multi-version
/// packages such as kernels.
pub fn parse_installed_versions(stdout: &str) -> (BTreeMap<String, String>, Coverage) {
    let mut versions = BTreeMap::new();
    let mut coverage = Coverage::default();

    for line in data_lines(stdout) {
        let parsed = line
            .split_once('|')
            .map(|(name, version)| (name.trim(), version.trim()))
            .filter(|(name, version)| !name.is_empty() && !version.is_empty());

        coverage.record(parsed.is_some());
        match parsed {
            Some((name, version)) => {
                versions.insert(name.to_string(), version.to_string());
            }
            None => debug!(line, "updates: skipping malformed rpm line"),
        }
    }

    (versions, coverage)
}
