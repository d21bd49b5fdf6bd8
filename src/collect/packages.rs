//! Installed package inventory.
//!
//! Reads `dnf repoquery --installed` with a pipe-separated query format:
//! `name|evr|installsize|from_repo`, one package per line. A second query,
//! `dnf repoquery --userinstalled`, splits the inventory into packages the
//! operator asked for and packages pulled in as dependencies.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::parse::{data_lines, is_metadata_banner, normalize_repo};
use super::{ensure_parsed, run_checked, Collected, CollectionError, Collector, Coverage};
use crate::config::AnalysisConfig;
use crate::exec::CommandRunner;

const PROGRAM: &str = "dnf";
const ARGS: &[&str] = &[
    "repoquery",
    "--installed",
    "--queryformat",
    "%{name}|%{evr}|%{installsize}|%{from_repo}\\n",
];
const USER_INSTALLED: &[&str] = &["repoquery", "--userinstalled", "--queryformat", "%{name}\\n"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    pub size_bytes: u64,
    pub repository: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInventory {
    pub total_count: usize,
    pub total_size_bytes: u64,
    /// Installed on request rather than as a dependency
    #[serde(default)]
    pub user_installed: usize,
    #[serde(default)]
    pub dependency_installed: usize,
    /// In the order the package manager listed them
    pub packages: Vec<PackageRecord>,
}

impl PackageInventory {
    pub fn from_records(packages: Vec<PackageRecord>) -> Self {
        PackageInventory {
            total_count: packages.len(),
            total_size_bytes: packages
                .iter()
                .fold(0u64, |acc, p| acc.saturating_add(p.size_bytes)),
            user_installed: 0,
            dependency_installed: packages.len(),
            packages,
        }
    }

    /// Splits the inventory by install reason. Names not in the inventory
    /// are ignored.
    pub fn with_user_installed(mut self, names: &BTreeSet<String>) -> Self {
        self.user_installed = self
            .packages
            .iter()
            .filter(|p| names.contains(&p.name))
            .count();
        self.dependency_installed = self.total_count - self.user_installed;
        self
    }

    /// The `n` largest packages. Ties keep listing order.
    pub fn largest(&self, n: usize) -> Vec<&PackageRecord> {
        let mut sorted: Vec<_> = self.packages.iter().collect();
        sorted.sort_by_key(|p| std::cmp::Reverse(p.size_bytes));
        sorted.truncate(n);
        sorted
    }
}

pub struct PackagesCollector;

impl Collector for PackagesCollector {
    type Output = PackageInventory;

    fn name(&self) -> &'static str {
        "packages"
    }

    fn enabled(&self, analysis: &AnalysisConfig) -> bool {
        analysis.include_packages
    }

    fn collect(
        &self,
        runner: &dyn CommandRunner,
        _analysis: &AnalysisConfig,
    ) -> Result<Collected<PackageInventory>, CollectionError> {
        let output = run_checked(runner, PROGRAM, ARGS, &[0])?;
        let (records, coverage) = parse_packages(&output.stdout);
        ensure_parsed(PROGRAM, ARGS, coverage)?;

        let output = run_checked(runner, PROGRAM, USER_INSTALLED, &[0])?;
        let (user_installed, user_coverage) = parse_user_installed(&output.stdout);
        ensure_parsed(PROGRAM, USER_INSTALLED, user_coverage)?;

        Ok(Collected {
            data: PackageInventory::from_records(records).with_user_installed(&user_installed),
            coverage: coverage.merge(user_coverage),
        })
    }
}

pub fn parse_packages(stdout: &str) -> (Vec<PackageRecord>, Coverage) {
    let mut records = Vec::new();
    let mut coverage = Coverage::default();

    for line in data_lines(stdout) {
        if is_metadata_banner(line) {
            continue;
        }

        let record = parse_line(line);
        coverage.record(record.is_some());
        match record {
            Some(r) => records.push(r),
            None => debug!(line, "packages: skipping malformed line"),
        }
    }

    (records, coverage)
}

/// One package name per line.
pub fn parse_user_installed(stdout: &str) -> (BTreeSet<String>, Coverage) {
    let mut names = BTreeSet::new();
    let mut coverage = Coverage::default();

    for line in data_lines(stdout) {
        if is_metadata_banner(line) {
            continue;
        }

        let valid = !line.contains(char::is_whitespace);
        coverage.record(valid);
        if valid {
            names.insert(line.to_string());
        } else {
            debug!(line, "packages: skipping malformed userinstalled line");
        }
    }

    (names, coverage)
}

fn parse_line(line: &str) -> Option<PackageRecord> {
    let mut fields = line.splitn(4, '|');
    let name = fields.next()?.trim();
    let version = fields.next()?.trim();
    let size_bytes = fields.next()?.trim().parse::<u64>().ok()?;
    let repository = normalize_repo(fields.next()?);

    if name.is_empty() || version.is_empty() {
        return None;
    }

    Some(PackageRecord {
        name: name.to_string(),
        version: version.to_string(),
        size_bytes,
        repository,
    })
}
