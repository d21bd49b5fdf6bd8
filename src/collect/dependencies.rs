//! Dependency problems.
//!
//! `dnf check` reports broken requires, conflicts and obsoletes, one
//! `NEVRA description` per line, and exits non-zero when it finds any.
//! `dnf repoquery --duplicates` lists every installed NEVRA of packages that
//! have more than one version installed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::parse::{data_lines, is_metadata_banner, parse_nevra};
use super::{ensure_parsed, first_line, run_checked, Collected, CollectionError, Collector, Coverage};
use crate::config::AnalysisConfig;
use crate::exec::{display_command, CommandRunner};

const CHECK: &[&str] = &["check"];
const DUPLICATES: &[&str] = &["repoquery", "--duplicates"];
/// `dnf check` exit code when it found problems, and also on any other failure.
const PROBLEMS_FOUND: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Broken,
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyIssue {
    pub package: String,
    pub kind: IssueKind,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyReport {
    pub broken: usize,
    pub duplicates: usize,
    pub issues: Vec<DependencyIssue>,
}

impl DependencyReport {
    pub fn from_issues(issues: Vec<DependencyIssue>) -> Self {
        DependencyReport {
            broken: issues.iter().filter(|i| i.kind == IssueKind::Broken).count(),
            duplicates: issues.iter().filter(|i| i.kind == IssueKind::Duplicate).count(),
            issues,
        }
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

pub struct DependenciesCollector;

impl Collector for DependenciesCollector {
    type Output = DependencyReport;

    fn name(&self) -> &'static str {
        "dependencies"
    }

    fn enabled(&self, analysis: &AnalysisConfig) -> bool {
        analysis.include_dependencies
    }

    fn collect(
        &self,
        runner: &dyn CommandRunner,
        _analysis: &AnalysisConfig,
    ) -> Result<Collected<DependencyReport>, CollectionError> {
        let output = run_checked(runner, "dnf", CHECK, &[0, PROBLEMS_FOUND])?;
        let (mut issues, check_coverage) = parse_check(&output.stdout);
        ensure_parsed("dnf", CHECK, check_coverage)?;

        // exit 1 without a single problem line is a failed check, not a clean one
        if output.exit_code == Some(PROBLEMS_FOUND) && issues.is_empty() {
            return Err(CollectionError::CommandFailed {
                command: display_command("dnf", CHECK),
                status: format!("exit code {PROBLEMS_FOUND}"),
                stderr: first_line(&output.stderr),
            });
        }

        let output = run_checked(runner, "dnf", DUPLICATES, &[0])?;
        let (duplicates, duplicate_coverage) = parse_duplicates(&output.stdout);
        ensure_parsed("dnf", DUPLICATES, duplicate_coverage)?;
        issues.extend(duplicates);

        Ok(Collected {
            data: DependencyReport::from_issues(issues),
            coverage: check_coverage.merge(duplicate_coverage),
        })
    }
}

pub fn parse_check(stdout: &str) -> (Vec<DependencyIssue>, Coverage) {
    let mut issues = Vec::new();
    let mut coverage = Coverage::default();

    for line in data_lines(stdout) {
        if is_metadata_banner(line) || line.starts_with("Error:") {
            continue;
        }

        let issue = line.split_once(char::is_whitespace).and_then(|(nevra, rest)| {
            let nevra = parse_nevra(nevra)?;
            let description = rest.trim();
            (!description.is_empty()).then(|| DependencyIssue {
                package: nevra.name,
                kind: IssueKind::Broken,
                description: description.to_string(),
            })
        });

        coverage.record(issue.is_some());
        match issue {
            Some(i) => issues.push(i),
            None => debug!(line, "dependencies: skipping malformed check line"),
        }
    }

    (issues, coverage)
}

/// One `Duplicate` issue per package name, listing every installed version.
pub fn parse_duplicates(stdout: &str) -> (Vec<DependencyIssue>, Coverage) {
    let mut by_name: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut coverage = Coverage::default();

    for line in data_lines(stdout) {
        if is_metadata_banner(line) {
            continue;
        }

        let nevra = parse_nevra(line);
        coverage.record(nevra.is_some());
        match nevra {
            Some(n) => by_name.entry(n.name).or_default().push(n.evr),
            None => debug!(line, "dependencies: skipping malformed duplicate line"),
        }
    }

    let issues = by_name
        .into_iter()
        .map(|(package, versions)| DependencyIssue {
            package,
            kind: IssueKind::Duplicate,
            description: format!("multiple versions installed: {}", versions.join(", ")),
        })
        .collect();

    (issues, coverage)
}
