//! Runs the enabled collectors and assembles one snapshot.
//!
//! A failing collector never aborts the run: its category is recorded as
//! `unavailable` with the reason, and the other categories carry on.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Local, Utc};
use tracing::{debug, info, warn};

use crate::collect::cache::CacheCollector;
use crate::collect::dependencies::DependenciesCollector;
use crate::collect::orphans::OrphansCollector;
use crate::collect::packages::PackagesCollector;
use crate::collect::updates::UpdatesCollector;
use crate::collect::Collector;
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use crate::platform::{self, HostInfo};
use crate::snapshot::{Category, Issue, Section, Severity, Snapshot, Summary, FILE_EXTENSION, FILE_PREFIX};
use crate::util::{create_unique, format_bytes};

/// More orphans than this is worth mentioning.
const ORPHAN_ALERT_THRESHOLD: usize = 10;

pub fn collect(analysis: &AnalysisConfig, runner: &dyn CommandRunner) -> Snapshot {
    collect_at(analysis, runner, Utc::now(), platform::host_info())
}

/// Same as `collect` with the run metadata supplied by the caller.
pub fn collect_at(
    analysis: &AnalysisConfig,
    runner: &dyn CommandRunner,
    timestamp: DateTime<Utc>,
    host: HostInfo,
) -> Snapshot {
    let start = Instant::now();
    let mut snapshot = Snapshot::empty(timestamp, host);

    snapshot.packages = run_collector(&PackagesCollector, runner, analysis);
    snapshot.updates = run_collector(&UpdatesCollector, runner, analysis);
    snapshot.orphans = run_collector(&OrphansCollector, runner, analysis);
    snapshot.cache = run_collector(&CacheCollector, runner, analysis);
    snapshot.dependencies = run_collector(&DependenciesCollector, runner, analysis);

    snapshot.issues = derive_issues(&snapshot);
    snapshot.summary = summarize(&snapshot);

    info!(
        issues = snapshot.issues.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "collection complete"
    );

    snapshot
}

fn run_collector<C: Collector>(
    collector: &C,
    runner: &dyn CommandRunner,
    analysis: &AnalysisConfig,
) -> Option<Section<C::Output>> {
    if !collector.enabled(analysis) {
        debug!(collector = collector.name(), "disabled in config");
        return None;
    }

    info!(collector = collector.name(), "collecting");
    let start = Instant::now();
    let result = collector.collect(runner, analysis);
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match &result {
        Ok(collected) if collected.coverage.is_complete() => info!(
            collector = collector.name(),
            lines = collected.coverage.total,
            elapsed_ms,
            "complete"
        ),
        Ok(collected) => warn!(
            collector = collector.name(),
            parsed = collected.coverage.parsed,
            total = collected.coverage.total,
            elapsed_ms,
            "complete with skipped lines"
        ),
        Err(e) => warn!(collector = collector.name(), error = %e, "unavailable"),
    }

    Some(result.into())
}

pub fn derive_issues(snapshot: &Snapshot) -> Vec<Issue> {
    let mut issues = Vec::new();

    check_section(&mut issues, Category::Packages, snapshot.packages.as_ref());

    check_section(&mut issues, Category::Updates, snapshot.updates.as_ref());
    if let Some(updates) = snapshot.updates.as_ref().and_then(Section::data) {
        if updates.total > 0 {
            issues.push(Issue {
                category: Category::Updates,
                severity: Severity::Info,
                message: format!("{} updates available", updates.total),
            });
        }
        if updates.security_count > 0 {
            issues.push(Issue {
                category: Category::Updates,
                severity: Severity::Warning,
                message: format!("{} security updates available", updates.security_count),
            });
        }
    }

    check_section(&mut issues, Category::Orphans, snapshot.orphans.as_ref());
    if let Some(orphans) = snapshot.orphans.as_ref().and_then(Section::data) {
        if orphans.count > ORPHAN_ALERT_THRESHOLD {
            issues.push(Issue {
                category: Category::Orphans,
                severity: Severity::Info,
                message: format!(
                    "{} orphaned packages detected ({} reclaimable)",
                    orphans.count,
                    format_bytes(orphans.reclaimable_bytes)
                ),
            });
        }
    }

    check_section(&mut issues, Category::Cache, snapshot.cache.as_ref());
    if let Some(cache) = snapshot.cache.as_ref().and_then(Section::data) {
        if cache.can_clean {
            issues.push(Issue {
                category: Category::Cache,
                severity: Severity::Info,
                message: format!("DNF cache is using {}", format_bytes(cache.total_bytes)),
            });
        }
    }

    check_section(&mut issues, Category::Dependencies, snapshot.dependencies.as_ref());
    if let Some(deps) = snapshot.dependencies.as_ref().and_then(Section::data) {
        if deps.has_issues() {
            issues.push(Issue {
                category: Category::Dependencies,
                severity: Severity::Warning,
                message: format!(
                    "dependency problems detected: {} broken, {} duplicated",
                    deps.broken, deps.duplicates
                ),
            });
        }
    }

    issues
}

fn check_section<T>(issues: &mut Vec<Issue>, category: Category, section: Option<&Section<T>>) {
    match section {
        Some(Section::Unavailable { reason }) => issues.push(Issue {
            category,
            severity: Severity::Warning,
            message: format!("{} metrics unavailable: {reason}", category.as_str()),
        }),
        Some(Section::Ok { coverage, .. }) if !coverage.is_complete() => issues.push(Issue {
            category,
            severity: Severity::Info,
            message: format!(
                "{} metrics incomplete: parsed {} of {} lines",
                category.as_str(),
                coverage.parsed,
                coverage.total
            ),
        }),
        _ => {}
    }
}

pub fn summarize(snapshot: &Snapshot) -> Summary {
    let packages = snapshot.packages.as_ref().and_then(Section::data);
    let updates = snapshot.updates.as_ref().and_then(Section::data);
    let orphans = snapshot.orphans.as_ref().and_then(Section::data);
    let cache = snapshot.cache.as_ref().and_then(Section::data);

    Summary {
        total_packages: packages.map(|p| p.total_count).unwrap_or(0),
        total_updates: updates.map(|u| u.total).unwrap_or(0),
        security_updates: updates.map(|u| u.security_count).unwrap_or(0),
        orphan_count: orphans.map(|o| o.count).unwrap_or(0),
        cache_bytes: cache.map(|c| c.total_bytes).unwrap_or(0),
        total_issues: snapshot.issues.len(),
    }
}

/// Write the snapshot into `dir` under a fresh timestamped name.
///
/// Existing files are never replaced; a second snapshot within the same
/// second gets a `_N` suffix, which still sorts after the first.
pub fn write(snapshot: &Snapshot, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    let json = snapshot
        .to_json()
        .map_err(|e| Error::io(dir, std::io::Error::other(e)))?;

    let stem = format!(
        "{FILE_PREFIX}{}",
        snapshot.timestamp.with_timezone(&Local).format("%Y%m%d_%H%M%S")
    );

    let mut contents = json.into_bytes();
    contents.push(b'\n');

    let path = create_unique(dir, &stem, FILE_EXTENSION, &contents).map_err(|e| Error::io(dir, e))?;
    info!(path = %path.display(), "snapshot written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::updates::{UpdateRecord, UpdateSummary};
    use crate::collect::Coverage;
    use crate::exec::CommandOutput;
    use chrono::TimeZone;

    struct NoCommands;

    impl CommandRunner for NoCommands {
        fn run(&self, program: &str, _args: &[&str]) -> std::io::Result<CommandOutput> {
            panic!("{program} should not run when every category is disabled");
        }
    }

    fn host() -> HostInfo {
        HostInfo { hostname: "box".into(), os_release: None, kernel: None }
    }

    #[test]
    fn all_disabled_yields_metadata_only() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let snapshot = collect_at(&AnalysisConfig::none(), &NoCommands, ts, host());

        assert_eq!(snapshot, Snapshot::empty(ts, host()));
        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert!(value.get("packages").is_none());
        assert!(value.get("issues").is_none());
        assert_eq!(value["host"]["hostname"], "box");
    }

    #[test]
    fn issues_cover_security_and_unavailable() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let mut snapshot = Snapshot::empty(ts, host());
        snapshot.updates = Some(Section::Ok {
            data: UpdateSummary::from_records(vec![UpdateRecord {
                name: "openssl".into(),
                current_version: Some("3.2.0-1".into()),
                candidate_version: "3.2.1-1".into(),
                repository: "updates".into(),
                security: true,
            }]),
            coverage: Coverage { parsed: 1, total: 2 },
        });
        snapshot.orphans = Some(Section::Unavailable { reason: "dnf: could not run".into() });

        let issues = derive_issues(&snapshot);
        let messages: Vec<_> = issues.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(
            messages,
            [
                "updates metrics incomplete: parsed 1 of 2 lines",
                "1 updates available",
                "1 security updates available",
                "orphans metrics unavailable: dnf: could not run",
            ]
        );
        assert_eq!(issues[2].severity, Severity::Warning);

        snapshot.issues = issues;
        let summary = summarize(&snapshot);
        assert_eq!(summary.security_updates, 1);
        assert_eq!(summary.total_issues, 4);
    }

    #[test]
    fn write_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let ts = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let snapshot = Snapshot::empty(ts, host());

        let first = write(&snapshot, dir.path()).unwrap();
        let second = write(&snapshot, dir.path()).unwrap();

        assert_ne!(first, second);
        assert!(second.file_name().unwrap().to_str().unwrap().ends_with("_001.json"));
        let (latest, _) = crate::snapshot::latest_in(dir.path()).unwrap();
        assert_eq!(latest, second);
    }

    #[test]
    fn write_into_unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a-file");
        std::fs::write(&file, "x").unwrap();
        let ts = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let result = write(&Snapshot::empty(ts, host()), &file.join("sub"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }
}
