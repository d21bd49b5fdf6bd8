//! Prompt construction.
//!
//! Pure function of the snapshot: the same snapshot and sample limit always
//! give the same text. Package, update, orphan and dependency lists are cut
//! to the first N in collection order, with a note saying how many were left
//! out.

use std::fmt::Write;

use crate::collect::packages::PackageRecord;
use crate::snapshot::{Section, Severity, Snapshot};
use crate::util::format_bytes;

const INSTRUCTIONS: &str = "\
You are an expert Linux administrator specialising in Fedora and DNF/RPM package management.
Analyse the package metrics below and write an interpretive, human-friendly assessment.
Explain what the numbers mean for this machine, not just what they are, and give practical
advice with real dnf commands.";

const RESPONSE_FORMAT: &str = r#"Respond with JSON only, no markdown, using exactly this structure:
{
  "executive_summary": "2-3 paragraphs on the overall state of the package system",
  "package_analysis": "interpretation of the installed packages: count, total size, explicit versus dependency installs",
  "update_analysis": "pending updates, how urgent the security updates are, what to do",
  "orphan_analysis": "orphaned packages, whether removing them is worthwhile and how",
  "cache_analysis": "DNF cache size and whether and when to clean it",
  "dependency_analysis": "dependency problems and duplicated packages and how to fix them",
  "recommendations": [
    {
      "priority": "high | medium | low",
      "title": "short title",
      "description": "explanation",
      "commands": ["sudo dnf ..."]
    }
  ],
  "conclusion": "1-2 paragraphs summarising the state and next steps"
}
Separate paragraphs with a blank line. Use null for "commands" when no command applies."#;

/// The first `limit` records and how many were dropped.
#[derive(Debug, PartialEq, Eq)]
pub struct Sample<'a, T> {
    pub shown: &'a [T],
    pub omitted: usize,
}

pub fn sample<T>(records: &[T], limit: usize) -> Sample<'_, T> {
    let shown = &records[..records.len().min(limit)];
    Sample {
        shown,
        omitted: records.len() - shown.len(),
    }
}

pub fn build(snapshot: &Snapshot, max_packages_sample: usize) -> String {
    let mut out = String::new();

    out.push_str(INSTRUCTIONS);
    out.push_str("\n\nSYSTEM\n");
    let _ = writeln!(out, "Host: {}", snapshot.host.hostname);
    if let Some(os) = &snapshot.host.os_release {
        let _ = writeln!(out, "OS: {os}");
    }
    if let Some(kernel) = &snapshot.host.kernel {
        let _ = writeln!(out, "Kernel: {kernel}");
    }
    let _ = writeln!(out, "Collected at: {}", snapshot.timestamp.to_rfc3339());

    write_packages(&mut out, snapshot, max_packages_sample);
    write_updates(&mut out, snapshot, max_packages_sample);
    write_orphans(&mut out, snapshot, max_packages_sample);
    write_cache(&mut out, snapshot);
    write_dependencies(&mut out, snapshot, max_packages_sample);

    if !snapshot.issues.is_empty() {
        out.push_str("\nDETECTED ISSUES\n");
        for issue in &snapshot.issues {
            let label = match issue.severity {
                Severity::Warning => "warning",
                Severity::Info => "info",
            };
            let _ = writeln!(out, "- [{label}] {}", issue.message);
        }
    }

    out.push('\n');
    out.push_str(RESPONSE_FORMAT);
    out.push('\n');
    out
}

/// Header line plus an availability note. Returns the data when there is some.
fn section_header<'a, T>(out: &mut String, title: &str, section: Option<&'a Section<T>>) -> Option<&'a T> {
    let _ = writeln!(out, "\n{title}");
    match section {
        None => {
            out.push_str("Not collected (disabled in configuration).\n");
            None
        }
        Some(Section::Unavailable { reason }) => {
            let _ = writeln!(out, "Unavailable: {reason}");
            None
        }
        Some(Section::Ok { data, coverage }) => {
            if !coverage.is_complete() {
                let _ = writeln!(
                    out,
                    "Note: incomplete data, parsed {} of {} output lines.",
                    coverage.parsed, coverage.total
                );
            }
            Some(data)
        }
    }
}

fn write_packages(out: &mut String, snapshot: &Snapshot, limit: usize) {
    let Some(inventory) = section_header(out, "INSTALLED PACKAGES", snapshot.packages.as_ref()) else {
        return;
    };

    let _ = writeln!(
        out,
        "Installed packages: {} (total installed size {})",
        inventory.total_count,
        format_bytes(inventory.total_size_bytes)
    );
    let _ = writeln!(
        out,
        "Installed on request: {}. Pulled in as dependencies: {}.",
        inventory.user_installed, inventory.dependency_installed
    );
    if let Some(largest) = inventory.packages.iter().map(|p| p.size_bytes).max() {
        let _ = writeln!(out, "Largest single package: {}", format_bytes(largest));
    }

    let sample = sample(&inventory.packages, limit);
    if !sample.shown.is_empty() {
        let _ = writeln!(out, "Package sample (first {} in listing order):", sample.shown.len());
        for p in sample.shown {
            write_package(out, p);
        }
    }
    if sample.omitted > 0 {
        let _ = writeln!(out, "... {} more packages omitted", sample.omitted);
    }
}

fn write_package(out: &mut String, p: &PackageRecord) {
    let _ = writeln!(
        out,
        "- {} {} ({}, from {})",
        p.name,
        p.version,
        format_bytes(p.size_bytes),
        p.repository
    );
}

fn write_updates(out: &mut String, snapshot: &Snapshot, limit: usize) {
    let Some(updates) = section_header(out, "PENDING UPDATES", snapshot.updates.as_ref()) else {
        return;
    };

    let _ = writeln!(
        out,
        "Pending updates: {}, including {} security updates.",
        updates.total, updates.security_count
    );

    let sample = sample(&updates.updates, limit);
    for u in sample.shown {
        let _ = writeln!(
            out,
            "- {} {} -> {} ({}){}",
            u.name,
            u.current_version.as_deref().unwrap_or("?"),
            u.candidate_version,
            u.repository,
            if u.security { " [security]" } else { "" }
        );
    }
    if sample.omitted > 0 {
        let _ = writeln!(out, "... {} more updates omitted", sample.omitted);
    }
}

fn write_orphans(out: &mut String, snapshot: &Snapshot, limit: usize) {
    let Some(orphans) = section_header(out, "ORPHANED PACKAGES", snapshot.orphans.as_ref()) else {
        return;
    };

    let _ = writeln!(
        out,
        "Orphaned packages: {} ({} reclaimable)",
        orphans.count,
        format_bytes(orphans.reclaimable_bytes)
    );

    let sample = sample(&orphans.orphans, limit);
    for o in sample.shown {
        let _ = writeln!(out, "- {} ({})", o.name, format_bytes(o.reclaimable_bytes));
    }
    if sample.omitted > 0 {
        let _ = writeln!(out, "... {} more orphans omitted", sample.omitted);
    }
}

fn write_cache(out: &mut String, snapshot: &Snapshot) {
    let Some(cache) = section_header(out, "DNF CACHE", snapshot.cache.as_ref()) else {
        return;
    };

    let _ = writeln!(
        out,
        "Cache at {}: {} in {} files{}",
        cache.path.display(),
        format_bytes(cache.total_bytes),
        cache.file_count,
        if cache.can_clean { " (larger than 100 MB, cleaning suggested)" } else { "" }
    );
}

fn write_dependencies(out: &mut String, snapshot: &Snapshot, limit: usize) {
    let Some(deps) = section_header(out, "DEPENDENCIES", snapshot.dependencies.as_ref()) else {
        return;
    };

    let _ = writeln!(
        out,
        "Broken dependency problems: {}. Packages with duplicate versions: {}.",
        deps.broken, deps.duplicates
    );

    let sample = sample(&deps.issues, limit);
    for issue in sample.shown {
        let _ = writeln!(out, "- {}: {}", issue.package, issue.description);
    }
    if sample.omitted > 0 {
        let _ = writeln!(out, "... {} more dependency issues omitted", sample.omitted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::packages::PackageInventory;
    use crate::collect::Coverage;
    use crate::platform::HostInfo;
    use chrono::{TimeZone, Utc};

    fn snapshot() -> Snapshot {
        Snapshot::empty(
            Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap(),
            HostInfo { hostname: "box".into(), os_release: None, kernel: None },
        )
    }

    #[test]
    fn sample_takes_first_n() {
        let records = [1, 2, 3, 4, 5];
        assert_eq!(sample(&records, 2), Sample { shown: &[1, 2][..], omitted: 3 });
        assert_eq!(sample(&records, 10), Sample { shown: &records[..], omitted: 0 });
    }

    #[test]
    fn disabled_and_unavailable_sections_are_labelled() {
        let mut s = snapshot();
        s.orphans = Some(Section::Unavailable { reason: "dnf: could not run".into() });
        let prompt = build(&s, 10);
        assert!(prompt.contains("INSTALLED PACKAGES\nNot collected (disabled in configuration)."));
        assert!(prompt.contains("ORPHANED PACKAGES\nUnavailable: dnf: could not run"));
    }

    #[test]
    fn incomplete_section_is_flagged() {
        let mut s = snapshot();
        s.packages = Some(Section::Ok {
            data: PackageInventory::from_records(Vec::new()),
            coverage: Coverage { parsed: 0, total: 0 },
        });
        assert!(!build(&s, 10).contains("incomplete"));

        s.packages = Some(Section::Ok {
            data: PackageInventory::from_records(Vec::new()),
            coverage: Coverage { parsed: 8, total: 10 },
        });
        assert!(build(&s, 10).contains("parsed 8 of 10 output lines"));
    }

    #[test]
    fn dependency_issues_are_capped() {
        use crate::collect::dependencies::{DependencyIssue, DependencyReport, IssueKind};

        let issues = (0..500)
            .map(|i| DependencyIssue {
                package: format!("dup-{i}"),
                kind: IssueKind::Duplicate,
                description: "multiple versions installed: 1-1, 1-2".into(),
            })
            .collect();
        let mut s = snapshot();
        s.dependencies = Some(Section::Ok {
            data: DependencyReport::from_issues(issues),
            coverage: Coverage { parsed: 1000, total: 1000 },
        });

        let prompt = build(&s, 2);
        assert_eq!(prompt.matches("multiple versions installed").count(), 2);
        assert!(prompt.contains("... 498 more dependency issues omitted"));
    }

    #[test]
    fn package_split_and_size_without_names() {
        use crate::collect::packages::PackageRecord;
        use std::collections::BTreeSet;

        let records = ["a", "b", "c"]
            .iter()
            .zip([10u64, 3 * 1024 * 1024, 20])
            .map(|(name, size)| PackageRecord {
                name: name.to_string(),
                version: "1-1".into(),
                size_bytes: size,
                repository: "fedora".into(),
            })
            .collect();
        let user: BTreeSet<String> = ["a".to_string()].into_iter().collect();
        let mut s = snapshot();
        s.packages = Some(Section::Ok {
            data: PackageInventory::from_records(records).with_user_installed(&user),
            coverage: Coverage { parsed: 3, total: 3 },
        });

        let prompt = build(&s, 1);
        assert!(prompt.contains("Installed on request: 1. Pulled in as dependencies: 2."));
        assert!(prompt.contains("Largest single package: 3.0 MB"));
        assert!(prompt.contains("- a 1-1"));
        assert!(!prompt.contains("- b 1-1"));
    }

    #[test]
    fn deterministic() {
        let s = snapshot();
        assert_eq!(build(&s, 5), build(&s, 5));
    }
}
