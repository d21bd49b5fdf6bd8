//! Terminal summary printed after a collection run.
//!
//! - headline numbers per category
//! - unavailable or partial categories
//! - derived issues, warnings first
//! - the largest installed packages

use crate::collect::Coverage;
use crate::snapshot::{Section, Severity, Snapshot};
use crate::util::{format_bytes, truncate};

const LARGEST_SHOWN: usize = 5;
const ISSUES_SHOWN: usize = 5;

pub fn render(snapshot: &Snapshot) -> String {
    let mut output = String::new();

    output.push_str("\nPackage analysis\n");
    output.push_str(&"-".repeat(44));
    output.push('\n');

    if let Some(section) = &snapshot.packages {
        row(&mut output, "installed packages", section, |p| {
            format!("{} ({})", p.total_count, format_bytes(p.total_size_bytes))
        });
    }
    if let Some(section) = &snapshot.updates {
        row(&mut output, "pending updates", section, |u| {
            format!("{} ({} security)", u.total, u.security_count)
        });
    }
    if let Some(section) = &snapshot.orphans {
        row(&mut output, "orphaned packages", section, |o| {
            format!("{} ({})", o.count, format_bytes(o.reclaimable_bytes))
        });
    }
    if let Some(section) = &snapshot.cache {
        row(&mut output, "dnf cache", section, |c| format_bytes(c.total_bytes));
    }
    if let Some(section) = &snapshot.dependencies {
        row(&mut output, "dependency issues", section, |d| d.issues.len().to_string());
    }

    if let Some(inventory) = snapshot.packages.as_ref().and_then(Section::data) {
        let largest = inventory.largest(LARGEST_SHOWN);
        if !largest.is_empty() {
            output.push_str("\nLargest packages\n");
            output.push_str(&"-".repeat(44));
            output.push('\n');
            for p in largest {
                output.push_str(&format!(
                    "  {:30} {:>10}\n",
                    truncate(&p.name, 30),
                    format_bytes(p.size_bytes)
                ));
            }
        }
    }

    if snapshot.issues.is_empty() {
        output.push_str("\nNo problems detected.\n");
    } else {
        output.push_str(&format!("\nProblems detected ({}):\n", snapshot.issues.len()));

        let mut issues: Vec<_> = snapshot.issues.iter().collect();
        issues.sort_by_key(|i| std::cmp::Reverse(i.severity));

        for issue in issues.iter().take(ISSUES_SHOWN) {
            let marker = match issue.severity {
                Severity::Warning => "[warn]",
                Severity::Info => "[info]",
            };
            output.push_str(&format!("  {marker} {}\n", issue.message));
        }
        if issues.len() > ISSUES_SHOWN {
            output.push_str(&format!("  ... and {} more\n", issues.len() - ISSUES_SHOWN));
        }
    }

    output
}

fn row<T>(output: &mut String, label: &str, section: &Section<T>, describe: impl Fn(&T) -> String) {
    let value = match section {
        Section::Ok { data, coverage } => with_coverage(describe(data), coverage),
        Section::Unavailable { .. } => "unavailable".to_string(),
    };
    output.push_str(&format!("  {label:20} {value}\n"));
}

fn with_coverage(value: String, coverage: &Coverage) -> String {
    if coverage.is_complete() {
        value
    } else {
        format!("{value} [partial: {}/{} lines]", coverage.parsed, coverage.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::packages::{PackageInventory, PackageRecord};
    use crate::platform::HostInfo;
    use crate::snapshot::{Category, Issue};
    use chrono::{TimeZone, Utc};

    fn snapshot() -> Snapshot {
        Snapshot::empty(
            Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap(),
            HostInfo { hostname: "box".into(), os_release: None, kernel: None },
        )
    }

    #[test]
    fn empty_snapshot_has_no_problems() {
        let out = render(&snapshot());
        assert!(out.contains("No problems detected."));
        assert!(!out.contains("installed packages"));
    }

    #[test]
    fn rows_and_warnings_first() {
        let mut s = snapshot();
        s.packages = Some(Section::Ok {
            data: PackageInventory::from_records(vec![PackageRecord {
                name: "firefox".into(),
                version: "126.0-1.fc40".into(),
                size_bytes: 250 * 1024 * 1024,
                repository: "updates".into(),
            }]),
            coverage: Coverage { parsed: 1, total: 2 },
        });
        s.orphans = Some(Section::Unavailable { reason: "boom".into() });
        s.issues = vec![
            Issue { category: Category::Packages, severity: Severity::Info, message: "info first in list".into() },
            Issue { category: Category::Orphans, severity: Severity::Warning, message: "warning".into() },
        ];

        let out = render(&s);
        assert!(out.contains("installed packages   1 (250.0 MB) [partial: 1/2 lines]"));
        assert!(out.contains("orphaned packages    unavailable"));
        assert!(out.contains("firefox"));
        let warn_at = out.find("[warn] warning").unwrap();
        let info_at = out.find("[info] info first in list").unwrap();
        assert!(warn_at < info_at);
    }
}
