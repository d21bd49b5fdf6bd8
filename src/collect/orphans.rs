//! Orphaned packages: installed as dependencies, no longer required by
//! anything. Read from `dnf repoquery --unneeded`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::parse::{data_lines, is_metadata_banner};
use super::{ensure_parsed, run_checked, Collected, CollectionError, Collector, Coverage};
use crate::config::AnalysisConfig;
use crate::exec::CommandRunner;

const PROGRAM: &str = "dnf";
const ARGS: &[&str] = &["repoquery", "--unneeded", "--queryformat", "%{name}|%{installsize}\\n"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanRecord {
    pub name: String,
    pub reclaimable_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanSummary {
    pub count: usize,
    pub reclaimable_bytes: u64,
    pub orphans: Vec<OrphanRecord>,
}

impl OrphanSummary {
    pub fn from_records(orphans: Vec<OrphanRecord>) -> Self {
        OrphanSummary {
            count: orphans.len(),
            reclaimable_bytes: orphans
                .iter()
                .fold(0u64, |acc, o| acc.saturating_add(o.reclaimable_bytes)),
            orphans,
        }
    }
}

pub struct OrphansCollector;

impl Collector for OrphansCollector {
    type Output = OrphanSummary;

    fn name(&self) -> &'static str {
        "orphans"
    }

    fn enabled(&self, analysis: &AnalysisConfig) -> bool {
        analysis.include_orphans
    }

    fn collect(
        &self,
        runner: &dyn CommandRunner,
        _analysis: &AnalysisConfig,
    ) -> Result<Collected<OrphanSummary>, CollectionError> {
        let output = run_checked(runner, PROGRAM, ARGS, &[0])?;
        let (records, coverage) = parse_orphans(&output.stdout);
        ensure_parsed(PROGRAM, ARGS, coverage)?;

        Ok(Collected {
            data: OrphanSummary::from_records(records),
            coverage,
        })
    }
}

pub fn parse_orphans(stdout: &str) -> (Vec<OrphanRecord>, Coverage) {
    let mut records = Vec::new();
    let mut coverage = Coverage::default();

    for line in data_lines(stdout) {
        if is_metadata_banner(line) {
            continue;
        }

        let record = line.split_once('|').and_then(|(name, size)| {
            let name = name.trim();
            let reclaimable_bytes = size.trim().parse::<u64>().ok()?;
            (!name.is_empty()).then(|| OrphanRecord {
                name: name.to_string(),
                reclaimable_bytes,
            })
        });

        coverage.record(record.is_some());
        match record {
            Some(r) => records.push(r),
            None => debug!(line, "orphans: skipping malformed line"),
        }
    }

    (records, coverage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_orphans_and_sums_sizes() {
        let (records, coverage) = parse_orphans("libfoo|1024\nlibbar|2048\nlibbaz|lots\n");
        assert_eq!(coverage, Coverage { parsed: 2, total: 3 });
        let summary = OrphanSummary::from_records(records);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.reclaimable_bytes, 3072);
        assert_eq!(summary.orphans[0].name, "libfoo");
    }

    #[test]
    fn no_orphans() {
        let (records, coverage) = parse_orphans("\n");
        assert!(records.is_empty());
        assert_eq!(coverage, Coverage::default());
    }
}
