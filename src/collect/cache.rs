//! DNF cache size.
//!
//! Walks the cache directory directly instead of shelling out to `du`, so a
//! permission error on one subdirectory costs only that subtree.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use super::{Collected, CollectionError, Collector, Coverage};
use crate::config::AnalysisConfig;
use crate::exec::CommandRunner;

/// Above this the report suggests `dnf clean all`.
pub const CLEAN_THRESHOLD_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInfo {
    pub path: PathBuf,
    pub total_bytes: u64,
    pub file_count: u64,
    pub can_clean: bool,
}

pub struct CacheCollector;

impl Collector for CacheCollector {
    type Output = CacheInfo;

    fn name(&self) -> &'static str {
        "cache"
    }

    fn enabled(&self, analysis: &AnalysisConfig) -> bool {
        analysis.include_cache
    }

    fn collect(
        &self,
        _runner: &dyn CommandRunner,
        analysis: &AnalysisConfig,
    ) -> Result<Collected<CacheInfo>, CollectionError> {
        measure(&analysis.cache_dir)
    }
}

pub fn measure(path: &Path) -> Result<Collected<CacheInfo>, CollectionError> {
    if !path.is_dir() {
        return Err(CollectionError::Missing(path.to_path_buf()));
    }

    let mut total_bytes = 0u64;
    let mut file_count = 0u64;
    let mut coverage = Coverage::default();

    for entry in WalkDir::new(path).follow_links(false) {
        match entry {
            Ok(entry) => {
                if !entry.file_type().is_file() {
                    coverage.record(true);
                    continue;
                }
                match entry.metadata() {
                    Ok(metadata) => {
                        total_bytes = total_bytes.saturating_add(metadata.len());
                        file_count += 1;
                        coverage.record(true);
                    }
                    Err(e) => {
                        debug!(path = %entry.path().display(), error = %e, "cache: unreadable entry");
                        coverage.record(false);
                    }
                }
            }
            Err(e) => {
                debug!(
                    path = %e.path().map(|p| p.display().to_string()).unwrap_or_else(|| "unknown path".to_string()),
                    error = %e,
                    "cache: walk error"
                );
                coverage.record(false);
            }
        }
    }

    Ok(Collected {
        data: CacheInfo {
            path: path.to_path_buf(),
            total_bytes,
            file_count,
            can_clean: total_bytes > CLEAN_THRESHOLD_BYTES,
        },
        coverage,
    })
}
