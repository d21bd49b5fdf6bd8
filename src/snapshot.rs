//! Snapshot model and loader.
//!
//! One JSON file per collection run, named `packages_<YYYYmmdd_HHMMSS>.json`.
//! Names sort in time order, so the latest snapshot is found with a plain
//! directory scan and no index file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collect::cache::CacheInfo;
use crate::collect::dependencies::DependencyReport;
use crate::collect::orphans::OrphanSummary;
use crate::collect::packages::PackageInventory;
use crate::collect::updates::UpdateSummary;
use crate::collect::{Collected, CollectionError, Coverage};
use crate::error::{Error, Result};
use crate::platform::HostInfo;

pub const SCHEMA_VERSION: u32 = 1;
pub const FILE_PREFIX: &str = "packages_";
pub const FILE_EXTENSION: &str = "json";

/// One metric category: either fully collected or marked unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Section<T> {
    Ok { data: T, coverage: Coverage },
    Unavailable { reason: String },
}

impl<T> Section<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            Section::Ok { data, .. } => Some(data),
            Section::Unavailable { .. } => None,
        }
    }
}

impl<T> From<std::result::Result<Collected<T>, CollectionError>> for Section<T> {
    fn from(result: std::result::Result<Collected<T>, CollectionError>) -> Self {
        match result {
            Ok(collected) => Section::Ok {
                data: collected.data,
                coverage: collected.coverage,
            },
            Err(e) => Section::Unavailable { reason: e.to_string() },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Packages,
    Updates,
    Orphans,
    Cache,
    Dependencies,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Packages => "packages",
            Category::Updates => "updates",
            Category::Orphans => "orphans",
            Category::Cache => "cache",
            Category::Dependencies => "dependencies",
        }
    }
}

/// An alert derived from the collected metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub category: Category,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_packages: usize,
    pub total_updates: usize,
    pub security_updates: usize,
    pub orphan_count: usize,
    pub cache_bytes: u64,
    pub total_issues: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,
    pub timestamp: DateTime<Utc>,
    pub host: HostInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packages: Option<Section<PackageInventory>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updates: Option<Section<UpdateSummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orphans: Option<Section<OrphanSummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<Section<CacheInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Section<DependencyReport>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub summary: Summary,
}

impl Snapshot {
    /// A snapshot with no categories collected.
    pub fn empty(timestamp: DateTime<Utc>, host: HostInfo) -> Self {
        Snapshot {
            schema_version: SCHEMA_VERSION,
            timestamp,
            host,
            packages: None,
            updates: None,
            orphans: None,
            cache: None,
            dependencies: None,
            issues: Vec::new(),
            summary: Summary::default(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Read one snapshot file.
pub fn load(path: &Path) -> Result<Snapshot> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(path.to_path_buf())
        } else {
            Error::io(path, e)
        }
    })?;

    Snapshot::from_json(&raw).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// All snapshot files in `dir`, oldest first.
pub fn list(dir: &Path) -> Result<Vec<PathBuf>> {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io(dir, e)),
    };

    let mut files: Vec<PathBuf> = read_dir
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_snapshot_file(path))
        .collect();

    files.sort();
    Ok(files)
}

/// Load the newest snapshot in `dir`.
pub fn latest_in(dir: &Path) -> Result<(PathBuf, Snapshot)> {
    let path = list(dir)?
        .pop()
        .ok_or_else(|| Error::NotFound(dir.to_path_buf()))?;

    debug!(path = %path.display(), "loading latest snapshot");
    let snapshot = load(&path)?;
    Ok((path, snapshot))
}

fn is_snapshot_file(path: &Path) -> bool {
    let name_ok = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(FILE_PREFIX));
    let ext_ok = path.extension().and_then(|e| e.to_str()) == Some(FILE_EXTENSION);
    name_ok && ext_ok
}
