//! Report generation: snapshot in, HTML file out.
//!
//! Steps, each consuming the whole output of the previous one:
//! - load the latest snapshot (or an explicit one)
//! - build the prompt
//! - one model call
//! - parse the narrative and render the template
//! - write a new HTML file
//!
//! Any failure aborts before a file is written. The snapshot is never touched.

pub mod html;
pub mod summary;

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

use crate::ai::{GeminiClient, ModelClient};
use crate::config::Config;
use crate::error::Result;
use crate::narrative::Narrative;
use crate::prompt;
use crate::snapshot::{self, Snapshot};

/// Full report run with the model client configured from the environment.
pub fn run(config: &Config, snapshot_path: Option<&Path>) -> Result<PathBuf> {
    let (path, snapshot) = locate(config, snapshot_path)?;
    let client = GeminiClient::from_env(&config.ai)?;
    generate(config, &path, &snapshot, &client)
}

/// The snapshot named on the command line, or the newest in `output_dir`.
pub fn locate(config: &Config, snapshot_path: Option<&Path>) -> Result<(PathBuf, Snapshot)> {
    match snapshot_path {
        Some(path) => Ok((path.to_path_buf(), snapshot::load(path)?)),
        None => snapshot::latest_in(&config.output_dir),
    }
}

pub fn generate(
    config: &Config,
    snapshot_path: &Path,
    snapshot: &Snapshot,
    client: &dyn ModelClient,
) -> Result<PathBuf> {
    info!(
        snapshot = %snapshot_path.display(),
        packages = snapshot.summary.total_packages,
        updates = snapshot.summary.total_updates,
        issues = snapshot.summary.total_issues,
        "building report"
    );

    let template = html::load_template(config.template_path.as_deref())?;
    let prompt = prompt::build(snapshot, config.analysis.max_packages_sample);
    let text = client.generate(&prompt)?;
    let narrative = Narrative::from_model_text(&text);

    let rendered = html::render(snapshot, &narrative, &template);

    let stem = snapshot_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("packages");
    html::write(&rendered, &config.report_dir(), stem, Utc::now())
}
