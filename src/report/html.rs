//! HTML report rendering.
//!
//! Fills `{{NAME}}` placeholders in a template in a single pass, so text
//! coming from the model can never introduce new placeholders. All model
//! text is escaped; blank lines separate paragraphs.

use std::collections::HashMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use tracing::info;

use crate::error::{Error, Result};
use crate::narrative::{Narrative, Recommendation};
use crate::snapshot::{Section, Snapshot};
use crate::util::{create_unique, escape_html, format_bytes};

pub const DEFAULT_TEMPLATE: &str = include_str!("../../templates/report.html");

/// The configured template, or the built-in one.
pub fn load_template(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p).map_err(|e| Error::io(p, e)),
        None => Ok(DEFAULT_TEMPLATE.to_string()),
    }
}

pub fn render(snapshot: &Snapshot, narrative: &Narrative, template: &str) -> String {
    let mut values: HashMap<&str, String> = HashMap::new();

    values.insert(
        "TIMESTAMP",
        escape_html(
            &snapshot
                .timestamp
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        ),
    );
    values.insert("HOST", escape_html(&host_label(snapshot)));
    values.insert("METRIC_CARDS", metric_cards(snapshot));
    values.insert("EXECUTIVE_SUMMARY", paragraphs(&narrative.executive_summary));
    values.insert("PACKAGE_ANALYSIS", paragraphs(&narrative.package_analysis));
    values.insert("UPDATE_ANALYSIS", paragraphs(&narrative.update_analysis));
    values.insert("ORPHAN_ANALYSIS", paragraphs(&narrative.orphan_analysis));
    values.insert("CACHE_ANALYSIS", paragraphs(&narrative.cache_analysis));
    values.insert("DEPENDENCY_ANALYSIS", paragraphs(&narrative.dependency_analysis));
    values.insert("RECOMMENDATIONS", recommendations(&narrative.recommendations));
    values.insert("CONCLUSION", paragraphs(&narrative.conclusion));

    fill(template, &values)
}

/// Write the rendered report next to earlier ones, never replacing a file.
pub fn write(html: &str, report_dir: &Path, snapshot_stem: &str, now: DateTime<Utc>) -> Result<PathBuf> {
    std::fs::create_dir_all(report_dir).map_err(|e| Error::io(report_dir, e))?;

    let stem = format!(
        "{snapshot_stem}_report_{}",
        now.with_timezone(&Local).format("%Y%m%d_%H%M%S")
    );
    let path = create_unique(report_dir, &stem, "html", html.as_bytes())
        .map_err(|e| Error::io(report_dir, e))?;

    info!(path = %path.display(), "report written");
    Ok(path)
}

fn fill(template: &str, values: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len() * 2);
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        match after.find("}}") {
            Some(end) => {
                let key = &after[..end];
                match values.get(key) {
                    Some(value) => out.push_str(value),
                    // unknown placeholders stay visible
                    None => {
                        out.push_str("{{");
                        out.push_str(key);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

fn host_label(snapshot: &Snapshot) -> String {
    match &snapshot.host.os_release {
        Some(os) => format!("{} ({os})", snapshot.host.hostname),
        None => snapshot.host.hostname.clone(),
    }
}

fn paragraphs(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    let rendered: Vec<String> = normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>", escape_html(p).replace('\n', "<br>\n")))
        .collect();

    if rendered.is_empty() {
        "<p>No analysis provided.</p>".to_string()
    } else {
        rendered.join("\n")
    }
}

fn recommendations(recs: &[Recommendation]) -> String {
    if recs.is_empty() {
        return "<p>No recommendations.</p>".to_string();
    }

    let mut html = String::from("<ul class=\"recommendation-list\">\n");
    for rec in recs {
        let _ = writeln!(html, "<li class=\"priority-{}\">", rec.priority.as_str());
        let _ = writeln!(
            html,
            "<span class=\"priority\">{}</span><strong>{}</strong>",
            rec.priority.as_str(),
            escape_html(&rec.title)
        );
        if !rec.description.trim().is_empty() {
            let _ = writeln!(html, "{}", paragraphs(&rec.description));
        }
        if let Some(commands) = rec.commands.as_ref().filter(|c| !c.is_empty()) {
            html.push_str("<pre><code>");
            for cmd in commands {
                let _ = writeln!(html, "{}", escape_html(cmd));
            }
            html.push_str("</code></pre>\n");
        }
        html.push_str("</li>\n");
    }
    html.push_str("</ul>");
    html
}

struct Card {
    label: &'static str,
    value: String,
    subtext: String,
    available: bool,
}

/// Built from the snapshot itself, not from the model.
fn metric_cards(snapshot: &Snapshot) -> String {
    let mut cards = Vec::new();

    if let Some(section) = &snapshot.packages {
        cards.push(card("Installed packages", section, |p| {
            (p.total_count.to_string(), format_bytes(p.total_size_bytes))
        }));
    }
    if let Some(section) = &snapshot.updates {
        cards.push(card("Pending updates", section, |u| {
            (u.total.to_string(), format!("{} security", u.security_count))
        }));
    }
    if let Some(section) = &snapshot.orphans {
        cards.push(card("Orphaned packages", section, |o| {
            (o.count.to_string(), format!("{} reclaimable", format_bytes(o.reclaimable_bytes)))
        }));
    }
    if let Some(section) = &snapshot.cache {
        cards.push(card("DNF cache", section, |c| {
            let note = if c.can_clean { "cleaning suggested" } else { "within limits" };
            (format_bytes(c.total_bytes), note.to_string())
        }));
    }
    if let Some(section) = &snapshot.dependencies {
        cards.push(card("Dependency issues", section, |d| {
            (
                d.issues.len().to_string(),
                format!("{} broken, {} duplicated", d.broken, d.duplicates),
            )
        }));
    }

    let mut html = String::new();
    for c in cards {
        let class = if c.available { "metric-card" } else { "metric-card unavailable" };
        let _ = writeln!(
            html,
            "      <div class=\"{class}\">\n        <div class=\"label\">{}</div>\n        <div class=\"value\">{}</div>\n        <div class=\"subtext\">{}</div>\n      </div>",
            c.label,
            escape_html(&c.value),
            escape_html(&c.subtext)
        );
    }
    html
}

fn card<T>(label: &'static str, section: &Section<T>, describe: impl Fn(&T) -> (String, String)) -> Card {
    match section {
        Section::Ok { data, coverage } => {
            let (value, mut subtext) = describe(data);
            if !coverage.is_complete() {
                subtext.push_str(" (partial data)");
            }
            Card { label, value, subtext, available: true }
        }
        Section::Unavailable { reason } => Card {
            label,
            value: "n/a".to_string(),
            subtext: reason.clone(),
            available: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::updates::{UpdateRecord, UpdateSummary};
    use crate::collect::Coverage;
    use crate::narrative::Priority;
    use crate::platform::HostInfo;
    use chrono::TimeZone;

    fn snapshot() -> Snapshot {
        let mut s = Snapshot::empty(
            Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap(),
            HostInfo { hostname: "box".into(), os_release: Some("Fedora Linux 40".into()), kernel: None },
        );
        s.updates = Some(Section::Ok {
            data: UpdateSummary::from_records(vec![UpdateRecord {
                name: "openssl".into(),
                current_version: None,
                candidate_version: "3.2.1-1".into(),
                repository: "updates".into(),
                security: true,
            }]),
            coverage: Coverage { parsed: 1, total: 1 },
        });
        s.orphans = Some(Section::Unavailable { reason: "dnf <missing>".into() });
        s
    }

    #[test]
    fn fill_is_single_pass() {
        let mut values = HashMap::new();
        values.insert("A", "{{B}}".to_string());
        values.insert("B", "bee".to_string());
        assert_eq!(fill("x {{A}} y {{B}} {{C}} {{open", &values), "x {{B}} y bee {{C}} {{open");
    }

    #[test]
    fn paragraphs_are_escaped_and_split() {
        assert_eq!(paragraphs("one\n\n<two>\nlines"), "<p>one</p>\n<p>&lt;two&gt;<br>\nlines</p>");
        assert_eq!(paragraphs("   "), "<p>No analysis provided.</p>");
    }

    #[test]
    fn cards_come_from_snapshot() {
        let html = metric_cards(&snapshot());
        assert!(html.contains("Pending updates"));
        assert!(html.contains("1 security"));
        assert!(html.contains("metric-card unavailable"));
        assert!(html.contains("dnf &lt;missing&gt;"));
        assert!(!html.contains("Installed packages"));
    }

    #[test]
    fn render_fills_every_placeholder() {
        let narrative = Narrative {
            executive_summary: "Healthy <mostly>.".into(),
            recommendations: vec![Recommendation {
                priority: Priority::High,
                title: "Apply security updates".into(),
                description: "openssl is out of date".into(),
                commands: Some(vec!["sudo dnf upgrade --security".into()]),
            }],
            ..Narrative::default()
        };

        let html = render(&snapshot(), &narrative, DEFAULT_TEMPLATE);
        assert!(!html.contains("{{"));
        assert!(html.contains("<p>Healthy &lt;mostly&gt;.</p>"));
        assert!(html.contains("<li class=\"priority-high\">"));
        assert!(html.contains("sudo dnf upgrade --security"));
        assert!(html.contains("box (Fedora Linux 40)"));
    }

    #[test]
    fn write_creates_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let first = write("<html></html>", dir.path(), "packages_20261018_120000", now).unwrap();
        let second = write("<html></html>", dir.path(), "packages_20261018_120000", now).unwrap();
        assert_ne!(first, second);
        assert!(first.file_name().unwrap().to_str().unwrap().starts_with("packages_20261018_120000_report_"));
    }
}
