use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    const GIB: u64 = 1024 * 1024 * 1024;

    if bytes >= GIB {
        format!("{:.1} GB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

/// Writes `contents` to `dir/<stem>.<ext>`, or `<stem>_NNN.<ext>` when that
/// name is taken. Never replaces an existing file. The zero-padded suffix
/// keeps name order equal to creation order.
pub fn create_unique(dir: &Path, stem: &str, ext: &str, contents: &[u8]) -> std::io::Result<PathBuf> {
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("{stem}.{ext}")
        } else {
            format!("{stem}_{attempt:03}.{ext}")
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(contents)?;
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(150 * 1024 * 1024), "150.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"a\" & 'b'</b>"), "&lt;b&gt;&quot;a&quot; &amp; &#39;b&#39;&lt;/b&gt;");
    }

    #[test]
    fn test_create_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = create_unique(dir.path(), "report", "html", b"a").unwrap();
        let b = create_unique(dir.path(), "report", "html", b"b").unwrap();
        assert!(a.ends_with("report.html"));
        assert!(b.ends_with("report_001.html"));
        assert_eq!(std::fs::read(&a).unwrap(), b"a");
    }

    #[test]
    fn create_unique_names_sort_in_creation_order() {
        let dir = tempfile::tempdir().unwrap();
        let created: Vec<PathBuf> = (0..12)
            .map(|_| create_unique(dir.path(), "packages_20261018_120000", "json", b"{}").unwrap())
            .collect();

        let mut sorted = created.clone();
        sorted.sort();
        assert_eq!(sorted, created);
        assert!(created[11].ends_with("packages_20261018_120000_011.json"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-very-long-package-name", 10), "a-very-...");
    }
}
