use std::path::Path;

use serde::{Deserialize, Serialize};

/// Identifies the machine a snapshot was taken on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_release: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel: Option<String>,
}

pub fn host_info() -> HostInfo {
    HostInfo {
        hostname: local_hostname(),
        os_release: std::fs::read_to_string("/etc/os-release")
            .ok()
            .and_then(|raw| pretty_name(&raw)),
        kernel: read_trimmed(Path::new("/proc/sys/kernel/osrelease")),
    }
}

fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn read_trimmed(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts PRETTY_NAME from os-release(5) contents.
fn pretty_name(os_release: &str) -> Option<String> {
    os_release.lines().find_map(|line| {
        let value = line.strip_prefix("PRETTY_NAME=")?;
        let value = value.trim().trim_matches('"').trim_matches('\'');
        (!value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_name_strips_quotes() {
        let raw = "NAME=\"Fedora Linux\"\nPRETTY_NAME=\"Fedora Linux 40 (Workstation Edition)\"\nID=fedora\n";
        assert_eq!(pretty_name(raw).as_deref(), Some("Fedora Linux 40 (Workstation Edition)"));
    }

    #[test]
    fn pretty_name_missing() {
        assert_eq!(pretty_name("ID=fedora\n"), None);
    }

    #[test]
    fn host_info_always_has_a_hostname() {
        assert!(!host_info().hostname.is_empty());
    }

    #[test]
    fn hostname_comes_from_the_system() {
        let expected = hostname::get().unwrap().to_string_lossy().trim().to_string();
        if !expected.is_empty() {
            assert_eq!(local_hostname(), expected);
        }
    }
}
