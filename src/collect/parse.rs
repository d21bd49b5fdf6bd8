//! Shared helpers for dnf/rpm text output.

/// Architectures rpm attaches to `name.arch` identifiers.
const ARCHES: &[&str] = &[
    "x86_64", "noarch", "i686", "i386", "aarch64", "ppc64le", "s390x", "armv7hl", "src",
];

/// A parsed `name-[epoch:]version-release.arch` identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nevra {
    pub name: String,
    /// `[epoch:]version-release`
    pub evr: String,
    pub arch: Option<String>,
}

pub fn parse_nevra(s: &str) -> Option<Nevra> {
    let s = s.trim();
    let (rest, arch) = match s.rsplit_once('.') {
        Some((rest, arch)) if ARCHES.contains(&arch) => (rest, Some(arch.to_string())),
        _ => (s, None),
    };

    let mut parts = rest.rsplitn(3, '-');
    let release = parts.next()?;
    let version = parts.next()?;
    let name = parts.next()?;

    if name.is_empty() || version.is_empty() || release.is_empty() {
        return None;
    }

    Some(Nevra {
        name: name.to_string(),
        evr: format!("{version}-{release}"),
        arch,
    })
}

/// `bash.x86_64` -> `bash`. Names without a known arch suffix pass through.
pub fn strip_arch(name_arch: &str) -> &str {
    match name_arch.rsplit_once('.') {
        Some((name, arch)) if ARCHES.contains(&arch) && !name.is_empty() => name,
        _ => name_arch,
    }
}

/// Non-blank lines, trimmed.
pub fn data_lines(output: &str) -> impl Iterator<Item = &str> {
    output.lines().map(str::trim).filter(|l| !l.is_empty())
}

/// dnf prints this banner on almost every repo-touching command.
pub fn is_metadata_banner(line: &str) -> bool {
    line.starts_with("Last metadata expiration check")
        || line.starts_with("Updating and loading repositories")
        || line.starts_with("Repositories loaded")
}

/// Repository names from `%{from_repo}` come in a few spellings.
pub fn normalize_repo(repo: &str) -> String {
    let repo = repo.trim().trim_start_matches('@');
    match repo {
        "" | "(none)" | "<unknown>" | "unknown" => "unknown".to_string(),
        other => other.to_string(),
    }
}
