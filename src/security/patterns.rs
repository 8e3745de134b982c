//! Attack signature detection for request paths.
//!
//! # Design Decisions
//! - Substring matching, no regex, so evaluation is linear in the path
//! - Every signature is checked; callers get the full list of matches
//! - Tokens like `select` or `/var/` inside a legitimate slug are false
//!   positives. That cost is accepted at the edge.

/// SQL keywords that count as an injection attempt when followed by whitespace.
const SQL_KEYWORDS: [&str; 6] = ["union", "select", "insert", "update", "delete", "drop"];

const SHELL_METACHARACTERS: [char; 4] = [';', '&', '`', '|'];

const SCRIPT_MARKERS: [&str; 2] = ["<script", "javascript:"];

const SENSITIVE_ROOTS: [&str; 3] = ["/etc/", "/var/", "/usr/"];

/// A class of attack signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuspiciousPattern {
    /// `..`
    DirectoryTraversal,
    /// `;`, `&`, backtick, `|`
    ShellMetacharacter,
    /// `union`/`select`/`insert`/`update`/`delete`/`drop` then whitespace.
    SqlKeyword,
    /// `<script` or `javascript:`.
    ScriptInjection,
    /// `/etc/`, `/var/`, `/usr/`.
    SensitivePath,
}

impl SuspiciousPattern {
    pub const ALL: [SuspiciousPattern; 5] = [
        SuspiciousPattern::DirectoryTraversal,
        SuspiciousPattern::ShellMetacharacter,
        SuspiciousPattern::SqlKeyword,
        SuspiciousPattern::ScriptInjection,
        SuspiciousPattern::SensitivePath,
    ];

    /// Whether `path` contains this signature.
    pub fn matches(self, path: &str) -> bool {
        match self {
            SuspiciousPattern::DirectoryTraversal => path.contains(".."),
            SuspiciousPattern::ShellMetacharacter => path.contains(SHELL_METACHARACTERS),
            SuspiciousPattern::SqlKeyword => contains_sql_keyword(&path.to_ascii_lowercase()),
            SuspiciousPattern::ScriptInjection => {
                let lower = path.to_ascii_lowercase();
                SCRIPT_MARKERS.iter().any(|m| lower.contains(m))
            }
            SuspiciousPattern::SensitivePath => {
                let lower = path.to_ascii_lowercase();
                SENSITIVE_ROOTS.iter().any(|r| lower.contains(r))
            }
        }
    }

    /// Stable label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            SuspiciousPattern::DirectoryTraversal => "directory_traversal",
            SuspiciousPattern::ShellMetacharacter => "shell_metacharacter",
            SuspiciousPattern::SqlKeyword => "sql_keyword",
            SuspiciousPattern::ScriptInjection => "script_injection",
            SuspiciousPattern::SensitivePath => "sensitive_path",
        }
    }
}

fn contains_sql_keyword(lower: &str) -> bool {
    SQL_KEYWORDS.iter().any(|keyword| {
        lower.match_indices(keyword).any(|(idx, _)| {
            lower[idx + keyword.len()..]
                .chars()
                .next()
                .is_some_and(char::is_whitespace)
        })
    })
}

/// Every signature found in `path`.
pub fn matched_patterns(path: &str) -> Vec<SuspiciousPattern> {
    SuspiciousPattern::ALL
        .into_iter()
        .filter(|pattern| pattern.matches(path))
        .collect()
}

/// True if `path` contains any attack signature.
pub fn is_suspicious(path: &str) -> bool {
    !matched_patterns(path).is_empty()
}
