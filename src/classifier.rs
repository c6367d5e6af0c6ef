// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Suspicious path classifier.
//!
//! Scanners probe for dotfiles, admin panels and CMS entry points that this
//! service has never served. Any request path matching the static set is
//! answered with a plain 404 before upload parsing begins.

use tracing::debug;

/// How a pattern is compared against a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// Path equals the literal
    Exact(String),
    /// Path starts with the literal
    Prefix(String),
    /// Path contains the literal anywhere
    Contains(String),
}

impl PathPattern {
    fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(lit) => path == lit,
            Self::Prefix(lit) => path.starts_with(lit.as_str()),
            Self::Contains(lit) => path.contains(lit.as_str()),
        }
    }

    fn normalized(self) -> Self {
        match self {
            Self::Exact(lit) => Self::Exact(lit.to_ascii_lowercase()),
            Self::Prefix(lit) => Self::Prefix(lit.to_ascii_lowercase()),
            Self::Contains(lit) => Self::Contains(lit.to_ascii_lowercase()),
        }
    }
}

/// Read-only set of suspicious path patterns.
#[derive(Debug, Clone)]
pub struct SuspiciousPathSet {
    patterns: Vec<PathPattern>,
}

impl SuspiciousPathSet {
    pub fn new(patterns: impl IntoIterator<Item = PathPattern>) -> Self {
        Self {
            patterns: patterns.into_iter().map(PathPattern::normalized).collect(),
        }
    }

    /// True if any pattern matches. Comparison ignores ASCII case.
    pub fn is_suspicious(&self, path: &str) -> bool {
        let path = path.to_ascii_lowercase();
        let hit = self.patterns.iter().any(|p| p.matches(&path));
        if hit {
            debug!(path = %path, "Suspicious path matched");
        }
        hit
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for SuspiciousPathSet {
    fn default() -> Self {
        use PathPattern::{Contains, Exact, Prefix};

        let contains = [
            "/.env", "/.git", "/.svn", "/.hg", "/.aws", "/.ssh", "/.ds_store", "/.htaccess",
            "/.htpasswd", "/.vscode", "/.idea", "/wp-config", "/phpinfo",
        ];
        let prefixes = [
            "/wp-admin",
            "/wp-login",
            "/wp-content",
            "/wp-includes",
            "/phpmyadmin",
            "/pma/",
            "/cgi-bin",
            "/admin.php",
            "/administrator",
            "/vendor/phpunit",
            "/actuator",
            "/server-status",
            "/boaform",
            "/hnap1",
            "/owa/",
        ];
        let exact = [
            "/xmlrpc.php",
            "/config.php",
            "/config.json",
            "/config.yml",
            "/backup.sql",
            "/db.sql",
            "/dump.sql",
            "/shell.php",
            "/pma",
            "/owa",
        ];

        Self::new(
            contains
                .iter()
                .map(|s| Contains(s.to_string()))
                .chain(prefixes.iter().map(|s| Prefix(s.to_string())))
                .chain(exact.iter().map(|s| Exact(s.to_string()))),
        )
    }
}
