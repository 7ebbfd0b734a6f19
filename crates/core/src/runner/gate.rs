//! Allow/block policy applied to shell command lines.
//!
//! A non-empty allow-list is exclusive: the line runs iff it matches one of
//! the patterns and the block-list is not consulted. Otherwise the line is
//! rejected when it contains any blocked word (case-insensitive substring),
//! and allowed only while shell execution is globally enabled.

use regex::{Regex, RegexBuilder};

use crate::error::CoreError;
use crate::settings::ShellSettings;

/// Always blocked when no allow-list is configured.
pub const BASELINE_BLOCKED: &[&str] = &[
    "rm", "rmdir", "del", "format", "fdisk", "mkfs", "dd", "shutdown", "reboot", "halt",
    "poweroff", "passwd", "su", "sudo", "chmod", "chown", "kill", "killall", "pkill",
];

/// Error reported for any rejected line.
pub const REJECTION_MESSAGE: &str = "Command not allowed or contains blocked operations.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    /// An allow-list exists and nothing in it matched.
    NotAllowListed,
    /// The line contains this blocked word.
    Blocked(String),
    ShellDisabled,
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

#[derive(Debug, Clone)]
pub struct ShellGate {
    enabled: bool,
    allowed: Vec<Regex>,
    /// Lowercased.
    blocked: Vec<String>,
}

impl ShellGate {
    /// Compile the configured allow patterns. An invalid pattern is a
    /// configuration error.
    pub fn new(settings: &ShellSettings) -> Result<Self, CoreError> {
        let allowed = settings
            .allowed_patterns
            .iter()
            .map(|p| compile_pattern(p))
            .collect::<Result<Vec<_>, _>>()?;

        let blocked = BASELINE_BLOCKED
            .iter()
            .map(|w| w.to_string())
            .chain(settings.blocked_commands.iter().cloned())
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        Ok(Self {
            enabled: settings.enabled,
            allowed,
            blocked,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn evaluate(&self, line: &str) -> GateDecision {
        if !self.allowed.is_empty() {
            return if self.allowed.iter().any(|re| re.is_match(line)) {
                GateDecision::Allowed
            } else {
                GateDecision::NotAllowListed
            };
        }

        let lowered = line.to_lowercase();
        if let Some(word) = self.blocked.iter().find(|w| lowered.contains(w.as_str())) {
            return GateDecision::Blocked(word.clone());
        }

        if self.enabled {
            GateDecision::Allowed
        } else {
            GateDecision::ShellDisabled
        }
    }

    pub fn is_allowed(&self, line: &str) -> bool {
        self.evaluate(line).is_allowed()
    }
}

/// Compile an allow pattern. `/body/flags` delimiters are accepted, with
/// flags from `imsxu`; anything else is compiled as a bare regex.
pub fn compile_pattern(pattern: &str) -> Result<Regex, CoreError> {
    let invalid = |e: regex::Error| {
        CoreError::InvalidConfiguration(format!("invalid shell pattern {pattern:?}: {e}"))
    };

    let delimited = pattern
        .strip_prefix('/')
        .and_then(|rest| rest.rfind('/').map(|end| (&rest[..end], &rest[end + 1..])));

    let Some((body, flags)) = delimited else {
        return Regex::new(pattern).map_err(invalid);
    };

    let mut builder = RegexBuilder::new(body);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            'u' => builder.unicode(true),
            other => {
                return Err(CoreError::InvalidConfiguration(format!(
                    "unsupported flag '{other}' in shell pattern {pattern:?}"
                )))
            }
        };
    }
    builder.build().map_err(invalid)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
