//! The closed set of URL transformations.

use crate::error::FixerError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::error;

/// A transformation applied to a URL whose domain has a registered rule.
///
/// Serialized adjacently tagged, e.g.
/// `{"tag":"Replace","fields":{"old":"twitter.com","new":"fxtwitter.com"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "tag", content = "fields", deny_unknown_fields)]
pub enum Fixer {
    /// Replaces every occurrence of `old` with `new`.
    Replace { old: String, new: String },
    /// Replaces every match of `pattern`; `replacement` may use `$1` or `${name}`.
    RegexReplace { pattern: String, replacement: String },
    /// Puts `prefix` in front of the whole URL.
    Prepend { prefix: String },
}

impl Fixer {
    /// Applies the transformation.
    ///
    /// Total: an uncompilable regex yields an empty string instead of failing. Rules
    /// registered through [`crate::LinkFixer`] are validated, so this only happens for
    /// hand-crafted values.
    #[must_use]
    pub fn fix(&self, url: &str) -> String {
        match self {
            Self::Replace { old, new } => url.replace(old.as_str(), new),
            Self::RegexReplace { pattern, replacement } => match Regex::new(pattern) {
                Ok(re) => re.replace_all(url, replacement.as_str()).into_owned(),
                Err(e) => {
                    error!(%pattern, error = %e, "Could not compile fixer regex");
                    String::new()
                },
            },
            Self::Prepend { prefix } => format!("{prefix}{url}"),
        }
    }

    /// Human-readable summary, e.g. `replace 'a' with 'b'`.
    #[must_use]
    pub fn describe(&self) -> String {
        self.to_string()
    }

    #[must_use]
    pub const fn kind(&self) -> FixerKind {
        match self {
            Self::Replace { .. } => FixerKind::Replace,
            Self::RegexReplace { .. } => FixerKind::RegexReplace,
            Self::Prepend { .. } => FixerKind::Prepend,
        }
    }

    /// Checks the fields a rule needs before it may be stored.
    ///
    /// # Errors
    /// [`FixerError::Validation`] for an empty `old`, `pattern` or `prefix`;
    /// [`FixerError::Pattern`] when the regex does not compile.
    pub fn validate(&self) -> Result<(), FixerError> {
        match self {
            Self::Replace { old, .. } if old.is_empty() => {
                Err(FixerError::validation("replace fixer needs a non-empty 'old'"))
            },
            Self::RegexReplace { pattern, .. } if pattern.is_empty() => {
                Err(FixerError::validation("regex replace fixer needs a non-empty 'pattern'"))
            },
            Self::RegexReplace { pattern, .. } => {
                Regex::new(pattern).map(drop).map_err(|source| FixerError::Pattern {
                    source,
                    context: Some(format!("pattern '{pattern}'").into()),
                })
            },
            Self::Prepend { prefix } if prefix.is_empty() => {
                Err(FixerError::validation("prepend fixer needs a non-empty 'prefix'"))
            },
            Self::Replace { .. } | Self::Prepend { .. } => Ok(()),
        }
    }
}

impl fmt::Display for Fixer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace { old, new } => write!(f, "replace '{old}' with '{new}'"),
            Self::RegexReplace { pattern, replacement } => {
                write!(f, "regex replace '{pattern}' with '{replacement}'")
            },
            Self::Prepend { prefix } => write!(f, "prepend '{prefix}'"),
        }
    }
}

/// Names a [`Fixer`] variant without its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixerKind {
    Replace,
    RegexReplace,
    Prepend,
}

impl FixerKind {
    pub const ALL: [Self; 3] = [Self::Replace, Self::RegexReplace, Self::Prepend];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::RegexReplace => "regex-replace",
            Self::Prepend => "prepend",
        }
    }
}

impl fmt::Display for FixerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FixerKind {
    type Err = FixerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| FixerError::validation(format!("unknown fixer kind '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replace(old: &str, new: &str) -> Fixer {
        Fixer::Replace { old: old.to_owned(), new: new.to_owned() }
    }

    #[test]
    fn replace_hits_every_occurrence() {
        let fixer = replace("x.com", "fixupx.com");
        assert_eq!(fixer.fix("https://x.com/a?r=x.com"), "https://fixupx.com/a?r=fixupx.com");
        assert_eq!(fixer.fix("https://example.org"), "https://example.org");
    }

    #[test]
    fn regex_replace_expands_groups() {
        let fixer = Fixer::RegexReplace {
            pattern: r"https://(www\.)?reddit\.com/(.*)".to_owned(),
            replacement: "https://old.reddit.com/$2".to_owned(),
        };
        assert_eq!(fixer.fix("https://www.reddit.com/r/rust"), "https://old.reddit.com/r/rust");
    }

    #[test]
    fn broken_regex_degrades_to_empty() {
        let fixer = Fixer::RegexReplace { pattern: "(".to_owned(), replacement: "x".to_owned() };
        assert_eq!(fixer.fix("https://example.com"), "");
        assert!(matches!(fixer.validate(), Err(FixerError::Pattern { .. })));
    }

    #[test]
    fn prepend_keeps_url_intact() {
        let fixer = Fixer::Prepend { prefix: "vx".to_owned() };
        assert_eq!(fixer.fix("http://instagram.com/p/xyz"), "vxhttp://instagram.com/p/xyz");
    }

    #[test]
    fn fix_is_repeatable() {
        let fixer = replace("twitter.com", "fxtwitter.com");
        let url = "https://twitter.com/u/status/1";
        assert_eq!(fixer.fix(url), fixer.fix(url));
    }

    #[test]
    fn descriptions() {
        assert_eq!(replace("a", "b").describe(), "replace 'a' with 'b'");
        assert_eq!(
            Fixer::RegexReplace { pattern: "p".to_owned(), replacement: "r".to_owned() }
                .to_string(),
            "regex replace 'p' with 'r'"
        );
        assert_eq!(Fixer::Prepend { prefix: "vx".to_owned() }.describe(), "prepend 'vx'");
    }

    #[test]
    fn validation_rejects_empty_fields() {
        assert!(replace("", "b").validate().is_err());
        assert!(replace("a", "").validate().is_ok());
        assert!(Fixer::Prepend { prefix: String::new() }.validate().is_err());
        assert!(
            Fixer::RegexReplace { pattern: String::new(), replacement: "r".to_owned() }
                .validate()
                .is_err()
        );
    }

    #[test]
    fn kinds_parse_and_print() {
        for kind in FixerKind::ALL {
            assert_eq!(kind.to_string().parse::<FixerKind>().unwrap(), kind);
        }
        assert_eq!(" Prepend ".parse::<FixerKind>().unwrap(), FixerKind::Prepend);
        assert!("append".parse::<FixerKind>().is_err());
        assert_eq!(replace("a", "b").kind(), FixerKind::Replace);
    }
}
