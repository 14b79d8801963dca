//! Line-oriented bulk rule format.
//!
//! ```text
//! prepend,<url-or-domain>,<prefix>
//! replace,<url-or-domain>,<old>,<new>
//! ```
//!
//! Fields are trimmed and blank lines are ignored. The first bad line rejects the batch.

use crate::error::FixerError;
use crate::fixer::Fixer;
use crate::url::extract_domain;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Parses a whole batch. Later lines for the same domain replace earlier ones.
///
/// # Errors
/// [`FixerError::Import`] with the 1-based number of the first offending line.
pub fn parse_rules(text: &str) -> Result<BTreeMap<String, Fixer>, FixerError> {
    let mut rules = BTreeMap::new();

    for (index, raw) in text.split('\n').enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let (domain, fixer) = parse_line(line).map_err(|message| FixerError::Import {
            line: index + 1,
            message,
            context: Some(format!("'{line}'").into()),
        })?;
        rules.insert(domain, fixer);
    }

    Ok(rules)
}

fn parse_line(line: &str) -> Result<(String, Fixer), Cow<'static, str>> {
    let cols: Vec<&str> = line.split(',').map(str::trim).collect();

    let fixer = match cols.as_slice() {
        ["prepend", _, prefix] => Fixer::Prepend { prefix: (*prefix).to_owned() },
        ["replace", _, old, new] => Fixer::Replace { old: (*old).to_owned(), new: (*new).to_owned() },
        ["prepend", ..] => {
            return Err("invalid prepend fixer format, expected 'prepend,<domain>,<prefix>'".into());
        },
        ["replace", ..] => {
            return Err("invalid replace fixer format, expected 'replace,<domain>,<old>,<new>'".into());
        },
        [kind, ..] => return Err(format!("unknown fixer type '{kind}'").into()),
        [] => return Err("empty line".into()),
    };

    let domain = extract_domain(cols[1]);
    if domain.is_empty() {
        return Err(format!("invalid domain '{}'", cols[1]).into());
    }
    fixer.validate().map_err(|e| Cow::Owned(e.to_string()))?;

    Ok((domain, fixer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_kinds() {
        let rules = parse_rules(
            "prepend, https://www.Instagram.com/p/1 , vx\r\nreplace,twitter.com,twitter.com,fxtwitter.com\n",
        )
        .unwrap();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules["instagram.com"], Fixer::Prepend { prefix: "vx".to_owned() });
        assert_eq!(
            rules["twitter.com"],
            Fixer::Replace { old: "twitter.com".to_owned(), new: "fxtwitter.com".to_owned() }
        );
    }

    #[test]
    fn blank_lines_are_skipped() {
        let rules = parse_rules("\n\nprepend,a.com,x\n   \n").unwrap();
        assert_eq!(rules.len(), 1);
        assert!(parse_rules("").unwrap().is_empty());
    }

    #[test]
    fn last_duplicate_wins() {
        let rules = parse_rules("prepend,a.com,first\nprepend,www.a.com,second").unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules["a.com"], Fixer::Prepend { prefix: "second".to_owned() });
    }

    #[test]
    fn bad_line_is_reported_by_number() {
        let err = parse_rules("replace,twitter.com,old,new\nbadline").unwrap_err();
        assert!(matches!(err, FixerError::Import { line: 2, .. }));
        assert!(err.to_string().contains("badline"));
    }

    #[test]
    fn every_rejection_reason() {
        for (text, line) in [
            ("prepend,a.com", 1),
            ("replace,a.com,old", 1),
            ("prepend,a.com,x\nreplace,a.com,a,b,c", 2),
            ("prepend,not a domain,x", 1),
            ("prepend,a.com,", 1),
            ("replace,a.com,,new", 1),
            ("Prepend,a.com,x", 1),
        ] {
            let err = parse_rules(text).unwrap_err();
            assert!(matches!(err, FixerError::Import { line: l, .. } if l == line), "{text}: {err}");
        }
    }
}
