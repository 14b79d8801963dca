//! Self-describing record format of a stored [`Fixer`].
//!
//! ```text
//! {"tag":"RegexReplace","fields":{"pattern":"...","replacement":"..."}}
//! ```
//!
//! Both functions are stateless; every call works on its own buffer.

use crate::error::StoreError;
use crate::fixer::Fixer;

/// # Errors
/// [`StoreError::Encoding`] if serialization fails.
pub fn encode(fixer: &Fixer) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec(fixer)?)
}

/// Decodes exactly `bytes`. Unknown tags and missing fields are errors.
///
/// # Errors
/// [`StoreError::Encoding`] for anything that is not a valid record.
pub fn decode(bytes: &[u8]) -> Result<Fixer, StoreError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_fixer() -> impl Strategy<Value = Fixer> {
        prop_oneof![
            (any::<String>(), any::<String>()).prop_map(|(old, new)| Fixer::Replace { old, new }),
            (any::<String>(), any::<String>())
                .prop_map(|(pattern, replacement)| Fixer::RegexReplace { pattern, replacement }),
            any::<String>().prop_map(|prefix| Fixer::Prepend { prefix }),
        ]
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(fixer in any_fixer()) {
            let bytes = encode(&fixer).unwrap();
            prop_assert_eq!(decode(&bytes).unwrap(), fixer);
        }
    }

    #[test]
    fn record_carries_tag_and_fields() {
        let fixer = Fixer::Replace { old: "twitter.com".to_owned(), new: "fxtwitter.com".to_owned() };
        let json: serde_json::Value = serde_json::from_slice(&encode(&fixer).unwrap()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"tag": "Replace", "fields": {"old": "twitter.com", "new": "fxtwitter.com"}})
        );
    }

    #[test]
    fn unknown_tag_is_an_error() {
        let record = br#"{"tag":"Append","fields":{"suffix":"x"}}"#;
        assert!(matches!(decode(record), Err(StoreError::Encoding { .. })));
    }

    #[test]
    fn malformed_records_are_errors() {
        for record in [
            &br#"{"tag":"Prepend","fields":{}}"#[..],
            br#"{"tag":"Prepend"}"#,
            br#"{"fields":{"prefix":"vx"}}"#,
            b"\x00\x01garbage",
            b"",
        ] {
            assert!(decode(record).is_err(), "{}", String::from_utf8_lossy(record));
        }
    }

    #[test]
    fn decode_reads_only_its_input() {
        let a = encode(&Fixer::Prepend { prefix: "a".to_owned() }).unwrap();
        let b = encode(&Fixer::Prepend { prefix: "b".to_owned() }).unwrap();

        assert_eq!(decode(&b).unwrap(), Fixer::Prepend { prefix: "b".to_owned() });
        assert_eq!(decode(&a).unwrap(), Fixer::Prepend { prefix: "a".to_owned() });
    }
}
