//! Policy document handling shared by the IAM and S3 reports.

use super::error::{DescribeError, Result};
use percent_encoding::percent_decode_str;

/// Placeholder document for AWS-managed policies attached to a principal.
pub const SKIPPED_DOCUMENT: &str = "SKIPPED";

/// Decode a policy document and pretty-print it with two-space indentation.
///
/// IAM returns documents URL-encoded (query style, so `+` is a space); S3
/// returns them raw, which is what `url_encoded = false` is for. Only
/// whitespace outside strings changes: key order, duplicate keys and escape
/// sequences come out as they went in.
pub fn decode_policy_document(document: &str, url_encoded: bool) -> Result<String> {
    let decoded = if url_encoded {
        let spaced = document.replace('+', " ");
        percent_decode_str(&spaced)
            .decode_utf8()
            .map_err(|e| DescribeError::Document(e.to_string()))?
            .into_owned()
    } else {
        document.to_string()
    };
    serde_json::from_str::<serde::de::IgnoredAny>(&decoded).map_err(|e| DescribeError::Document(e.to_string()))?;
    Ok(indent_json(&decoded))
}

fn push_newline(out: &mut String, depth: usize) {
    out.push('\n');
    for _ in 0..depth {
        out.push_str("  ");
    }
}

/// Re-indent a valid JSON text. Empty objects and arrays stay `{}` and `[]`.
fn indent_json(source: &str) -> String {
    let mut out = String::with_capacity(source.len() * 2);
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    // an opening bracket whose first member has not been seen yet
    let mut opened = false;
    for c in source.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if matches!(c, ' ' | '\t' | '\n' | '\r') {
            continue;
        }
        if opened && c != '}' && c != ']' {
            opened = false;
            depth += 1;
            push_newline(&mut out, depth);
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '{' | '[' => {
                out.push(c);
                opened = true;
            }
            '}' | ']' => {
                if opened {
                    opened = false;
                } else {
                    depth = depth.saturating_sub(1);
                    push_newline(&mut out, depth);
                }
                out.push(c);
            }
            ',' => {
                out.push(c);
                push_newline(&mut out, depth);
            }
            ':' => out.push_str(": "),
            _ => out.push(c),
        }
    }
    out
}

/// Substring filter over fetched documents: no filters keeps everything,
/// otherwise any single match keeps the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    needles: Vec<String>,
}

impl DocumentFilter {
    pub fn new(needles: Vec<String>) -> Self {
        Self {
            needles: needles.into_iter().filter(|n| !n.is_empty()).collect(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.needles.is_empty()
    }

    pub fn matches(&self, document: &str) -> bool {
        !self.is_active() || self.needles.iter().any(|needle| document.contains(needle.as_str()))
    }
}

/// What a principal-level report asks for besides the bare listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentOptions {
    pub include: bool,
    pub filter: DocumentFilter,
}

impl DocumentOptions {
    pub fn new(include: bool, needles: Vec<String>) -> Result<Self> {
        let filter = DocumentFilter::new(needles);
        if filter.is_active() && !include {
            return Err(DescribeError::InvalidArgument {
                value: "--document-filter without --document".to_string(),
                valid: "--document --document-filter <TEXT>".to_string(),
            });
        }
        Ok(Self { include, filter })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decodes_iam_document_and_keeps_key_order() {
        let encoded = "%7B%22Version%22%3A%222012-10-17%22%2C%22Statement%22%3A%5B%7B%22Effect%22%3A%22Allow%22%2C%22Action%22%3A%22s3%3AGetObject%22%7D%5D%7D";
        let doc = decode_policy_document(encoded, true).unwrap();
        assert_eq!(
            doc,
            r#"{
  "Version": "2012-10-17",
  "Statement": [
    {
      "Effect": "Allow",
      "Action": "s3:GetObject"
    }
  ]
}"#
        );
    }

    #[test]
    fn test_indent_keeps_duplicates_escapes_and_empty_containers() {
        let raw = r#" {"Sid":"\u0041\/b", "Sid" :1,"Condition":{},"Resource":[ ],"Nested":[{"a":[1,2]}]} "#;
        let doc = decode_policy_document(raw, false).unwrap();
        assert_eq!(
            doc,
            r#"{
  "Sid": "\u0041\/b",
  "Sid": 1,
  "Condition": {},
  "Resource": [],
  "Nested": [
    {
      "a": [
        1,
        2
      ]
    }
  ]
}"#
        );
    }

    #[test]
    fn test_plus_decodes_to_space() {
        let doc = decode_policy_document("%7B%22Sid%22%3A%22Read+Only%22%7D", true).unwrap();
        assert!(doc.contains("\"Read Only\""));
    }

    #[test]
    fn test_raw_documents_are_not_unescaped() {
        let doc = decode_policy_document(r#"{"Sid":"a%20b"}"#, false).unwrap();
        assert!(doc.contains("a%20b"));
    }

    #[test]
    fn test_invalid_json_is_document_error() {
        assert!(matches!(
            decode_policy_document("not-json", false),
            Err(DescribeError::Document(_))
        ));
    }

    #[test]
    fn test_filter_matches_any_needle() {
        let filter = DocumentFilter::new(vec!["s3:*".to_string(), "iam:PassRole".to_string()]);
        assert!(filter.matches(r#""Action": "iam:PassRole""#));
        assert!(!filter.matches(r#""Action": "ec2:*""#));
        assert!(DocumentFilter::default().matches("anything"));
    }

    #[test]
    fn test_filter_requires_document_inclusion() {
        assert!(DocumentOptions::new(false, vec!["x".to_string()]).is_err());
        assert!(DocumentOptions::new(true, vec!["x".to_string()]).is_ok());
        assert!(DocumentOptions::new(false, Vec::new()).is_ok());
    }
}
