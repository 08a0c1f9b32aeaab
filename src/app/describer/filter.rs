//! Filter expression compiler.
//!
//! Turns the free-form `--filter` string into a validated list of
//! [`Criterion`] values. The expression is relaxed JSON (JSON5): keys may be
//! unquoted, strings single-quoted, trailing commas are allowed and the outer
//! array brackets are optional.
//!
//! ```text
//! {Name: 'tag:Env', Values: ['prod', 'stg']}, {name: "vpc-id", values: ["vpc-1"]}
//! ```

use super::error::{DescribeError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// A single `{name, values}` filter sent to a describe call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub name: String,
    pub values: Vec<String>,
}

impl Criterion {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Deserialize)]
struct RawCriterion {
    #[serde(default, alias = "Name")]
    name: String,
    #[serde(default, alias = "Values")]
    values: Vec<String>,
}

impl RawCriterion {
    fn validate(self, position: usize) -> Result<Criterion> {
        if self.name.is_empty() {
            return Err(DescribeError::Validation {
                position,
                name: self.name,
                reason: "empty name in filter string",
            });
        }
        if self.values.is_empty() {
            return Err(DescribeError::Validation {
                position,
                name: self.name,
                reason: "empty values in filter string",
            });
        }
        Ok(Criterion {
            name: self.name,
            values: self.values,
        })
    }
}

/// Compile a filter expression. Either every criterion is valid or the whole
/// call fails; an empty expression yields no criteria.
pub fn compile(expression: &str) -> Result<Vec<Criterion>> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Ok(Vec::new());
    }
    let wrapped = wrap_array(expression);
    let raw: Vec<RawCriterion> =
        json5::from_str(&wrapped).map_err(|e| DescribeError::Parse(e.to_string()))?;
    let criteria = raw
        .into_iter()
        .enumerate()
        .map(|(position, criterion)| criterion.validate(position))
        .collect::<Result<Vec<_>>>()?;
    log_debug!("compiled {} filter criteria", criteria.len());
    Ok(criteria)
}

fn wrap_array(expression: &str) -> Cow<'_, str> {
    if expression.starts_with('[') && expression.ends_with(']') {
        Cow::Borrowed(expression)
    } else {
        Cow::Owned(format!("[{}]", expression))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wrapping_is_idempotent() {
        let bare = "{Name: 'tag:Env', Values: ['prod']}";
        let wrapped = "[{Name: 'tag:Env', Values: ['prod']}]";
        assert_eq!(compile(bare).unwrap(), compile(wrapped).unwrap());
        assert_eq!(
            compile(bare).unwrap(),
            vec![Criterion::new("tag:Env", ["prod"])]
        );
    }

    #[test]
    fn test_accepts_both_field_spellings() {
        let criteria = compile(r#"{"name": "vpc-id", "values": ["vpc-1", "vpc-2"]}, {Name: "state", Values: ["available"],}"#).unwrap();
        assert_eq!(
            criteria,
            vec![
                Criterion::new("vpc-id", ["vpc-1", "vpc-2"]),
                Criterion::new("state", ["available"]),
            ]
        );
    }

    #[test]
    fn test_empty_expression_yields_no_criteria() {
        assert!(compile("").unwrap().is_empty());
        assert!(compile("   ").unwrap().is_empty());
        assert!(compile("[]").unwrap().is_empty());
    }

    #[test]
    fn test_empty_values_is_validation_error() {
        let err = compile("{Name: 'tag:Env', Values: []}").unwrap_err();
        match err {
            DescribeError::Validation { position, name, reason } => {
                assert_eq!(position, 0);
                assert_eq!(name, "tag:Env");
                assert_eq!(reason, "empty values in filter string");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_values_is_validation_error() {
        let err = compile("{Name: 'a', Values: ['x']}, {Name: 'b'}").unwrap_err();
        assert!(matches!(err, DescribeError::Validation { position: 1, .. }));
    }

    #[test]
    fn test_empty_name_is_validation_error() {
        let err = compile("{Values: ['x']}").unwrap_err();
        assert!(matches!(
            err,
            DescribeError::Validation {
                reason: "empty name in filter string",
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_literal_is_parse_error() {
        assert!(matches!(compile("{Name: 'a', Values: ['x'"), Err(DescribeError::Parse(_))));
        assert!(matches!(compile("Name=a"), Err(DescribeError::Parse(_))));
    }
}
