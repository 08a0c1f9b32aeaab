//! AWS SDK error categorization.
//!
//! The SDK already retries throttling and transient failures (standard retry
//! mode), so by the time an error reaches a describer it is final. This module
//! only classifies it so the failure message says what kind of failure it was,
//! and converts it into [`DescribeError::Remote`].

use super::error::DescribeError;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;

/// Categorized error types for AWS SDK errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Request was throttled after the SDK exhausted its retries
    Throttled { service: String, error_code: String },
    /// Request timed out
    Timeout { operation: String },
    /// Network connectivity issues
    NetworkError { message: String },
    /// AWS service temporarily unavailable
    ServiceUnavailable { service: String, message: String },
    /// Non-retryable error (permissions, validation, missing resource, etc.)
    NonRetryable {
        code: String,
        message: String,
        is_permission_error: bool,
    },
}

impl ErrorCategory {
    /// Returns true if this error category is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCategory::Throttled { .. }
                | ErrorCategory::Timeout { .. }
                | ErrorCategory::NetworkError { .. }
                | ErrorCategory::ServiceUnavailable { .. }
        )
    }

    pub fn is_permission_error(&self) -> bool {
        matches!(
            self,
            ErrorCategory::NonRetryable {
                is_permission_error: true,
                ..
            }
        )
    }

    /// Short label for compact display
    pub fn short_label(&self) -> &'static str {
        match self {
            ErrorCategory::Throttled { .. } => "throttled",
            ErrorCategory::Timeout { .. } => "timeout",
            ErrorCategory::NetworkError { .. } => "network",
            ErrorCategory::ServiceUnavailable { .. } => "unavailable",
            ErrorCategory::NonRetryable {
                is_permission_error: true,
                ..
            } => "permission",
            ErrorCategory::NonRetryable { .. } => "error",
        }
    }
}

/// Convert an SDK error into a [`DescribeError::Remote`].
///
/// The service-provided error code is preferred for categorization; the
/// rendered error chain is used as a fallback when the failure happened
/// before a response was parsed (dispatch, timeout, construction).
pub fn from_sdk_error<E, R>(
    service: &'static str,
    operation: &'static str,
    err: SdkError<E, R>,
) -> DescribeError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().map(str::to_string);
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    let detail = match &code {
        Some(code) => format!("{}: {}", code, message),
        None => message.clone(),
    };
    let category = categorize_error_string(&detail, service, operation);
    log_debug!(
        "{}:{} failed ({}): {}",
        service,
        operation,
        category.short_label(),
        detail
    );
    DescribeError::Remote {
        service,
        operation,
        code,
        category,
        message: truncate_message(&message, 300),
    }
}

/// Error code carried by an SDK error, if the service returned one.
pub fn sdk_error_code<E, R>(err: &SdkError<E, R>) -> Option<&str>
where
    E: ProvideErrorMetadata,
{
    err.code()
}

/// Categorize an error based on its string representation
///
/// This handles the common patterns seen in AWS SDK error messages.
pub fn categorize_error_string(error_str: &str, service: &str, operation: &str) -> ErrorCategory {
    if error_str.contains("ThrottlingException")
        || error_str.contains("Throttling")
        || error_str.contains("TooManyRequestsException")
        || error_str.contains("RequestLimitExceeded")
        || error_str.contains("SlowDown")
        || error_str.contains("RateExceeded")
    {
        let error_code = extract_error_code(error_str).unwrap_or_else(|| "Throttling".to_string());
        return ErrorCategory::Throttled {
            service: service.to_string(),
            error_code,
        };
    }

    if error_str.contains("TimeoutError")
        || error_str.contains("timeout")
        || error_str.contains("timed out")
        || error_str.contains("deadline exceeded")
    {
        return ErrorCategory::Timeout {
            operation: operation.to_string(),
        };
    }

    if error_str.contains("DispatchFailure")
        || error_str.contains("dispatch failure")
        || error_str.contains("connection")
        || error_str.contains("Connection")
        || error_str.contains("DNS")
        || error_str.contains("socket")
    {
        return ErrorCategory::NetworkError {
            message: truncate_message(error_str, 100),
        };
    }

    if error_str.contains("ServiceUnavailable")
        || error_str.contains("InternalError")
        || error_str.contains("InternalFailure")
        || error_str.contains("InternalServerError")
        || error_str.contains("Service Unavailable")
    {
        return ErrorCategory::ServiceUnavailable {
            service: service.to_string(),
            message: truncate_message(error_str, 100),
        };
    }

    let is_permission_error = error_str.contains("AccessDenied")
        || error_str.contains("UnauthorizedOperation")
        || error_str.contains("AuthFailure")
        || error_str.contains("InvalidClientTokenId")
        || error_str.contains("ExpiredToken")
        || error_str.contains("SignatureDoesNotMatch");

    let code = extract_error_code(error_str).unwrap_or_else(|| {
        if is_permission_error {
            "AccessDenied".to_string()
        } else {
            "Error".to_string()
        }
    });

    ErrorCategory::NonRetryable {
        code,
        message: truncate_message(error_str, 200),
        is_permission_error,
    }
}

/// Extract the AWS error code from a `Code: message` rendering
fn extract_error_code(error_str: &str) -> Option<String> {
    let (prefix, _) = error_str.split_once(':')?;
    let prefix = prefix.trim();
    let looks_like_code = prefix.ends_with("Exception")
        || prefix.ends_with("Error")
        || prefix.chars().next().is_some_and(|c| c.is_ascii_uppercase());
    if !looks_like_code || prefix.contains(' ') {
        return None;
    }
    let code = prefix.rsplit("::").next().unwrap_or(prefix);
    (!code.is_empty() && code.len() < 64).then(|| code.to_string())
}

/// Truncate a message to max characters, adding ellipsis if truncated
fn truncate_message(msg: &str, max_len: usize) -> String {
    if msg.chars().count() <= max_len {
        msg.to_string()
    } else {
        let kept: String = msg.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_throttling() {
        let cat = categorize_error_string("RequestLimitExceeded: Request limit exceeded.", "ec2", "DescribeInstances");
        assert_eq!(
            cat,
            ErrorCategory::Throttled {
                service: "ec2".to_string(),
                error_code: "RequestLimitExceeded".to_string(),
            }
        );
        assert!(cat.is_retryable());
    }

    #[test]
    fn test_categorize_timeout() {
        let cat = categorize_error_string("TimeoutError: request timed out after 30s", "ec2", "DescribeVpcs");
        assert!(matches!(cat, ErrorCategory::Timeout { .. }));
    }

    #[test]
    fn test_categorize_network_error() {
        let cat = categorize_error_string("dispatch failure: connection refused", "iam", "ListRoles");
        assert!(matches!(cat, ErrorCategory::NetworkError { .. }));
        assert_eq!(cat.short_label(), "network");
    }

    #[test]
    fn test_categorize_unauthorized_operation() {
        let cat = categorize_error_string(
            "UnauthorizedOperation: You are not authorized to perform this operation.",
            "ec2",
            "DescribeSecurityGroups",
        );
        assert!(cat.is_permission_error());
        assert!(!cat.is_retryable());
        assert_eq!(cat.short_label(), "permission");
    }

    #[test]
    fn test_categorize_missing_resource_is_plain_error() {
        let cat = categorize_error_string("NoSuchBucket: The specified bucket does not exist", "s3", "GetBucketPolicy");
        assert_eq!(
            cat,
            ErrorCategory::NonRetryable {
                code: "NoSuchBucket".to_string(),
                message: "NoSuchBucket: The specified bucket does not exist".to_string(),
                is_permission_error: false,
            }
        );
    }

    #[test]
    fn test_extract_error_code_rejects_sentences() {
        assert_eq!(extract_error_code("ThrottlingException: Rate exceeded"), Some("ThrottlingException".to_string()));
        assert_eq!(extract_error_code("Request failed: oops"), None);
        assert_eq!(extract_error_code("no colon here"), None);
    }

    #[test]
    fn test_truncate_message_respects_char_boundaries() {
        assert_eq!(truncate_message("short", 10), "short");
        assert_eq!(truncate_message("ééééééééé", 6), "ééé...");
    }
}
