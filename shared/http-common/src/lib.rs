//! Shared HTTP utilities for the td workspace.
//!
//! Framework-agnostic response bodies and header values used by the
//! api-server handlers.

// ============================================================================
// JSON Response Helpers (framework-agnostic)
// ============================================================================

/// Create a structured error JSON with a default message based on the code.
///
/// Returns: `{"error": {"code": "<code>", "message": "<default message>"}}`
pub fn json_err(code: &str) -> serde_json::Value {
    let message = match code {
        "not_found" => "Resource not found",
        "unauthorized" => "Authentication required",
        "internal" => "Internal server error",
        _ => code, // Fallback to code as message for unknown codes
    };
    serde_json::json!({"error": {"code": code, "message": message}})
}

/// Create a structured error JSON with a custom message.
///
/// Returns: `{"error": {"code": "<code>", "message": "<message>"}}`
pub fn json_error_with_message(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({"error": {"code": code, "message": message}})
}

// ============================================================================
// Header Values
// ============================================================================

/// `Cache-Control` value for public assets cached for `secs` seconds.
pub fn cache_control_max_age(secs: u32) -> String {
    format!("public, max-age={}", secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_err() {
        let err = json_err("unauthorized");
        assert_eq!(
            err,
            serde_json::json!({"error": {"code": "unauthorized", "message": "Authentication required"}})
        );

        assert_eq!(json_err("internal")["error"]["message"], "Internal server error");
        assert_eq!(json_err("not_found")["error"]["message"], "Resource not found");

        // Unknown code falls back to code as message
        let err = json_err("custom_error");
        assert_eq!(err, serde_json::json!({"error": {"code": "custom_error", "message": "custom_error"}}));
    }

    #[test]
    fn test_json_error_with_message() {
        let err = json_error_with_message("invalid_item", "category must not be empty");
        assert_eq!(
            err,
            serde_json::json!({"error": {"code": "invalid_item", "message": "category must not be empty"}})
        );
    }

    #[test]
    fn test_cache_control_max_age() {
        assert_eq!(cache_control_max_age(3600), "public, max-age=3600");
    }
}
