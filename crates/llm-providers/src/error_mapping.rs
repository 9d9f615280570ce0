//! Maps a vendor's HTTP status and error payload onto the shared
//! [`trc::ProviderEvent`] taxonomy so the router's retry/fallback logic
//! never has to know which vendor produced an error.

pub fn map_vendor_error(status: u16, body: &serde_json::Value) -> trc::Error {
    let error_type = body
        .get("error")
        .and_then(|e| e.get("type"))
        .and_then(|t| t.as_str())
        .unwrap_or("");
    let message = body
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or("provider returned an error")
        .to_string();

    let event = match (status, error_type) {
        (429, _) | (_, "rate_limit_error") => trc::ProviderEvent::RateLimited,
        (_, "context_length_exceeded") => trc::ProviderEvent::ContextLengthExceeded,
        (_, "authentication_error") | (401, _) | (403, _) => trc::ProviderEvent::AuthenticationError,
        (400, _) | (_, "invalid_request_error") => trc::ProviderEvent::InvalidRequest,
        (404, _) | (_, "unsupported_model") => trc::ProviderEvent::Unsupported,
        (503, _) | (_, "overloaded_error") => trc::ProviderEvent::ServiceUnavailable,
        (s, _) if s >= 500 => trc::ProviderEvent::ServerError,
        _ => trc::ProviderEvent::ServerError,
    };
    trc::Error::provider(event, message).with_status(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_status_maps_to_retryable_event() {
        let err = map_vendor_error(429, &serde_json::json!({}));
        assert_eq!(err.kind, trc::Kind::Retryable);
    }

    #[test]
    fn auth_error_type_maps_to_fatal_regardless_of_status() {
        let err = map_vendor_error(200, &serde_json::json!({"error": {"type": "authentication_error", "message": "bad key"}}));
        assert_eq!(err.kind, trc::Kind::Fatal);
    }

    #[test]
    fn unknown_5xx_defaults_to_server_error() {
        let err = map_vendor_error(502, &serde_json::json!({}));
        assert_eq!(err.kind, trc::Kind::Retryable);
    }
}
