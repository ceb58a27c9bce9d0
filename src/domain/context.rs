//! Request Context
//!
//! Who is calling and how to correlate their request in the logs. Handlers
//! receive the user as an explicit argument taken from here; nothing below
//! the API layer reads this type.

use serde::Serialize;
use std::net::IpAddr;
use uuid::Uuid;

use super::ids::UserId;

/// Authenticated request metadata, attached by the session middleware
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub user_id: UserId,
    pub correlation_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<IpAddr>,
}

impl RequestContext {
    /// Context with a fresh correlation ID
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            correlation_id: Uuid::new_v4(),
            client_ip: None,
        }
    }

    /// Keep the caller's correlation ID when one was sent
    pub fn with_correlation_id(mut self, correlation_id: Option<Uuid>) -> Self {
        if let Some(id) = correlation_id {
            self.correlation_id = id;
        }
        self
    }

    pub fn with_client_ip(mut self, ip: Option<IpAddr>) -> Self {
        self.client_ip = ip;
        self
    }

    /// Span that every log line of this request is recorded under
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            user_id = %self.user_id,
            correlation_id = %self.correlation_id,
            client_ip = ?self.client_ip,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_correlation_id() {
        let first = RequestContext::new(UserId(42));
        let second = RequestContext::new(UserId(42));

        assert_eq!(first.user_id, UserId(42));
        assert_ne!(first.correlation_id, second.correlation_id);
        assert!(first.client_ip.is_none());
    }

    #[test]
    fn test_caller_correlation_id_wins() {
        let sent = Uuid::new_v4();

        let kept = RequestContext::new(UserId(1)).with_correlation_id(Some(sent));
        assert_eq!(kept.correlation_id, sent);

        let generated = RequestContext::new(UserId(1)).with_correlation_id(None);
        assert_ne!(generated.correlation_id, sent);
    }

    #[test]
    fn test_serializes_camel_case_without_missing_ip() {
        let ctx = RequestContext::new(UserId(7));
        let json = serde_json::to_value(&ctx).unwrap();

        assert_eq!(json["userId"], 7);
        assert!(json.get("clientIp").is_none());
    }
}
