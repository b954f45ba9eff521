//! Data shapes exchanged with collaborators: the browser's push subscription,
//! the persisted sender key pair, and the push service's response.
//!
//! The JSON field names match what the browser `PushSubscription.toJSON()`
//! produces and what key-pair files on disk contain.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// A recipient's push subscription: `{endpoint, keys: {p256dh, auth}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Push service endpoint URL.
    pub endpoint: String,
    /// Recipient key material.
    pub keys: SubscriptionKeys,
}

/// Recipient key material, both values base64url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    /// Uncompressed P-256 public key (65 bytes decoded).
    pub p256dh: String,
    /// Auth secret (at least 16 bytes decoded).
    pub auth: String,
}

impl Subscription {
    /// Construct a subscription from its three string parts.
    pub fn new(
        endpoint: impl Into<String>,
        p256dh: impl Into<String>,
        auth: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            keys: SubscriptionKeys {
                p256dh: p256dh.into(),
                auth: auth.into(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Sender key pair
// ---------------------------------------------------------------------------

/// Long-lived VAPID signing key pair.
///
/// `public_key` is the raw uncompressed point in base64url; `private_key` is
/// PKCS#8 DER in *standard* base64. The mixed encodings are part of the
/// persisted format and are kept as-is.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VapidKeyPair {
    /// Raw uncompressed P-256 point, base64url (65 bytes decoded).
    pub public_key: String,
    /// PKCS#8 DER private key, standard base64.
    pub private_key: String,
}

impl std::fmt::Debug for VapidKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VapidKeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Request headers
// ---------------------------------------------------------------------------

/// `Urgency` header values (RFC 8030 §5.3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Urgency {
    /// `very-low`
    VeryLow,
    /// `low`
    Low,
    /// `normal`
    #[default]
    Normal,
    /// `high`
    High,
}

impl Urgency {
    /// Header value for this urgency.
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::VeryLow => "very-low",
            Urgency::Low => "low",
            Urgency::Normal => "normal",
            Urgency::High => "high",
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only content coding this engine emits.
pub const CONTENT_ENCODING_AES128GCM: &str = "aes128gcm";

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// What the push service answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// Response body decoded as text.
    pub body: String,
}

impl PushResponse {
    /// `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_matches_browser_json() {
        let json = r#"{"endpoint":"https://push.example/abc","keys":{"p256dh":"BCk","auth":"c2VjcmV0"}}"#;
        let sub: Subscription = serde_json::from_str(json).unwrap();
        assert_eq!(sub, Subscription::new("https://push.example/abc", "BCk", "c2VjcmV0"));
    }

    #[test]
    fn key_pair_uses_camel_case() {
        let kp = VapidKeyPair {
            public_key: "pub".into(),
            private_key: "priv".into(),
        };
        let json = serde_json::to_value(&kp).unwrap();
        assert_eq!(json["publicKey"], "pub");
        assert_eq!(json["privateKey"], "priv");
    }

    #[test]
    fn key_pair_debug_redacts_private_key() {
        let kp = VapidKeyPair {
            public_key: "pub".into(),
            private_key: "super-secret".into(),
        };
        let dbg = format!("{kp:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("super-secret"));
    }

    #[test]
    fn urgency_serde_and_display() {
        assert_eq!(Urgency::default(), Urgency::Normal);
        let u: Urgency = serde_json::from_str(r#""very-low""#).unwrap();
        assert_eq!(u, Urgency::VeryLow);
        assert_eq!(Urgency::High.to_string(), "high");
    }

    #[test]
    fn response_success_range() {
        let mut r = PushResponse {
            status: 201,
            headers: vec![],
            body: String::new(),
        };
        assert!(r.is_success());
        r.status = 410;
        assert!(!r.is_success());
    }
}
