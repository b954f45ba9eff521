//! Push dispatch: validate a subscription, encrypt, sign, POST once.
//!
//! Every send uses a fresh ephemeral ECDH key and a fresh salt. Validation
//! failures are raised before any crypto or network work. There is no retry;
//! a non-2xx answer is surfaced as [`PushError::Transport`] with its status.

pub mod transport;

pub use transport::{HttpTransport, PushRequest, PushTransport, TransportError};

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use common::protocol::{PushResponse, Subscription, VapidKeyPair, CONTENT_ENCODING_AES128GCM};
use common::{ByteSequence, PushError};
use p256::elliptic_curve::rand_core::OsRng;
use p256::{PublicKey, SecretKey};
use tracing::{info, info_span, warn, Instrument};
use url::Url;

use crate::config::Config;
use crate::crypto::{self, EncryptParams, KeyInput};
use crate::vapid::VapidSigner;

/// Decoded length of a subscription's uncompressed P-256 key.
pub const P256DH_LEN: usize = 65;

/// Minimum decoded length of a subscription's auth secret.
pub const MIN_AUTH_LEN: usize = 16;

/// Message body to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 text, sent as its bytes.
    Text(String),
    /// Opaque bytes.
    Bytes(Vec<u8>),
}

impl Payload {
    fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(s) => s.as_bytes(),
            Payload::Bytes(b) => b,
        }
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_owned())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(b: Vec<u8>) -> Self {
        Payload::Bytes(b)
    }
}

/// Decoded, checked subscription and sender key material.
struct Recipient {
    endpoint: Url,
    origin: String,
    p256dh: Vec<u8>,
    auth: Vec<u8>,
    signer: VapidSigner,
}

/// Sends encrypted, VAPID-signed messages through a [`PushTransport`].
#[derive(Clone)]
pub struct Dispatcher {
    config: Config,
    transport: Arc<dyn PushTransport>,
}

impl Dispatcher {
    /// Dispatcher over any transport.
    pub fn new(config: Config, transport: Arc<dyn PushTransport>) -> Self {
        Self { config, transport }
    }

    /// Dispatcher over a `reqwest` transport with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::Transport`] if the HTTP client cannot be built.
    pub fn with_http(config: Config) -> Result<Self, PushError> {
        let transport = HttpTransport::new(Duration::from_secs(config.request_timeout_secs))?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    /// Validate, encrypt and sign without sending.
    ///
    /// # Errors
    ///
    /// [`PushError::Validation`] for a bad endpoint, `p256dh`, `auth` or VAPID
    /// private key, always before any crypto work;
    /// [`PushError::CryptoInvariant`] if encryption breaks an invariant.
    pub fn prepare(
        &self,
        subscription: &Subscription,
        payload: &Payload,
        vapid_keys: &VapidKeyPair,
    ) -> Result<PushRequest, PushError> {
        let recipient = validate(subscription, vapid_keys)?;
        self.seal(&recipient, payload)
    }

    /// Encrypt `payload` for `subscription` and POST it once.
    ///
    /// # Errors
    ///
    /// Everything [`prepare`](Self::prepare) returns, plus
    /// [`PushError::Transport`] for network failures (`status: None`) and
    /// non-2xx responses (`status: Some(code)`).
    pub async fn send(
        &self,
        subscription: &Subscription,
        payload: impl Into<Payload>,
        vapid_keys: &VapidKeyPair,
    ) -> Result<PushResponse, PushError> {
        let payload = payload.into();
        let recipient = validate(subscription, vapid_keys)?;
        let span = info_span!("push_send", origin = %recipient.origin);

        let request = span.in_scope(|| self.seal(&recipient, &payload))?;
        self.deliver(request).instrument(span).await
    }

    fn seal(&self, recipient: &Recipient, payload: &Payload) -> Result<PushRequest, PushError> {
        let ephemeral = SecretKey::random(&mut OsRng);
        let salt = crypto::generate_salt();
        let body = crypto::encrypt(
            payload.as_bytes(),
            &EncryptParams {
                dh: KeyInput::Raw(&recipient.p256dh),
                private_key: &ephemeral,
                salt: KeyInput::Raw(&salt),
                auth_secret: KeyInput::Raw(&recipient.auth),
            },
        )?;

        let authorization = recipient
            .signer
            .authorize(&recipient.origin, &self.config.vapid_subject)?;

        let headers = vec![
            ("TTL".to_owned(), self.config.ttl_secs.to_string()),
            ("Urgency".to_owned(), self.config.urgency.to_string()),
            ("Authorization".to_owned(), authorization),
            (
                "Content-Encoding".to_owned(),
                CONTENT_ENCODING_AES128GCM.to_owned(),
            ),
            (
                "Content-Type".to_owned(),
                "application/octet-stream".to_owned(),
            ),
            ("Content-Length".to_owned(), body.len().to_string()),
        ];

        Ok(PushRequest {
            endpoint: recipient.endpoint.to_string(),
            headers,
            body: Bytes::from(body),
        })
    }

    async fn deliver(&self, request: PushRequest) -> Result<PushResponse, PushError> {
        let response = self.transport.post(request).await?;
        if !response.is_success() {
            warn!(status = response.status, "push service rejected message");
            return Err(PushError::Transport {
                status: Some(response.status),
                body: response.body,
            });
        }
        info!(status = response.status, "push message accepted");
        Ok(response)
    }
}

fn validate(subscription: &Subscription, vapid_keys: &VapidKeyPair) -> Result<Recipient, PushError> {
    let endpoint = Url::parse(&subscription.endpoint)
        .map_err(|e| PushError::Validation(format!("invalid endpoint: {e}")))?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(PushError::Validation(format!(
            "endpoint scheme must be http or https, got {}",
            endpoint.scheme()
        )));
    }
    let origin = endpoint.origin().ascii_serialization();

    let p256dh = ByteSequence::from_base64url(&subscription.keys.p256dh)
        .map_err(|e| PushError::Validation(format!("p256dh is not base64url: {e}")))?
        .into_vec();
    if p256dh.len() != P256DH_LEN {
        return Err(PushError::Validation(format!(
            "p256dh must decode to {P256DH_LEN} bytes, got {}",
            p256dh.len()
        )));
    }
    PublicKey::from_sec1_bytes(&p256dh)
        .map_err(|_| PushError::Validation("p256dh is not a P-256 point".into()))?;

    let auth = ByteSequence::from_base64url(&subscription.keys.auth)
        .map_err(|e| PushError::Validation(format!("auth is not base64url: {e}")))?
        .into_vec();
    if auth.len() < MIN_AUTH_LEN {
        return Err(PushError::Validation(format!(
            "auth must decode to at least {MIN_AUTH_LEN} bytes, got {}",
            auth.len()
        )));
    }

    let signer = VapidSigner::from_key_pair(vapid_keys)
        .map_err(|e| PushError::Validation(format!("invalid VAPID key pair: {e}")))?;

    Ok(Recipient {
        endpoint,
        origin,
        p256dh,
        auth,
        signer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{decrypt, DecryptParams, RECORD_SIZE};
    use crate::vapid::{self, VapidAuthorization};
    use p256::elliptic_curve::sec1::ToEncodedPoint;
    use super::transport::MockPushTransport;

    struct Browser {
        key: SecretKey,
        auth: [u8; 16],
    }

    impl Browser {
        fn new() -> Self {
            Self {
                key: SecretKey::random(&mut OsRng),
                auth: [0x11; 16],
            }
        }

        fn subscription(&self, endpoint: &str) -> Subscription {
            let point = self.key.public_key().to_encoded_point(false);
            Subscription::new(
                endpoint,
                ByteSequence::from(point.as_bytes()).to_base64url(),
                ByteSequence::from(&self.auth[..]).to_base64url(),
            )
        }
    }

    fn ok_response(status: u16) -> PushResponse {
        PushResponse {
            status,
            headers: vec![],
            body: String::new(),
        }
    }

    fn dispatcher(mock: MockPushTransport) -> Dispatcher {
        Dispatcher::new(Config::default(), Arc::new(mock))
    }

    #[tokio::test]
    async fn short_p256dh_fails_before_network() {
        let mut mock = MockPushTransport::new();
        mock.expect_post().times(0);
        let d = dispatcher(mock);

        let browser = Browser::new();
        let mut sub = browser.subscription("https://push.example/send/abc");
        sub.keys.p256dh = ByteSequence::from(vec![4u8; 64]).to_base64url();
        let keys = vapid::generate_key_pair().unwrap();

        let err = d.send(&sub, "Hello, World!", &keys).await.unwrap_err();
        assert!(matches!(err, PushError::Validation(_)));
    }

    #[tokio::test]
    async fn short_auth_fails_before_network() {
        let mut mock = MockPushTransport::new();
        mock.expect_post().times(0);
        let d = dispatcher(mock);

        let browser = Browser::new();
        let mut sub = browser.subscription("https://push.example/send/abc");
        sub.keys.auth = ByteSequence::from(vec![1u8; 15]).to_base64url();
        let keys = vapid::generate_key_pair().unwrap();

        let err = d.send(&sub, "x", &keys).await.unwrap_err();
        assert!(matches!(err, PushError::Validation(_)));
    }

    #[tokio::test]
    async fn bad_endpoint_fails_before_network() {
        let mut mock = MockPushTransport::new();
        mock.expect_post().times(0);
        let d = dispatcher(mock);

        let browser = Browser::new();
        let keys = vapid::generate_key_pair().unwrap();
        for endpoint in ["not a url", "/relative/path", "ftp://push.example/x"] {
            let err = d
                .send(&browser.subscription(endpoint), "x", &keys)
                .await
                .unwrap_err();
            assert!(matches!(err, PushError::Validation(_)), "{endpoint}");
        }
    }

    #[tokio::test]
    async fn sends_one_request_with_expected_headers() {
        let browser = Browser::new();
        let sub = browser.subscription("https://push.example:8443/send/abc?x=1");
        let keys = vapid::generate_key_pair().unwrap();
        let expected_k = keys.public_key.clone();
        let secret = browser.key.clone();

        let mut mock = MockPushTransport::new();
        mock.expect_post()
            .times(1)
            .withf(move |req: &PushRequest| {
                let auth = VapidAuthorization::parse(req.header("Authorization").unwrap_or(""));
                let Ok(auth) = auth else { return false };
                let claims = auth.token.payload().unwrap().clone();
                let plaintext = decrypt(
                    &req.body,
                    &DecryptParams {
                        private_key: &secret,
                        auth_secret: (&[0x11u8; 16]).into(),
                    },
                )
                .unwrap();
                req.endpoint == "https://push.example:8443/send/abc?x=1"
                    && req.header("TTL") == Some("2419200")
                    && req.header("Urgency") == Some("normal")
                    && req.header("Content-Encoding") == Some("aes128gcm")
                    && req.header("Content-Type") == Some("application/octet-stream")
                    && req.header("Content-Length") == Some(req.body.len().to_string().as_str())
                    && auth.public_key == expected_k
                    && auth.verify().unwrap()
                    && claims.aud == "https://push.example:8443"
                    && claims.sub == "http://localhost:5500/docs"
                    && plaintext == b"Hello, World!"
            })
            .returning(|_| Ok(ok_response(201)));

        let resp = dispatcher(mock)
            .send(&sub, "Hello, World!", &keys)
            .await
            .unwrap();
        assert_eq!(resp.status, 201);
    }

    #[test]
    fn body_layout_for_short_message() {
        let browser = Browser::new();
        let sub = browser.subscription("https://push.example/send/abc");
        let keys = vapid::generate_key_pair().unwrap();
        let d = dispatcher(MockPushTransport::new());

        let req = d
            .prepare(&sub, &Payload::from("Hello, World!"), &keys)
            .unwrap();
        let body = &req.body;
        assert_eq!(body.len(), 21 + 65 + 13 + 1 + 16);
        assert_eq!(&body[16..20], &RECORD_SIZE.to_be_bytes());
        assert_eq!(body[20], 65);
        assert_eq!(body[21], 0x04);
    }

    #[test]
    fn each_send_uses_fresh_salt_and_key() {
        let browser = Browser::new();
        let sub = browser.subscription("https://push.example/send/abc");
        let keys = vapid::generate_key_pair().unwrap();
        let d = dispatcher(MockPushTransport::new());
        let payload = Payload::from("same");

        let a = d.prepare(&sub, &payload, &keys).unwrap();
        let b = d.prepare(&sub, &payload, &keys).unwrap();
        assert_ne!(a.body[..16], b.body[..16]);
        assert_ne!(a.body[21..86], b.body[21..86]);
    }

    #[tokio::test]
    async fn non_success_status_is_transport_error() {
        let mut mock = MockPushTransport::new();
        mock.expect_post().times(1).returning(|_| {
            Ok(PushResponse {
                status: 410,
                headers: vec![],
                body: "subscription expired".into(),
            })
        });

        let browser = Browser::new();
        let keys = vapid::generate_key_pair().unwrap();
        let err = dispatcher(mock)
            .send(&browser.subscription("https://push.example/x"), "x", &keys)
            .await
            .unwrap_err();
        match err {
            PushError::Transport { status, body } => {
                assert_eq!(status, Some(410));
                assert_eq!(body, "subscription expired");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn configured_urgency_and_ttl_are_sent() {
        let mut mock = MockPushTransport::new();
        mock.expect_post()
            .times(1)
            .withf(|req: &PushRequest| {
                req.header("Urgency") == Some("high") && req.header("TTL") == Some("60")
            })
            .returning(|_| Ok(ok_response(201)));

        let config = Config {
            ttl_secs: 60,
            urgency: common::protocol::Urgency::High,
            ..Config::default()
        };
        let d = Dispatcher::new(config, Arc::new(mock));
        let browser = Browser::new();
        let keys = vapid::generate_key_pair().unwrap();
        d.send(&browser.subscription("https://push.example/x"), "x", &keys)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn bad_vapid_private_key_fails_before_encryption() {
        let mut mock = MockPushTransport::new();
        mock.expect_post().times(0);
        let d = dispatcher(mock);

        let browser = Browser::new();
        let sub = browser.subscription("https://push.example/send/abc");
        let good = vapid::generate_key_pair().unwrap();
        for private_key in ["AAAA", "not base64!", ""] {
            let keys = VapidKeyPair {
                public_key: good.public_key.clone(),
                private_key: private_key.into(),
            };
            assert!(
                matches!(validate(&sub, &keys), Err(PushError::Validation(_))),
                "{private_key}"
            );
            assert!(matches!(
                d.prepare(&sub, &Payload::from("x"), &keys),
                Err(PushError::Validation(_))
            ));
            let err = d.send(&sub, "x", &keys).await.unwrap_err();
            assert!(matches!(err, PushError::Validation(_)), "{private_key}");
        }
    }

    #[test]
    fn recipient_carries_origin_of_endpoint() {
        let browser = Browser::new();
        let keys = vapid::generate_key_pair().unwrap();
        let recipient = validate(
            &browser.subscription("https://push.example:8443/send/abc?x=1"),
            &keys,
        )
        .unwrap();
        assert_eq!(recipient.origin, "https://push.example:8443");
        assert_eq!(recipient.p256dh.len(), P256DH_LEN);
    }

    #[test]
    fn payload_conversions() {
        assert_eq!(Payload::from("hi").as_bytes(), b"hi");
        assert_eq!(Payload::from(vec![0u8, 255]).as_bytes(), &[0u8, 255]);
    }
}
