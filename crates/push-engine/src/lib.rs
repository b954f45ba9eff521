//! Web push engine.
//!
//! - [`crypto`]: `aes128gcm` content encryption and decryption.
//! - [`token`]: compact signed tokens (header.payload.signature).
//! - [`vapid`]: VAPID key generation and `Authorization` headers.
//! - [`dispatch`]: subscription validation and the single POST to the push service.
//! - [`config`] / [`telemetry`]: environment configuration and tracing setup.

pub mod config;
pub mod crypto;
pub mod dispatch;
pub mod telemetry;
pub mod token;
pub mod vapid;

pub use common::protocol::{PushResponse, Subscription, SubscriptionKeys, Urgency, VapidKeyPair};
pub use common::{ByteSequence, PushError};
pub use config::Config;
pub use dispatch::{Dispatcher, HttpTransport, Payload, PushRequest, PushTransport};
