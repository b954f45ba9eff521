//! Tracing setup: structured JSON logs, plus OTLP trace export when a
//! collector endpoint is configured.
//!
//! # Telemetry invariants
//!
//! - **No key material** may appear in any span attribute or log field. That
//!   covers private keys, auth secrets, content keys, nonces and plaintext.
//! - Push endpoints are logged by origin only, never the full capability URL.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`).

pub mod init;

pub use init::init_telemetry;
