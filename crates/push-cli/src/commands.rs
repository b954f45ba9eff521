//! Subcommand bodies.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use common::protocol::{PushResponse, Subscription, VapidKeyPair};
use push_engine::{vapid, Config, Dispatcher};
use serde::de::DeserializeOwned;
use tracing::info;

/// Print a fresh key pair, optionally saving it to `output`.
pub fn generate(output: Option<&Path>) -> Result<()> {
    let key_pair = vapid::generate_key_pair().context("failed to generate VAPID key pair")?;
    let json = serde_json::to_string_pretty(&key_pair)?;
    if let Some(path) = output {
        fs::write(path, &json).with_context(|| format!("failed to write {}", path.display()))?;
    }
    println!("{json}");
    Ok(())
}

/// Send `payload` to the subscription stored at `subscription_path`.
pub async fn send(
    cfg: Config,
    subscription_path: &Path,
    keys_path: &Path,
    payload: String,
) -> Result<()> {
    let subscription: Subscription = read_json(subscription_path)?;
    let keys: VapidKeyPair = read_json(keys_path)?;

    let dispatcher = Dispatcher::with_http(cfg)?;
    let response = dispatcher.send(&subscription, payload, &keys).await?;

    info!(status = response.status, "notification sent");
    print!("{}", report(&response));
    Ok(())
}

/// Status line, headers and body of a push service answer.
fn report(response: &PushResponse) -> String {
    let mut out = format!("Notification sent ({})\n", response.status);
    for (name, value) in &response.headers {
        out.push_str(&format!("{name}: {value}\n"));
    }
    if !response.body.is_empty() {
        out.push('\n');
        out.push_str(&response.body);
        out.push('\n');
    }
    out
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
