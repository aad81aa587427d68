//! One-time identity provisioning.
//!
//! The keypair file is opaque here; `solana-keygen` produces it and the app
//! consumes it. Presence of the file is the sole existence check, and an
//! existing identity is never touched — it may already hold funds or state
//! correlated to its address.

use std::process::Stdio;

use tokio::process::Command;
use tracing::info;

use super::types::IdentityRecord;
use crate::config::Config;
use crate::error::{Error, Result};

pub async fn ensure_identity(config: &Config) -> Result<IdentityRecord> {
    let path = config.keypair_path.clone();

    if path.exists() {
        info!(path = %path.display(), "identity exists, leaving untouched");
        return Ok(IdentityRecord {
            path,
            existed: true,
        });
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // Generate into a sibling temp path, then rename into place so a
    // crashed run never leaves a half-written identity at the real path.
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::config("keypair path has no file name"))?;
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    let output = Command::new(&config.keygen_bin)
        .args(["new", "--no-bip39-passphrase", "--silent", "--force", "-o"])
        .arg(&tmp)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| Error::Keygen(format!("{}: {e}", config.keygen_bin)))?;

    if !output.status.success() {
        let _ = tokio::fs::remove_file(&tmp).await;
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Keygen(format!(
            "{} exited with {}: {}",
            config.keygen_bin,
            output.status,
            stderr.trim()
        )));
    }

    tokio::fs::rename(&tmp, &path).await?;
    info!(path = %path.display(), "identity created");

    Ok(IdentityRecord {
        path,
        existed: false,
    })
}
