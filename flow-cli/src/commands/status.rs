//! Print a stored session record.

use anyhow::{Context, Result};
use flow_client::{FileStore, SessionStore};
use flow_types::RoomCode;
use std::path::Path;

/// Run the status command.
pub async fn run(store_dir: &Path, code: &str) -> Result<()> {
    let code = RoomCode::parse(code).context("Room code must not be empty")?;
    let store = FileStore::open(store_dir)
        .await
        .context("Failed to open session store")?;

    let Some(session) = store
        .get(&code)
        .await
        .context("Failed to read session")?
    else {
        anyhow::bail!("No session found for code {}", code);
    };

    println!("{}", serde_json::to_string_pretty(&session)?);
    Ok(())
}
