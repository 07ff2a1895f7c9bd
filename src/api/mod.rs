//! REST client for the booking backend's chat endpoints

pub mod client;
mod history;
mod me;
mod roster;

use anyhow::Result;

pub use history::{fetch_history, format_timestamp};
pub use me::fetch_operator;
pub use roster::fetch_roster;

/// Show the operator identity
pub async fn whoami() -> Result<()> {
    me::whoami().await
}

/// List counterparts with prior conversations
pub async fn list_roster() -> Result<()> {
    roster::list_roster().await
}

/// Print recent history with one counterpart
pub async fn read_history(counterpart_id: &str, limit: usize) -> Result<()> {
    history::read_history(counterpart_id, limit).await
}
