//! Operator identity endpoint (/auth/me)

use anyhow::Result;
use serde::Deserialize;

use super::client::ChatClient;
use crate::models::User;

const ME_PATH: &str = "/auth/me";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MeResponse {
    Wrapped { user: User },
    Bare(User),
}

/// Fetch the identity of the operator the configured token belongs to.
pub async fn fetch_operator(client: &ChatClient) -> Result<User> {
    let me: MeResponse = client.get_json(ME_PATH).await?;
    let user = match me {
        MeResponse::Wrapped { user } | MeResponse::Bare(user) => user,
    };
    tracing::debug!("Operator identity resolved: {}", user.id);
    Ok(user)
}

/// Fetch and display the operator identity.
pub async fn whoami() -> Result<()> {
    let client = ChatClient::from_config_file()?;
    let me = fetch_operator(&client).await?;

    println!();
    println!("Name:   {}", me.display_name());
    println!(
        "Email:  {}",
        if me.email.is_empty() { "(none)" } else { me.email.as_str() }
    );
    println!("Avatar: {}", me.avatar.as_deref().unwrap_or("(none)"));
    println!("ID:     {}", me.id);

    Ok(())
}
