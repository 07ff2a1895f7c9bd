//! Roster endpoint: customers who already have a conversation with the operator

use anyhow::Result;

use super::client::{ChatClient, Listing};
use crate::models::User;

const ROSTER_PATH: &str = "/messages/users";

/// Fetch the counterparts that have prior message history.
pub async fn fetch_roster(client: &ChatClient) -> Result<Vec<User>> {
    let listing: Listing<User> = client.get_json(ROSTER_PATH).await?;
    let users = listing.into_vec();
    tracing::debug!("Roster fetched: {} counterparts", users.len());
    Ok(users)
}

/// Print the roster (prints to stdout).
pub async fn list_roster() -> Result<()> {
    let client = ChatClient::from_config_file()?;
    let users = fetch_roster(&client).await?;

    println!("\nConversations:");
    println!("{:-<60}", "");

    if users.is_empty() {
        println!("  (no conversations yet)");
        return Ok(());
    }

    for user in &users {
        println!("{}", user.display_name());
        println!("  ID: {}", user.id);
        if !user.email.is_empty() {
            println!("  Email: {}", user.email);
        }
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    async fn client_for(server: &mockito::ServerGuard) -> ChatClient {
        let config = Config {
            api_url: format!("{}/api", server.url()),
            ..Config::default()
        };
        ChatClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_roster_wrapped() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/messages/users")
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"users":[
                    {"_id":"u1","name":"An","email":"an@example.com"},
                    {"_id":"u2","name":"Binh","email":"binh@example.com","avatar":null}
                ]}"#,
            )
            .create_async()
            .await;

        let users = fetch_roster(&client_for(&server).await).await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].id, "u2");
    }

    #[tokio::test]
    async fn test_fetch_roster_bare() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/messages/users")
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id":"u3","name":"Chi","email":"chi@example.com"}]"#)
            .create_async()
            .await;

        let users = fetch_roster(&client_for(&server).await).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "Chi");
    }

    #[tokio::test]
    async fn test_fetch_roster_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/messages/users")
            .with_status(500)
            .create_async()
            .await;

        assert!(fetch_roster(&client_for(&server).await).await.is_err());
    }
}
