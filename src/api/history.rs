//! Conversation history endpoint

use anyhow::Result;

use super::client::{encode_segment, ChatClient, Listing};
use crate::models::{chronological, ChatMessage, User};

/// Fetch prior messages between the operator and one counterpart, oldest first.
pub async fn fetch_history(
    client: &ChatClient,
    operator_id: &str,
    counterpart_id: &str,
) -> Result<Vec<ChatMessage>> {
    let path = format!(
        "/messages/{}/{}",
        encode_segment(operator_id),
        encode_segment(counterpart_id)
    );
    let listing: Listing<ChatMessage> = client.get_json(&path).await?;
    let messages = chronological(listing.into_vec());
    tracing::debug!(
        "History with {} fetched: {} messages",
        counterpart_id,
        messages.len()
    );
    Ok(messages)
}

/// Print the most recent messages with a counterpart (prints to stdout).
pub async fn read_history(counterpart_id: &str, limit: usize) -> Result<()> {
    let client = ChatClient::from_config_file()?;
    let operator = super::fetch_operator(&client).await?;
    let messages = fetch_history(&client, &operator.id, counterpart_id).await?;

    if messages.is_empty() {
        println!("(no messages)");
        return Ok(());
    }

    let skip = messages.len().saturating_sub(limit);
    for msg in &messages[skip..] {
        println!(
            "[{}] {}: {}",
            format_timestamp(msg),
            sender_label(msg, &operator),
            msg.content
        );
    }

    Ok(())
}

/// Who a message is shown as coming from, relative to the operator.
pub fn sender_label<'a>(msg: &'a ChatMessage, operator: &User) -> &'a str {
    if msg.from == operator.id {
        "You"
    } else {
        &msg.from
    }
}

/// Local wall-clock rendering of a message timestamp.
pub fn format_timestamp(msg: &ChatMessage) -> String {
    msg.created_at
        .map(|t| {
            t.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "--".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn test_fetch_history_is_scoped_and_ordered() {
        let mut server = mockito::Server::new_async().await;
        let config = Config {
            api_url: format!("{}/api", server.url()),
            ..Config::default()
        };
        let m = server
            .mock("GET", "/api/messages/admin-1/u7")
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"_id":"m2","from":"u7","to":"admin-1","content":"thanks","createdAt":"2024-05-01T10:05:00Z"},
                    {"_id":"m1","from":"admin-1","to":"u7","content":"booked","createdAt":"2024-05-01T10:00:00Z"}
                ]"#,
            )
            .create_async()
            .await;

        let client = ChatClient::new(&config).unwrap();
        let messages = fetch_history(&client, "admin-1", "u7").await.unwrap();
        m.assert_async().await;
        assert_eq!(
            messages.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
            vec!["m1", "m2"]
        );
    }

    #[tokio::test]
    async fn test_fetch_history_escapes_ids_as_path_segments() {
        let mut server = mockito::Server::new_async().await;
        let config = Config {
            api_url: format!("{}/api", server.url()),
            ..Config::default()
        };
        let m = server
            .mock("GET", "/api/messages/admin-1/user%201")
            .with_body("[]")
            .create_async()
            .await;

        let client = ChatClient::new(&config).unwrap();
        let messages = fetch_history(&client, "admin-1", "user 1").await.unwrap();
        m.assert_async().await;
        assert!(messages.is_empty());
    }

    #[test]
    fn test_sender_label() {
        let operator = User {
            id: "admin-1".to_string(),
            name: "Mai".to_string(),
            email: String::new(),
            avatar: None,
        };
        let msg = ChatMessage {
            id: "m".to_string(),
            from: "admin-1".to_string(),
            to: "u7".to_string(),
            content: "hi".to_string(),
            created_at: None,
        };
        assert_eq!(sender_label(&msg, &operator), "You");
        assert_eq!(format_timestamp(&msg), "--");
    }
}
