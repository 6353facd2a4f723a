// src/models/conversation.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::chat::{ChatMessage, Role};

/// Represents the 'chat_conversations' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Conversation {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_archived: bool,
}

/// Represents the 'chat_messages' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StoredMessage {
    pub id: i64,
    pub conversation_id: i64,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A conversation together with its messages, oldest first.
#[derive(Debug, Serialize)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<StoredMessage>,
}

/// List entry for the conversation sidebar.
#[derive(Debug, FromRow, Serialize)]
pub struct ConversationSummary {
    pub id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_message: Option<String>,
    pub message_count: i64,
}

/// DTO for starting a conversation with its first message.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateConversation {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(nested)]
    pub first_message: ChatMessage,
}

/// Pagination for the conversation list (default 20, max 100).
#[derive(Debug, Default, Deserialize)]
pub struct ConversationListParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RenameParams {
    #[validate(length(min = 1, max = 200))]
    pub new_title: String,
}
