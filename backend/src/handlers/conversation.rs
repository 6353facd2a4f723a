// src/handlers/conversation.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        chat::{ChatMessage, Role},
        conversation::{
            Conversation, ConversationDetail, ConversationListParams, ConversationSummary,
            CreateConversation, RecentParams, RenameParams, StoredMessage,
        },
    },
};

const SUMMARY_QUERY: &str = r#"
    SELECT
        c.id, c.title, c.created_at, c.updated_at,
        (SELECT m.content FROM chat_messages m
         WHERE m.conversation_id = c.id ORDER BY m.id DESC LIMIT 1) AS last_message,
        (SELECT COUNT(*) FROM chat_messages m WHERE m.conversation_id = c.id) AS message_count
    FROM chat_conversations c
    WHERE c.user_id = ? AND c.is_archived = FALSE
    ORDER BY c.updated_at DESC, c.id DESC
    LIMIT ? OFFSET ?
"#;

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Conversation {} not found", id))
}

/// Stored history only holds the learner and the tutor.
fn ensure_not_system(message: &ChatMessage) -> Result<(), AppError> {
    if message.role == Role::System {
        return Err(AppError::BadRequest(
            "System messages are not accepted".to_string(),
        ));
    }
    Ok(())
}

async fn fetch_conversation(
    pool: &SqlitePool,
    user_id: i64,
    id: i64,
) -> Result<Conversation, AppError> {
    sqlx::query_as::<_, Conversation>(
        "SELECT * FROM chat_conversations WHERE id = ? AND user_id = ?",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(id))
}

async fn with_messages(
    pool: &SqlitePool,
    conversation: Conversation,
) -> Result<ConversationDetail, AppError> {
    let messages = sqlx::query_as::<_, StoredMessage>(
        "SELECT * FROM chat_messages WHERE conversation_id = ? ORDER BY id",
    )
    .bind(conversation.id)
    .fetch_all(pool)
    .await?;

    Ok(ConversationDetail {
        conversation,
        messages,
    })
}

/// Starts a conversation with its first message.
pub async fn create_conversation(
    State(pool): State<SqlitePool>,
    Path(user_id): Path<i64>,
    Json(req): Json<CreateConversation>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    ensure_not_system(&req.first_message)?;

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let id = sqlx::query(
        "INSERT INTO chat_conversations (user_id, title, created_at, updated_at)
         VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(req.title.trim())
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    sqlx::query(
        "INSERT INTO chat_messages (conversation_id, role, content, timestamp)
         VALUES (?, ?, ?, ?)",
    )
    .bind(id)
    .bind(req.first_message.role)
    .bind(&req.first_message.content)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to create conversation: {:?}", e);
        AppError::from(e)
    })?;

    let conversation = fetch_conversation(&pool, user_id, id).await?;
    Ok((StatusCode::CREATED, Json(with_messages(&pool, conversation).await?)))
}

/// Lists a user's conversations, most recently active first.
pub async fn list_conversations(
    State(pool): State<SqlitePool>,
    Path(user_id): Path<i64>,
    Query(params): Query<ConversationListParams>,
) -> Result<impl IntoResponse, AppError> {
    let skip = params.skip.unwrap_or(0).max(0);
    let limit = params.limit.unwrap_or(20).clamp(1, 100);

    let summaries = sqlx::query_as::<_, ConversationSummary>(SUMMARY_QUERY)
        .bind(user_id)
        .bind(limit)
        .bind(skip)
        .fetch_all(&pool)
        .await?;

    Ok(Json(summaries))
}

pub async fn recent_conversations(
    State(pool): State<SqlitePool>,
    Path(user_id): Path<i64>,
    Query(params): Query<RecentParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(5).clamp(1, 50);

    let summaries = sqlx::query_as::<_, ConversationSummary>(SUMMARY_QUERY)
        .bind(user_id)
        .bind(limit)
        .bind(0_i64)
        .fetch_all(&pool)
        .await?;

    Ok(Json(summaries))
}

pub async fn get_conversation(
    State(pool): State<SqlitePool>,
    Path((user_id, id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let conversation = fetch_conversation(&pool, user_id, id).await?;
    Ok(Json(with_messages(&pool, conversation).await?))
}

/// Appends a message and marks the conversation as active.
pub async fn add_message(
    State(pool): State<SqlitePool>,
    Path((user_id, id)): Path<(i64, i64)>,
    Json(req): Json<ChatMessage>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    ensure_not_system(&req)?;
    fetch_conversation(&pool, user_id, id).await?;

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let message_id = sqlx::query(
        "INSERT INTO chat_messages (conversation_id, role, content, timestamp)
         VALUES (?, ?, ?, ?)",
    )
    .bind(id)
    .bind(req.role)
    .bind(&req.content)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    sqlx::query("UPDATE chat_conversations SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let message = sqlx::query_as::<_, StoredMessage>("SELECT * FROM chat_messages WHERE id = ?")
        .bind(message_id)
        .fetch_one(&pool)
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn rename_conversation(
    State(pool): State<SqlitePool>,
    Path((user_id, id)): Path<(i64, i64)>,
    Query(params): Query<RenameParams>,
) -> Result<impl IntoResponse, AppError> {
    params.validate()?;

    let updated = sqlx::query(
        "UPDATE chat_conversations SET title = ?, updated_at = ? WHERE id = ? AND user_id = ?",
    )
    .bind(params.new_title.trim())
    .bind(Utc::now())
    .bind(id)
    .bind(user_id)
    .execute(&pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(not_found(id));
    }

    let conversation = fetch_conversation(&pool, user_id, id).await?;
    Ok(Json(with_messages(&pool, conversation).await?))
}

/// Deletes a conversation and all of its messages.
pub async fn delete_conversation(
    State(pool): State<SqlitePool>,
    Path((user_id, id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query("DELETE FROM chat_conversations WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(not_found(id));
    }

    sqlx::query("DELETE FROM chat_messages WHERE conversation_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!("Deleted conversation {} for user {}", id, user_id);

    Ok(StatusCode::NO_CONTENT)
}
