//! Conversation and match persistence in `PostgreSQL`.
//!
//! Turns are appended in place with `jsonb` concatenation so a live
//! conversation never rewrites its whole transcript.

use rendezvous_types::{
    AgentId, ConversationId, ConversationRecord, ConversationStatus, ConversationTurn, MatchRecord,
};
use sqlx::PgPool;
use sqlx::types::Json;

use crate::error::{DbError, unique_violation};
use crate::store::Completion;

/// Operations on the `conversations` and `matches` tables.
pub struct ConversationStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ConversationStore<'a> {
    /// Bind to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new conversation record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::AlreadyExists`] if the id is taken.
    pub async fn insert(&self, record: &ConversationRecord) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO conversations (id, recruiter_id, candidate_id, status, document, created_at)
              VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(record.id.into_inner())
        .bind(record.recruiter.agent_id.into_inner())
        .bind(record.candidate.agent_id.into_inner())
        .bind(status_to_db(record.status))
        .bind(Json(record))
        .bind(record.created_at)
        .execute(self.pool)
        .await
        .map_err(|e| unique_violation(e, || format!("conversation {} already exists", record.id)))?;
        Ok(())
    }

    /// Fetch one conversation.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, id: ConversationId) -> Result<Option<ConversationRecord>, DbError> {
        let row: Option<(Json<ConversationRecord>,)> =
            sqlx::query_as(r"SELECT document FROM conversations WHERE id = $1")
                .bind(id.into_inner())
                .fetch_optional(self.pool)
                .await?;
        Ok(row.map(|(Json(record),)| record))
    }

    /// List conversations newest first, optionally involving one agent.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(&self, agent_id: Option<AgentId>) -> Result<Vec<ConversationRecord>, DbError> {
        let rows: Vec<(Json<ConversationRecord>,)> = sqlx::query_as(
            r"SELECT document FROM conversations
              WHERE ($1::UUID IS NULL OR recruiter_id = $1 OR candidate_id = $1)
              ORDER BY created_at DESC, id DESC",
        )
        .bind(agent_id.map(AgentId::into_inner))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(|(Json(record),)| record).collect())
    }

    /// Append one turn to the transcript.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the conversation does not exist.
    pub async fn append_turn(
        &self,
        id: ConversationId,
        turn: &ConversationTurn,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            r"UPDATE conversations
              SET document = jsonb_set(document, '{turns}', (document->'turns') || jsonb_build_array($2::JSONB))
              WHERE id = $1",
        )
        .bind(id.into_inner())
        .bind(Json(turn))
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("conversation", id));
        }
        Ok(())
    }

    /// Mark a conversation completed and return the updated record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the conversation does not exist.
    pub async fn complete(
        &self,
        id: ConversationId,
        completion: &Completion,
    ) -> Result<ConversationRecord, DbError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(Json<ConversationRecord>,)> =
            sqlx::query_as(r"SELECT document FROM conversations WHERE id = $1 FOR UPDATE")
                .bind(id.into_inner())
                .fetch_optional(&mut *tx)
                .await?;
        let Some((Json(mut record),)) = row else {
            return Err(DbError::not_found("conversation", id));
        };
        completion.apply(&mut record);

        sqlx::query(r"UPDATE conversations SET status = $2, document = $3 WHERE id = $1")
            .bind(id.into_inner())
            .bind(status_to_db(record.status))
            .bind(Json(&record))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(record)
    }

    /// Insert a match record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::AlreadyExists`] if the id is taken.
    pub async fn insert_match(&self, record: &MatchRecord) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO matches (id, conversation_id, recruiter_id, candidate_id, score, document, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(record.id.into_inner())
        .bind(record.conversation_id.into_inner())
        .bind(record.recruiter.agent_id.into_inner())
        .bind(record.candidate.agent_id.into_inner())
        .bind(i16::from(record.score))
        .bind(Json(record))
        .bind(record.created_at)
        .execute(self.pool)
        .await
        .map_err(|e| unique_violation(e, || format!("match {} already exists", record.id)))?;
        Ok(())
    }

    /// List matches newest first, optionally at or above a score.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list_matches(&self, min_score: Option<u8>) -> Result<Vec<MatchRecord>, DbError> {
        let rows: Vec<(Json<MatchRecord>,)> = sqlx::query_as(
            r"SELECT document FROM matches
              WHERE ($1::SMALLINT IS NULL OR score >= $1)
              ORDER BY created_at DESC, id DESC",
        )
        .bind(min_score.map(i16::from))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(|(Json(record),)| record).collect())
    }
}

const fn status_to_db(status: ConversationStatus) -> &'static str {
    match status {
        ConversationStatus::InProgress => "in_progress",
        ConversationStatus::Completed => "completed",
    }
}
