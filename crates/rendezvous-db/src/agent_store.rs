//! Agent profile persistence in `PostgreSQL`.

use rendezvous_types::{AgentId, AgentProfile, AgentType};
use sqlx::PgPool;
use sqlx::types::Json;

use crate::error::{DbError, unique_violation};

/// Operations on the `agents` table.
pub struct AgentStore<'a> {
    pool: &'a PgPool,
}

impl<'a> AgentStore<'a> {
    /// Bind to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a profile.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::AlreadyExists`] if the id or username is taken.
    pub async fn insert(&self, profile: &AgentProfile) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO agents (id, username, agent_type, document, created_at)
              VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(profile.id.into_inner())
        .bind(&profile.username)
        .bind(profile.agent_type.as_str())
        .bind(Json(profile))
        .bind(profile.created_at)
        .execute(self.pool)
        .await
        .map_err(|e| unique_violation(e, || format!("username '{}' already exists", profile.username)))?;
        Ok(())
    }

    /// Fetch one profile.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, id: AgentId) -> Result<Option<AgentProfile>, DbError> {
        let row: Option<(Json<AgentProfile>,)> =
            sqlx::query_as(r"SELECT document FROM agents WHERE id = $1")
                .bind(id.into_inner())
                .fetch_optional(self.pool)
                .await?;
        Ok(row.map(|(Json(profile),)| profile))
    }

    /// Fetch one profile by username.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<AgentProfile>, DbError> {
        let row: Option<(Json<AgentProfile>,)> =
            sqlx::query_as(r"SELECT document FROM agents WHERE username = $1")
                .bind(username)
                .fetch_optional(self.pool)
                .await?;
        Ok(row.map(|(Json(profile),)| profile))
    }

    /// List profiles newest first, optionally of one type.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(&self, agent_type: Option<AgentType>) -> Result<Vec<AgentProfile>, DbError> {
        let rows: Vec<(Json<AgentProfile>,)> = sqlx::query_as(
            r"SELECT document FROM agents
              WHERE ($1::TEXT IS NULL OR agent_type = $1)
              ORDER BY created_at DESC, id DESC",
        )
        .bind(agent_type.map(AgentType::as_str))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(|(Json(profile),)| profile).collect())
    }

    /// Replace a stored profile.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no profile has this id and
    /// [`DbError::AlreadyExists`] if the new username is taken.
    pub async fn update(&self, profile: &AgentProfile) -> Result<(), DbError> {
        let result = sqlx::query(
            r"UPDATE agents SET username = $2, document = $3 WHERE id = $1",
        )
        .bind(profile.id.into_inner())
        .bind(&profile.username)
        .bind(Json(profile))
        .execute(self.pool)
        .await
        .map_err(|e| unique_violation(e, || format!("username '{}' already exists", profile.username)))?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("agent", profile.id));
        }
        Ok(())
    }

    /// Delete a profile. Conversations and matches cascade.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete(&self, id: AgentId) -> Result<bool, DbError> {
        let result = sqlx::query(r"DELETE FROM agents WHERE id = $1")
            .bind(id.into_inner())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every profile. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete_all(&self) -> Result<u64, DbError> {
        let result = sqlx::query(r"DELETE FROM agents").execute(self.pool).await?;
        Ok(result.rows_affected())
    }
}
