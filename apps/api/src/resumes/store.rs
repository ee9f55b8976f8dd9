use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::models::resume::{generate_resume_id, NewResume, ResumePatch, ResumeRow};

pub const RESUME_NOT_FOUND: &str = "Resume not found";

const RESUME_COLUMNS: &str = "id, name, tags, lastEdited, data";

const MAX_GENERATED_ID_ATTEMPTS: i64 = 1000;

/// Table-backed resume repository bound to one borrowed connection.
/// Callers acquire the connection per request; it goes back to the pool on drop.
pub struct ResumeStore<'a> {
    conn: &'a mut SqliteConnection,
}

impl<'a> ResumeStore<'a> {
    pub fn new(conn: &'a mut SqliteConnection) -> Self {
        ResumeStore { conn }
    }

    /// All resumes, most recently edited first. Ties fall back to id order.
    pub async fn list(&mut self) -> Result<Vec<ResumeRow>, AppError> {
        let rows = sqlx::query_as::<_, ResumeRow>(&format!(
            "SELECT {RESUME_COLUMNS} FROM resumes ORDER BY lastEdited DESC, id ASC"
        ))
        .fetch_all(&mut *self.conn)
        .await?;

        debug!("Listed {} resumes", rows.len());
        Ok(rows)
    }

    pub async fn get(&mut self, id: &str) -> Result<ResumeRow, AppError> {
        let row = sqlx::query_as::<_, ResumeRow>(&format!(
            "SELECT {RESUME_COLUMNS} FROM resumes WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        debug!("Fetched resume {id} (found: {})", row.is_some());
        row.ok_or_else(not_found)
    }

    pub async fn create(&mut self, new: NewResume) -> Result<ResumeRow, AppError> {
        self.create_at(new, Utc::now()).await
    }

    /// Inserts `new` stamped with `now`. A client-supplied id that already exists
    /// is a conflict, never an overwrite. A generated id that collides moves on to
    /// the next millisecond.
    pub async fn create_at(
        &mut self,
        new: NewResume,
        now: DateTime<Utc>,
    ) -> Result<ResumeRow, AppError> {
        let NewResume {
            mut id,
            id_generated,
            name,
            tags,
            data,
        } = new;

        let mut attempt = 0;
        loop {
            if let Some(row) = self.insert(&id, &name, &tags, &data, now).await? {
                info!("Created resume {id}");
                return Ok(row);
            }
            if !id_generated || attempt >= MAX_GENERATED_ID_ATTEMPTS {
                return Err(AppError::Conflict(format!("Resume {id} already exists")));
            }
            attempt += 1;
            debug!("Generated id {id} is taken, retrying");
            id = generate_resume_id(now + Duration::milliseconds(attempt));
        }
    }

    /// `None` when the id is already taken.
    async fn insert(
        &mut self,
        id: &str,
        name: &str,
        tags: &Value,
        data: &Value,
        now: DateTime<Utc>,
    ) -> Result<Option<ResumeRow>, AppError> {
        let row = sqlx::query_as::<_, ResumeRow>(&format!(
            r#"
            INSERT INTO resumes (id, name, tags, lastEdited, data)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (id) DO NOTHING
            RETURNING {RESUME_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(Json(tags))
        .bind(now)
        .bind(Json(data))
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(row)
    }

    pub async fn update(&mut self, id: &str, patch: ResumePatch) -> Result<ResumeRow, AppError> {
        self.update_at(id, patch, Utc::now()).await
    }

    /// Overwrites the fields present in `patch` and bumps `lastEdited` to
    /// `max(now, previous)`, even when nothing else changes.
    /// Concurrent updates to one id are last-writer-wins.
    pub async fn update_at(
        &mut self,
        id: &str,
        patch: ResumePatch,
        now: DateTime<Utc>,
    ) -> Result<ResumeRow, AppError> {
        let ResumePatch { name, tags, data } = patch;

        let row = sqlx::query_as::<_, ResumeRow>(&format!(
            r#"
            UPDATE resumes
            SET name = COALESCE(?, name),
                tags = COALESCE(?, tags),
                data = COALESCE(?, data),
                lastEdited = MAX(?, lastEdited)
            WHERE id = ?
            RETURNING {RESUME_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(tags.map(Json))
        .bind(data.map(Json))
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        let row = row.ok_or_else(not_found)?;
        info!("Updated resume {id}");
        Ok(row)
    }

    pub async fn delete(&mut self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM resumes WHERE id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        info!("Deleted resume {id}");
        Ok(())
    }
}

fn not_found() -> AppError {
    AppError::NotFound(RESUME_NOT_FOUND.to_string())
}
