use sqlx::{PgExecutor, PgPool};
use time::PrimitiveDateTime;

use crate::db::models::Subject;

pub(crate) const COLUMNS: &str = "id, exam_id, title, position, created_at";

pub(crate) struct CreateSubject<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) position: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    params: CreateSubject<'_>,
) -> Result<Subject, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "INSERT INTO subjects (id, exam_id, title, position, created_at) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.title)
    .bind(params.position)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_by_exam(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "SELECT {COLUMNS} FROM subjects WHERE exam_id = $1 ORDER BY position, title"
    ))
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_by_exam(pool: &PgPool, exam_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM subjects WHERE exam_id = $1")
        .bind(exam_id)
        .fetch_one(pool)
        .await
}
