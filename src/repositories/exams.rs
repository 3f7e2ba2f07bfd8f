use sqlx::{PgExecutor, PgPool};
use time::PrimitiveDateTime;

use crate::db::models::Exam;
use crate::db::types::ExamKind;

pub(crate) const COLUMNS: &str = "\
    id, title, kind, subject_kind, class_id, branch_id, start_time, duration_hours, \
    created_by, created_at, updated_at";

pub(crate) struct CreateExam<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) kind: ExamKind,
    pub(crate) subject_kind: &'a str,
    pub(crate) class_id: &'a str,
    pub(crate) branch_id: &'a str,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) duration_hours: f64,
    pub(crate) created_by: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    params: CreateExam<'_>,
) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (id, title, kind, subject_kind, class_id, branch_id, start_time, \
         duration_hours, created_by, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10) \
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.kind)
    .bind(params.subject_kind)
    .bind(params.class_id)
    .bind(params.branch_id)
    .bind(params.start_time)
    .bind(params.duration_hours)
    .bind(params.created_by)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_by_branch(
    pool: &PgPool,
    branch_id: Option<&str>,
) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams \
         WHERE ($1::TEXT IS NULL OR branch_id = $1) \
         ORDER BY start_time DESC"
    ))
    .bind(branch_id)
    .fetch_all(pool)
    .await
}

/// Exams a student of this class and category may sit, soonest first.
pub(crate) async fn list_for_class_and_kind(
    pool: &PgPool,
    class_id: &str,
    kind: ExamKind,
) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams \
         WHERE class_id = $1 AND kind = $2 \
         ORDER BY start_time"
    ))
    .bind(class_id)
    .bind(kind)
    .fetch_all(pool)
    .await
}

pub(crate) struct UpdateExam<'a> {
    pub(crate) title: &'a str,
    pub(crate) kind: ExamKind,
    pub(crate) subject_kind: &'a str,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) duration_hours: f64,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn update(
    executor: impl PgExecutor<'_>,
    id: &str,
    params: UpdateExam<'_>,
) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "UPDATE exams SET title = $1, kind = $2, subject_kind = $3, start_time = $4, \
         duration_hours = $5, updated_at = $6 WHERE id = $7 \
         RETURNING {COLUMNS}"
    ))
    .bind(params.title)
    .bind(params.kind)
    .bind(params.subject_kind)
    .bind(params.start_time)
    .bind(params.duration_hours)
    .bind(params.updated_at)
    .bind(id)
    .fetch_one(executor)
    .await
}

/// Locks the exam row for the rest of the transaction. Inserts into
/// `exam_results` take a key-share lock on the referenced exam, so they
/// queue behind this.
pub(crate) async fn lock_by_id(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn delete_by_id(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM exams WHERE id = $1").bind(id).execute(executor).await?;
    Ok(())
}
