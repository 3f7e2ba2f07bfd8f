use sqlx::{PgExecutor, PgPool};
use time::PrimitiveDateTime;

use crate::db::models::ExamResult;

pub(crate) const COLUMNS: &str = "\
    id, exam_id, student_id, class_id, branch_id, term_id, raw_score, percentage, \
    total_questions, attempted, answers, is_published, published_by, published_at, created_at";

pub(crate) struct CreateResult<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) class_id: &'a str,
    pub(crate) branch_id: &'a str,
    pub(crate) term_id: Option<&'a str>,
    pub(crate) raw_score: i32,
    pub(crate) percentage: f64,
    pub(crate) total_questions: i32,
    pub(crate) attempted: i32,
    pub(crate) answers: serde_json::Value,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn exists(
    executor: impl PgExecutor<'_>,
    exam_id: &str,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    let found: Option<i32> =
        sqlx::query_scalar("SELECT 1 FROM exam_results WHERE exam_id = $1 AND student_id = $2")
            .bind(exam_id)
            .bind(student_id)
            .fetch_optional(executor)
            .await?;
    Ok(found.is_some())
}

/// Returns false when the unique `(exam_id, student_id)` constraint absorbed
/// the insert, i.e. a result already existed.
pub(crate) async fn insert(
    executor: impl PgExecutor<'_>,
    params: CreateResult<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO exam_results (id, exam_id, student_id, class_id, branch_id, term_id, \
         raw_score, percentage, total_questions, attempted, answers, is_published, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, FALSE, $12) \
         ON CONFLICT (exam_id, student_id) DO NOTHING",
    )
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.student_id)
    .bind(params.class_id)
    .bind(params.branch_id)
    .bind(params.term_id)
    .bind(params.raw_score)
    .bind(params.percentage)
    .bind(params.total_questions)
    .bind(params.attempted)
    .bind(sqlx::types::Json(params.answers))
    .bind(params.created_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn find_by_exam_student(
    executor: impl PgExecutor<'_>,
    exam_id: &str,
    student_id: &str,
) -> Result<Option<ExamResult>, sqlx::Error> {
    sqlx::query_as::<_, ExamResult>(&format!(
        "SELECT {COLUMNS} FROM exam_results WHERE exam_id = $1 AND student_id = $2"
    ))
    .bind(exam_id)
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_by_exam(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<ExamResult>, sqlx::Error> {
    sqlx::query_as::<_, ExamResult>(&format!(
        "SELECT {COLUMNS} FROM exam_results WHERE exam_id = $1 ORDER BY percentage DESC"
    ))
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

/// A published result joined with its exam's title, so the result list
/// needs no follow-up lookups.
#[derive(sqlx::FromRow)]
pub(crate) struct PublishedResult {
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) class_id: String,
    pub(crate) raw_score: i32,
    pub(crate) percentage: f64,
    pub(crate) total_questions: i32,
    pub(crate) attempted: i32,
    pub(crate) term_id: Option<String>,
    pub(crate) published_at: Option<PrimitiveDateTime>,
}

pub(crate) async fn list_published_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<PublishedResult>, sqlx::Error> {
    sqlx::query_as::<_, PublishedResult>(
        "SELECT r.exam_id, e.title AS exam_title, r.class_id, r.raw_score, r.percentage, \
         r.total_questions, r.attempted, r.term_id, r.published_at \
         FROM exam_results r \
         JOIN exams e ON e.id = r.exam_id \
         WHERE r.student_id = $1 AND r.is_published \
         ORDER BY r.created_at DESC",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn published_percentages(
    pool: &PgPool,
    exam_id: &str,
    class_id: &str,
) -> Result<Vec<f64>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT percentage FROM exam_results \
         WHERE exam_id = $1 AND class_id = $2 AND is_published \
         ORDER BY percentage DESC",
    )
    .bind(exam_id)
    .bind(class_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_by_exam(
    executor: impl PgExecutor<'_>,
    exam_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM exam_results WHERE exam_id = $1")
        .bind(exam_id)
        .fetch_one(executor)
        .await
}

/// Flips the publication flag on every unpublished result of the exam's
/// class; already-published rows keep their original publisher and timestamp.
pub(crate) async fn publish_for_exam_class(
    pool: &PgPool,
    exam_id: &str,
    class_id: &str,
    published_by: &str,
    published_at: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exam_results \
         SET is_published = TRUE, published_by = $1, published_at = $2 \
         WHERE exam_id = $3 AND class_id = $4 AND NOT is_published",
    )
    .bind(published_by)
    .bind(published_at)
    .bind(exam_id)
    .bind(class_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
