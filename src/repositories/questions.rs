use sqlx::PgExecutor;
use time::PrimitiveDateTime;

use crate::db::models::Question;

pub(crate) const COLUMNS: &str =
    "id, subject_id, exam_id, text, options, correct_index, position, created_at";

pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) subject_id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) text: &'a str,
    pub(crate) options: &'a [String],
    pub(crate) correct_index: i32,
    pub(crate) position: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    params: CreateQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (id, subject_id, exam_id, text, options, correct_index, position, \
         created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.subject_id)
    .bind(params.exam_id)
    .bind(params.text)
    .bind(sqlx::types::Json(params.options))
    .bind(params.correct_index)
    .bind(params.position)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

/// The full canonical question set of an exam across all its subjects.
pub(crate) async fn list_by_exam(
    executor: impl PgExecutor<'_>,
    exam_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE exam_id = $1 ORDER BY position, id"
    ))
    .bind(exam_id)
    .fetch_all(executor)
    .await
}
