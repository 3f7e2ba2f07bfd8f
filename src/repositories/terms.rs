use sqlx::PgExecutor;

use crate::db::models::Term;

pub(crate) const COLUMNS: &str = "id, branch_id, title, is_active, created_at";

pub(crate) async fn find_active_for_branch(
    executor: impl PgExecutor<'_>,
    branch_id: &str,
) -> Result<Option<Term>, sqlx::Error> {
    sqlx::query_as::<_, Term>(&format!(
        "SELECT {COLUMNS} FROM terms \
         WHERE branch_id = $1 AND is_active \
         ORDER BY created_at DESC LIMIT 1"
    ))
    .bind(branch_id)
    .fetch_optional(executor)
    .await
}
