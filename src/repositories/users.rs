use sqlx::PgPool;

use crate::db::models::User;

pub(crate) const COLUMNS: &str =
    "id, username, full_name, role, branch_id, class_id, is_active, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}
