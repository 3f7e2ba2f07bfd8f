use sqlx::PgPool;

use crate::db::models::SchoolClass;

pub(crate) const COLUMNS: &str = "id, branch_id, name, teacher_id, created_at";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<SchoolClass>, sqlx::Error> {
    sqlx::query_as::<_, SchoolClass>(&format!("SELECT {COLUMNS} FROM school_classes WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_name_in_branch(
    pool: &PgPool,
    branch_id: &str,
    name: &str,
) -> Result<Option<SchoolClass>, sqlx::Error> {
    sqlx::query_as::<_, SchoolClass>(&format!(
        "SELECT {COLUMNS} FROM school_classes WHERE branch_id = $1 AND name = $2"
    ))
    .bind(branch_id)
    .bind(name)
    .fetch_optional(pool)
    .await
}
