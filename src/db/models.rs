use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{ExamKind, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) branch_id: Option<String>,
    pub(crate) class_id: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct SchoolClass {
    pub(crate) id: String,
    pub(crate) branch_id: String,
    pub(crate) name: String,
    pub(crate) teacher_id: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Term {
    pub(crate) id: String,
    pub(crate) branch_id: String,
    pub(crate) title: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) kind: ExamKind,
    pub(crate) subject_kind: String,
    pub(crate) class_id: String,
    pub(crate) branch_id: String,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) duration_hours: f64,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Subject {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) title: String,
    pub(crate) position: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) subject_id: String,
    pub(crate) exam_id: String,
    pub(crate) text: String,
    pub(crate) options: Json<Vec<String>>,
    pub(crate) correct_index: i32,
    pub(crate) position: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamResult {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) class_id: String,
    pub(crate) branch_id: String,
    pub(crate) term_id: Option<String>,
    pub(crate) raw_score: i32,
    pub(crate) percentage: f64,
    pub(crate) total_questions: i32,
    pub(crate) attempted: i32,
    pub(crate) answers: Json<serde_json::Value>,
    pub(crate) is_published: bool,
    pub(crate) published_by: Option<String>,
    pub(crate) published_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
}
