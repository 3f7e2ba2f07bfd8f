use serde::{Deserialize, Serialize};
use validator::Validate;

pub(crate) use crate::core::time::format_primitive;
use crate::db::models::{Exam, ExamResult};
use crate::db::types::ExamKind;
use crate::schemas::exam::{StudentQuestionResponse, SubjectResponse};
use crate::services::access_window::ExamWindow;

/// One selected option for one question. The index is kept as raw JSON so
/// numeric and string-encoded forms both survive to grading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AnswerPayload {
    #[serde(alias = "questionId")]
    pub(crate) question_id: String,
    #[serde(alias = "selectedOptionIndex")]
    pub(crate) selected_option_index: serde_json::Value,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmitAnswersPayload {
    #[serde(default)]
    pub(crate) answers: Vec<AnswerPayload>,
}

/// Acknowledgment only; the score stays server-side until results are
/// published for the class.
#[derive(Debug, Serialize)]
pub(crate) struct SubmissionAck {
    pub(crate) message: String,
    pub(crate) result_id: String,
    pub(crate) exam_id: String,
    pub(crate) attempted: i32,
    pub(crate) total_questions: i32,
    pub(crate) submitted_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentExamResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) kind: ExamKind,
    pub(crate) subject_kind: String,
    pub(crate) start_time: String,
    pub(crate) opens_at: String,
    pub(crate) closes_at: String,
    pub(crate) duration_hours: f64,
}

/// Question paper handed to a student once the access window is open.
#[derive(Debug, Serialize)]
pub(crate) struct StudentQuestionsResponse {
    pub(crate) exam: StudentExamResponse,
    pub(crate) subjects: Vec<SubjectResponse<StudentQuestionResponse>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentResultResponse {
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) raw_score: i32,
    pub(crate) percentage: f64,
    pub(crate) total_questions: i32,
    pub(crate) attempted: i32,
    pub(crate) term_id: Option<String>,
    pub(crate) published_at: Option<String>,
    pub(crate) rank: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResultResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) class_id: String,
    pub(crate) term_id: Option<String>,
    pub(crate) raw_score: i32,
    pub(crate) percentage: f64,
    pub(crate) total_questions: i32,
    pub(crate) attempted: i32,
    pub(crate) is_published: bool,
    pub(crate) published_by: Option<String>,
    pub(crate) published_at: Option<String>,
    pub(crate) created_at: String,
}

pub(crate) fn student_exam_to_response(exam: Exam, window: &ExamWindow) -> StudentExamResponse {
    StudentExamResponse {
        id: exam.id,
        title: exam.title,
        kind: exam.kind,
        subject_kind: exam.subject_kind,
        start_time: format_primitive(window.start()),
        opens_at: format_primitive(window.opens_at()),
        closes_at: format_primitive(window.closes_at()),
        duration_hours: exam.duration_hours,
    }
}

pub(crate) fn result_to_response(result: ExamResult) -> ResultResponse {
    ResultResponse {
        id: result.id,
        exam_id: result.exam_id,
        student_id: result.student_id,
        class_id: result.class_id,
        term_id: result.term_id,
        raw_score: result.raw_score,
        percentage: result.percentage,
        total_questions: result.total_questions,
        attempted: result.attempted,
        is_published: result.is_published,
        published_by: result.published_by,
        published_at: result.published_at.map(format_primitive),
        created_at: format_primitive(result.created_at),
    }
}
