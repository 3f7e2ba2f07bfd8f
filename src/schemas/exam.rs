use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};
use validator::Validate;

pub(crate) use crate::core::time::format_primitive;
use crate::db::models::{Exam, Question, Subject};
use crate::db::types::ExamKind;
use crate::services::schedule::ExamInterval;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub(crate) text: String,
    #[validate(length(min = 2, message = "a question needs at least two options"))]
    pub(crate) options: Vec<String>,
    #[serde(alias = "correctIndex")]
    #[validate(range(min = 0, message = "correct_index must be non-negative"))]
    pub(crate) correct_index: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct SubjectCreate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) questions: Vec<QuestionCreate>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(alias = "examKind")]
    pub(crate) kind: ExamKind,
    #[serde(alias = "subjectKind")]
    #[validate(length(min = 1, message = "subject_kind must not be empty"))]
    pub(crate) subject_kind: String,
    #[serde(alias = "className")]
    #[validate(length(min = 1, message = "class_name must not be empty"))]
    pub(crate) class_name: String,
    #[serde(alias = "startTime", deserialize_with = "deserialize_offset_datetime_flexible")]
    pub(crate) start_time: OffsetDateTime,
    #[serde(alias = "durationHours")]
    #[validate(range(exclusive_min = 0.0, message = "duration_hours must be positive"))]
    pub(crate) duration_hours: f64,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) subjects: Vec<SubjectCreate>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default, alias = "examKind")]
    pub(crate) kind: Option<ExamKind>,
    #[serde(default, alias = "subjectKind")]
    #[validate(length(min = 1, message = "subject_kind must not be empty"))]
    pub(crate) subject_kind: Option<String>,
    #[serde(
        default,
        alias = "startTime",
        deserialize_with = "deserialize_option_offset_datetime_flexible"
    )]
    pub(crate) start_time: Option<OffsetDateTime>,
    #[serde(default, alias = "durationHours")]
    #[validate(range(exclusive_min = 0.0, message = "duration_hours must be positive"))]
    pub(crate) duration_hours: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) subject_id: String,
    pub(crate) text: String,
    pub(crate) options: Vec<String>,
    pub(crate) correct_index: i32,
    pub(crate) position: i32,
}

/// Student-facing question shape; the correct index never leaves the server.
#[derive(Debug, Serialize)]
pub(crate) struct StudentQuestionResponse {
    pub(crate) id: String,
    pub(crate) subject_id: String,
    pub(crate) text: String,
    pub(crate) options: Vec<String>,
    pub(crate) position: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubjectResponse<Q> {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) position: i32,
    pub(crate) questions: Vec<Q>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) kind: ExamKind,
    pub(crate) subject_kind: String,
    pub(crate) class_id: String,
    pub(crate) branch_id: String,
    pub(crate) start_time: String,
    pub(crate) end_time: String,
    pub(crate) duration_hours: f64,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

/// Staff view of an exam together with its full subject and question tree.
#[derive(Debug, Serialize)]
pub(crate) struct ExamDetailResponse {
    #[serde(flatten)]
    pub(crate) exam: ExamResponse,
    pub(crate) subjects: Vec<SubjectResponse<QuestionResponse>>,
}

pub(crate) fn exam_to_response(exam: Exam) -> ExamResponse {
    let interval = ExamInterval::new(exam.start_time, exam.duration_hours);
    ExamResponse {
        id: exam.id,
        title: exam.title,
        kind: exam.kind,
        subject_kind: exam.subject_kind,
        class_id: exam.class_id,
        branch_id: exam.branch_id,
        start_time: format_primitive(interval.start),
        end_time: format_primitive(interval.end),
        duration_hours: exam.duration_hours,
        created_by: exam.created_by,
        created_at: format_primitive(exam.created_at),
        updated_at: format_primitive(exam.updated_at),
    }
}

pub(crate) fn question_to_response(question: Question) -> QuestionResponse {
    QuestionResponse {
        id: question.id,
        subject_id: question.subject_id,
        text: question.text,
        options: question.options.0,
        correct_index: question.correct_index,
        position: question.position,
    }
}

pub(crate) fn question_to_student_response(question: Question) -> StudentQuestionResponse {
    StudentQuestionResponse {
        id: question.id,
        subject_id: question.subject_id,
        text: question.text,
        options: question.options.0,
        position: question.position,
    }
}

pub(crate) fn subjects_to_responses<Q>(
    subjects: Vec<Subject>,
    mut questions: Vec<Question>,
    convert: impl Fn(Question) -> Q,
) -> Vec<SubjectResponse<Q>> {
    subjects
        .into_iter()
        .map(|subject| {
            let (own, rest): (Vec<_>, Vec<_>) =
                questions.drain(..).partition(|question| question.subject_id == subject.id);
            questions = rest;
            SubjectResponse {
                id: subject.id,
                title: subject.title,
                position: subject.position,
                questions: own.into_iter().map(&convert).collect(),
            }
        })
        .collect()
}

fn parse_offset_datetime_flexible(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    // Admin frontends often send datetime-local values without a zone.
    if raw.len() == 16 && raw.as_bytes().get(10) == Some(&b'T') {
        let candidate = format!("{raw}:00Z");
        if let Ok(value) = OffsetDateTime::parse(&candidate, &Rfc3339) {
            return Some(value);
        }
    }

    if raw.len() == 19 && raw.as_bytes().get(10) == Some(&b'T') {
        let candidate = format!("{raw}Z");
        if let Ok(value) = OffsetDateTime::parse(&candidate, &Rfc3339) {
            return Some(value);
        }
    }

    if let Ok(value) =
        PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(value.assume_utc());
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }

    None
}

fn deserialize_offset_datetime_flexible<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_offset_datetime_flexible(&raw)
        .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
}

fn deserialize_option_offset_datetime_flexible<'de, D>(
    deserializer: D,
) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) => parse_offset_datetime_flexible(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {value}")))
            .map(Some),
        None => Ok(None),
    }
}
