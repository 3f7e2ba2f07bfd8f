use std::collections::HashMap;

use sqlx::PgConnection;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::time::format_primitive;
use crate::db::models::{Exam, ExamResult, Question, User};
use crate::repositories;
use crate::schemas::submission::AnswerPayload;
use crate::services::access_window::{ExamWindow, WindowState};
use crate::services::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GradeOutcome {
    pub(crate) raw_score: i32,
    pub(crate) attempted: i32,
    pub(crate) total_questions: i32,
    pub(crate) percentage: f64,
}

/// Selected option indices arrive from clients as JSON numbers or numeric
/// strings; both forms compare equal ("1" == 1).
pub(crate) fn normalize_choice(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(number) => number.as_i64(),
        serde_json::Value::String(raw) => raw.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub(crate) fn answer_key(questions: &[Question]) -> HashMap<String, i64> {
    questions
        .iter()
        .map(|question| (question.id.clone(), i64::from(question.correct_index)))
        .collect()
}

/// Pure grading over the canonical answer key. Unrecognized question ids are
/// ignored; a question id repeated in the submission counts once, last
/// occurrence wins.
pub(crate) fn grade(answers: &[AnswerPayload], key: &HashMap<String, i64>) -> GradeOutcome {
    let mut selected: HashMap<&str, Option<i64>> = HashMap::new();
    for answer in answers {
        if key.contains_key(answer.question_id.as_str()) {
            selected.insert(&answer.question_id, normalize_choice(&answer.selected_option_index));
        }
    }

    let raw_score = selected
        .iter()
        .filter(|(question_id, choice)| {
            choice.is_some() && key.get(**question_id).copied() == **choice
        })
        .count() as i32;

    let attempted = selected.len() as i32;
    let total_questions = key.len() as i32;
    let percentage = if total_questions == 0 {
        0.0
    } else {
        f64::from(raw_score) / f64::from(total_questions) * 100.0
    };

    GradeOutcome { raw_score, attempted, total_questions, percentage }
}

/// Grades and persists exactly one result for `(exam, student)`.
///
/// Runs inside the caller's transaction. The duplicate pre-check and the
/// `ON CONFLICT DO NOTHING` insert together guarantee at most one row per
/// pair even when two submissions race; the unique constraint is the
/// authoritative backstop.
pub(crate) async fn submit_answers(
    conn: &mut PgConnection,
    exam: &Exam,
    student: &User,
    answers: &[AnswerPayload],
    window: &ExamWindow,
    now: PrimitiveDateTime,
    term_id: Option<String>,
) -> Result<ExamResult, DomainError> {
    if window.submit_state(now) == WindowState::Closed {
        return Err(DomainError::WindowClosed {
            closes_at: format_primitive(window.closes_at()),
        });
    }

    if repositories::results::exists(&mut *conn, &exam.id, &student.id).await? {
        metrics::counter!("cbt_duplicate_submissions_total").increment(1);
        return Err(DomainError::AlreadySubmitted);
    }

    let questions = repositories::questions::list_by_exam(&mut *conn, &exam.id).await?;
    if questions.is_empty() {
        return Err(DomainError::NoQuestions);
    }

    let outcome = grade(answers, &answer_key(&questions));
    let raw_answers = serde_json::to_value(answers)
        .map_err(|err| DomainError::Validation(format!("unserializable answers: {err}")))?;

    let inserted = repositories::results::insert(
        &mut *conn,
        repositories::results::CreateResult {
            id: &Uuid::new_v4().to_string(),
            exam_id: &exam.id,
            student_id: &student.id,
            class_id: &exam.class_id,
            branch_id: &exam.branch_id,
            term_id: term_id.as_deref(),
            raw_score: outcome.raw_score,
            percentage: outcome.percentage,
            total_questions: outcome.total_questions,
            attempted: outcome.attempted,
            answers: raw_answers,
            created_at: now,
        },
    )
    .await?;

    if !inserted {
        // Lost the race to a concurrent submission after the pre-check.
        metrics::counter!("cbt_duplicate_submissions_total").increment(1);
        return Err(DomainError::AlreadySubmitted);
    }

    let result = repositories::results::find_by_exam_student(&mut *conn, &exam.id, &student.id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    tracing::info!(
        exam_id = %exam.id,
        student_id = %student.id,
        raw_score = outcome.raw_score,
        total_questions = outcome.total_questions,
        "Submission graded"
    );
    metrics::counter!("cbt_submissions_graded_total").increment(1);

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn answer(question_id: &str, choice: serde_json::Value) -> AnswerPayload {
        AnswerPayload { question_id: question_id.to_string(), selected_option_index: choice }
    }

    fn key(entries: &[(&str, i64)]) -> HashMap<String, i64> {
        entries.iter().map(|(id, index)| (id.to_string(), *index)).collect()
    }

    #[test]
    fn full_marks_for_all_correct() {
        let outcome =
            grade(&[answer("q1", json!(1)), answer("q2", json!(0))], &key(&[("q1", 1), ("q2", 0)]));
        assert_eq!(outcome.raw_score, 2);
        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.total_questions, 2);
        assert_eq!(outcome.percentage, 100.0);
    }

    #[test]
    fn string_encoded_index_matches_numeric_key() {
        let outcome = grade(&[answer("q1", json!("1"))], &key(&[("q1", 1), ("q2", 0)]));
        assert_eq!(outcome.raw_score, 1);
        assert_eq!(outcome.percentage, 50.0);
    }

    #[test]
    fn unrecognized_question_ids_are_ignored() {
        let outcome =
            grade(&[answer("q1", json!(1)), answer("ghost", json!(0))], &key(&[("q1", 1)]));
        assert_eq!(outcome.raw_score, 1);
        assert_eq!(outcome.attempted, 1);
        assert_eq!(outcome.percentage, 100.0);
    }

    #[test]
    fn wrong_choice_scores_zero_but_counts_attempted() {
        let outcome = grade(&[answer("q1", json!(2))], &key(&[("q1", 1), ("q2", 0)]));
        assert_eq!(outcome.raw_score, 0);
        assert_eq!(outcome.attempted, 1);
        assert_eq!(outcome.percentage, 0.0);
    }

    #[test]
    fn duplicate_question_id_counts_once_last_wins() {
        let outcome =
            grade(&[answer("q1", json!(0)), answer("q1", json!(1))], &key(&[("q1", 1)]));
        assert_eq!(outcome.attempted, 1);
        assert_eq!(outcome.raw_score, 1);
    }

    #[test]
    fn non_numeric_choice_never_matches() {
        let outcome = grade(&[answer("q1", json!(null)), answer("q2", json!([1]))], &key(&[
            ("q1", 0),
            ("q2", 1),
        ]));
        assert_eq!(outcome.raw_score, 0);
        assert_eq!(outcome.attempted, 2);
    }

    #[test]
    fn empty_key_guards_division_by_zero() {
        let outcome = grade(&[answer("q1", json!(0))], &HashMap::new());
        assert_eq!(outcome.total_questions, 0);
        assert_eq!(outcome.percentage, 0.0);
    }

    #[test]
    fn grading_is_deterministic() {
        let answers = [answer("q1", json!(1)), answer("q2", json!("0")), answer("q3", json!(3))];
        let key = key(&[("q1", 1), ("q2", 0), ("q3", 2)]);
        let first = grade(&answers, &key);
        let second = grade(&answers, &key);
        assert_eq!(first, second);
        assert_eq!(first.raw_score, 2);
    }

    #[test]
    fn normalize_choice_accepts_numbers_and_numeric_strings() {
        assert_eq!(normalize_choice(&json!(2)), Some(2));
        assert_eq!(normalize_choice(&json!("2")), Some(2));
        assert_eq!(normalize_choice(&json!(" 2 ")), Some(2));
        assert_eq!(normalize_choice(&json!("two")), None);
        assert_eq!(normalize_choice(&json!(1.5)), None);
        assert_eq!(normalize_choice(&json!(null)), None);
    }
}
