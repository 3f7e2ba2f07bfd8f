use axum::{routing::get, routing::post, Json, Router};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{own_branch, require_branch_scope, CurrentStaff};
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::db::models::{Exam, Question, Subject, User};
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::exam::{
    exam_to_response, format_primitive, question_to_response, subjects_to_responses, ExamCreate,
    ExamDetailResponse, ExamResponse, ExamUpdate, QuestionResponse, SubjectCreate, SubjectResponse,
};
use crate::schemas::submission::{result_to_response, ResultResponse};
use crate::services::errors::DomainError;
use crate::services::schedule::{self, ExamInterval};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_exam).get(list_exams))
        .route("/:exam_id", get(get_exam).patch(update_exam).delete(delete_exam))
        .route("/:exam_id/subjects", post(add_subject))
        .route("/:exam_id/results", get(list_results))
        .route("/:exam_id/results/publish", post(publish_results))
}

async fn create_exam(
    CurrentStaff(staff): CurrentStaff,
    state: axum::extract::State<AppState>,
    Json(payload): Json<ExamCreate>,
) -> Result<(axum::http::StatusCode, Json<ExamDetailResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    validate_answer_bounds(&payload.subjects)?;

    let branch_id = own_branch(&staff)?.to_string();
    let class = repositories::classes::find_by_name_in_branch(
        state.db(),
        &branch_id,
        &payload.class_name,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to resolve class"))?;

    let Some(class) = class else {
        return Err(ApiError::NotFound(format!(
            "Class '{}' not found in your branch",
            payload.class_name
        )));
    };

    let start_time = to_primitive_utc(payload.start_time);
    let candidate = ExamInterval::new(start_time, payload.duration_hours);
    let now = primitive_now_utc();

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    ensure_no_conflict(&mut tx, &class.id, candidate, None).await?;

    let exam_id = Uuid::new_v4().to_string();
    let exam = repositories::exams::create(
        &mut *tx,
        repositories::exams::CreateExam {
            id: &exam_id,
            title: &payload.title,
            kind: payload.kind,
            subject_kind: &payload.subject_kind,
            class_id: &class.id,
            branch_id: &branch_id,
            start_time,
            duration_hours: payload.duration_hours,
            created_by: &staff.id,
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create exam"))?;

    let (subjects, questions) = insert_subjects(&mut tx, &exam.id, &payload.subjects, 0).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        staff_id = %staff.id,
        exam_id = %exam.id,
        class_id = %exam.class_id,
        action = "exam_create",
        "Exam scheduled"
    );
    metrics::counter!("cbt_exams_created_total").increment(1);

    Ok((
        axum::http::StatusCode::CREATED,
        Json(ExamDetailResponse {
            exam: exam_to_response(exam),
            subjects: subjects_to_responses(subjects, questions, question_to_response),
        }),
    ))
}

async fn list_exams(
    CurrentStaff(staff): CurrentStaff,
    state: axum::extract::State<AppState>,
) -> Result<Json<Vec<ExamResponse>>, ApiError> {
    let branch_filter = if staff.role == UserRole::SuperAdmin {
        None
    } else {
        Some(own_branch(&staff)?)
    };

    let exams = repositories::exams::list_by_branch(state.db(), branch_filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;

    Ok(Json(exams.into_iter().map(exam_to_response).collect()))
}

async fn get_exam(
    axum::extract::Path(exam_id): axum::extract::Path<String>,
    CurrentStaff(staff): CurrentStaff,
    state: axum::extract::State<AppState>,
) -> Result<Json<ExamDetailResponse>, ApiError> {
    let exam = fetch_scoped_exam(state.db(), &staff, &exam_id).await?;

    let subjects = repositories::subjects::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch subjects"))?;
    let questions = repositories::questions::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch questions"))?;

    Ok(Json(ExamDetailResponse {
        exam: exam_to_response(exam),
        subjects: subjects_to_responses(subjects, questions, question_to_response),
    }))
}

async fn update_exam(
    axum::extract::Path(exam_id): axum::extract::Path<String>,
    CurrentStaff(staff): CurrentStaff,
    state: axum::extract::State<AppState>,
    Json(payload): Json<ExamUpdate>,
) -> Result<Json<ExamResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let exam = fetch_scoped_exam(state.db(), &staff, &exam_id).await?;

    let title = payload.title.unwrap_or_else(|| exam.title.clone());
    let kind = payload.kind.unwrap_or(exam.kind);
    let subject_kind = payload.subject_kind.unwrap_or_else(|| exam.subject_kind.clone());
    let start_time = payload.start_time.map(to_primitive_utc).unwrap_or(exam.start_time);
    let duration_hours = payload.duration_hours.unwrap_or(exam.duration_hours);

    let reschedules =
        start_time != exam.start_time || duration_hours != exam.duration_hours;

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    if reschedules {
        let candidate = ExamInterval::new(start_time, duration_hours);
        ensure_no_conflict(&mut tx, &exam.class_id, candidate, Some(&exam.id)).await?;
    }

    let updated = repositories::exams::update(
        &mut *tx,
        &exam.id,
        repositories::exams::UpdateExam {
            title: &title,
            kind,
            subject_kind: &subject_kind,
            start_time,
            duration_hours,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update exam"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok(Json(exam_to_response(updated)))
}

async fn delete_exam(
    axum::extract::Path(exam_id): axum::extract::Path<String>,
    CurrentStaff(staff): CurrentStaff,
    state: axum::extract::State<AppState>,
) -> Result<axum::http::StatusCode, ApiError> {
    let exam = fetch_scoped_exam(state.db(), &staff, &exam_id).await?;

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    // Lock the exam row so no submission can land between the count and
    // the delete.
    let locked = repositories::exams::lock_by_id(&mut *tx, &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock exam"))?;
    let Some(exam) = locked else {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    };

    let result_count = repositories::results::count_by_exam(&mut *tx, &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count results"))?;

    if result_count > 0 {
        return Err(ApiError::Conflict(format!(
            "Cannot delete an exam with {result_count} graded result(s)"
        )));
    }

    repositories::exams::delete_by_id(&mut *tx, &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete exam"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(staff_id = %staff.id, exam_id = %exam.id, action = "exam_delete", "Exam deleted");

    Ok(axum::http::StatusCode::NO_CONTENT)
}

async fn add_subject(
    axum::extract::Path(exam_id): axum::extract::Path<String>,
    CurrentStaff(staff): CurrentStaff,
    state: axum::extract::State<AppState>,
    Json(payload): Json<SubjectCreate>,
) -> Result<(axum::http::StatusCode, Json<SubjectResponse<QuestionResponse>>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    validate_answer_bounds(std::slice::from_ref(&payload))?;

    let exam = fetch_scoped_exam(state.db(), &staff, &exam_id).await?;

    let existing = repositories::subjects::count_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count subjects"))?;

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let (subjects, questions) =
        insert_subjects(&mut tx, &exam.id, std::slice::from_ref(&payload), existing as i32).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    let mut responses = subjects_to_responses(subjects, questions, question_to_response);
    let subject = responses.pop().ok_or_else(|| {
        ApiError::Internal("Subject insert produced no response".to_string())
    })?;

    Ok((axum::http::StatusCode::CREATED, Json(subject)))
}

async fn list_results(
    axum::extract::Path(exam_id): axum::extract::Path<String>,
    CurrentStaff(staff): CurrentStaff,
    state: axum::extract::State<AppState>,
) -> Result<Json<Vec<ResultResponse>>, ApiError> {
    let exam = fetch_scoped_exam(state.db(), &staff, &exam_id).await?;

    let results = repositories::results::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list results"))?;

    Ok(Json(results.into_iter().map(result_to_response).collect()))
}

async fn publish_results(
    axum::extract::Path(exam_id): axum::extract::Path<String>,
    CurrentStaff(staff): CurrentStaff,
    state: axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let exam = fetch_scoped_exam(state.db(), &staff, &exam_id).await?;

    if !can_publish(&staff, state.db(), &exam).await? {
        return Err(ApiError::Forbidden(
            "Only the class teacher or an admin may publish results".to_string(),
        ));
    }

    let now = primitive_now_utc();
    let published = repositories::results::publish_for_exam_class(
        state.db(),
        &exam.id,
        &exam.class_id,
        &staff.id,
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to publish results"))?;

    tracing::info!(
        staff_id = %staff.id,
        exam_id = %exam.id,
        published_count = published,
        action = "results_publish",
        "Results published"
    );

    Ok(Json(serde_json::json!({
        "message": "Results published",
        "exam_id": exam.id,
        "published_count": published,
        "published_at": format_primitive(now),
    })))
}

/// Loads the exam and enforces branch scope in one place. Staff outside the
/// branch get 403; a missing exam is 404.
async fn fetch_scoped_exam(
    pool: &sqlx::PgPool,
    staff: &User,
    exam_id: &str,
) -> Result<Exam, ApiError> {
    let exam = repositories::exams::find_by_id(pool, exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?;

    let Some(exam) = exam else {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    };

    require_branch_scope(staff, &exam.branch_id)?;

    Ok(exam)
}

/// Results are published by the class's assigned teacher or by an admin of
/// the exam's branch.
async fn can_publish(staff: &User, pool: &sqlx::PgPool, exam: &Exam) -> Result<bool, ApiError> {
    if staff.role.is_admin() {
        return Ok(true);
    }

    let class = repositories::classes::find_by_id(pool, &exam.class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch class"))?;

    Ok(class
        .and_then(|class| class.teacher_id)
        .is_some_and(|teacher_id| teacher_id == staff.id))
}

async fn ensure_no_conflict(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    class_id: &str,
    candidate: ExamInterval,
    exclude_exam_id: Option<&str>,
) -> Result<(), ApiError> {
    let conflict = schedule::check_conflict(&mut *tx, class_id, candidate, exclude_exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check schedule"))?;

    if let Some(existing) = conflict {
        metrics::counter!("cbt_schedule_conflicts_total").increment(1);
        let interval = existing.interval();
        return Err(DomainError::ScheduleConflict {
            title: existing.title,
            start: format_primitive(interval.start),
            end: format_primitive(interval.end),
        }
        .into());
    }

    Ok(())
}

fn validate_answer_bounds(subjects: &[SubjectCreate]) -> Result<(), ApiError> {
    for subject in subjects {
        for question in &subject.questions {
            let options = question.options.len() as i32;
            if question.correct_index >= options {
                return Err(ApiError::BadRequest(format!(
                    "correct_index {} is out of bounds for {} option(s) in '{}'",
                    question.correct_index, options, subject.title
                )));
            }
        }
    }
    Ok(())
}

async fn insert_subjects(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    exam_id: &str,
    subjects: &[SubjectCreate],
    base_position: i32,
) -> Result<(Vec<Subject>, Vec<Question>), ApiError> {
    let now = primitive_now_utc();
    let mut created_subjects = Vec::new();
    let mut created_questions = Vec::new();

    for (subject_index, subject) in subjects.iter().enumerate() {
        let subject_id = Uuid::new_v4().to_string();
        let created = repositories::subjects::create(
            &mut **tx,
            repositories::subjects::CreateSubject {
                id: &subject_id,
                exam_id,
                title: &subject.title,
                position: base_position + subject_index as i32,
                created_at: now,
            },
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to create subject"))?;

        for (question_index, question) in subject.questions.iter().enumerate() {
            let question_id = Uuid::new_v4().to_string();
            let created = repositories::questions::create(
                &mut **tx,
                repositories::questions::CreateQuestion {
                    id: &question_id,
                    subject_id: &subject_id,
                    exam_id,
                    text: &question.text,
                    options: &question.options,
                    correct_index: question.correct_index,
                    position: question_index as i32,
                    created_at: now,
                },
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to create question"))?;
            created_questions.push(created);
        }

        created_subjects.push(created);
    }

    Ok((created_subjects, created_questions))
}
