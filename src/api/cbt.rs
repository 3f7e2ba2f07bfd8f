use axum::{routing::get, routing::post, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStudent;
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::models::{Exam, User};
use crate::db::types::ExamKind;
use crate::repositories;
use crate::schemas::exam::{question_to_student_response, subjects_to_responses};
use crate::schemas::submission::{
    student_exam_to_response, StudentExamResponse, StudentQuestionsResponse,
    StudentResultResponse, SubmissionAck, SubmitAnswersPayload,
};
use crate::services::access_window::{ExamWindow, WindowState};
use crate::services::errors::DomainError;
use crate::services::{ranking, scoring};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/exam", get(current_exam))
        .route("/exams/:exam_id/questions", get(get_questions))
        .route("/exams/:exam_id/submit", post(submit_answers))
        .route("/results", get(my_results))
}

/// The student's class and exam category. Students without a class, or with a
/// role that maps to no category, have no exams; that reads as 404 rather
/// than leaking why.
fn student_scope(student: &User) -> Result<(&str, ExamKind), ApiError> {
    let class_id = student.class_id.as_deref();
    let kind = student.role.exam_kind();
    match (class_id, kind) {
        (Some(class_id), Some(kind)) => Ok((class_id, kind)),
        _ => Err(ApiError::NotFound("No exam found for your class".to_string())),
    }
}

async fn current_exam(
    CurrentStudent(student): CurrentStudent,
    state: axum::extract::State<AppState>,
) -> Result<Json<StudentExamResponse>, ApiError> {
    let (class_id, kind) = student_scope(&student)?;

    let exams = repositories::exams::list_for_class_and_kind(state.db(), class_id, kind)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;

    let buffer = state.settings().exam().pre_exam_buffer_minutes;
    let now = primitive_now_utc();

    // Soonest exam whose window has not yet closed; locked windows still
    // count so students can see what is coming up.
    let upcoming = exams.into_iter().find_map(|exam| {
        let window = ExamWindow::for_exam(exam.start_time, exam.duration_hours, buffer);
        (window.closes_at() >= now).then_some((exam, window))
    });

    let Some((exam, window)) = upcoming else {
        return Err(ApiError::NotFound("No exam found for your class".to_string()));
    };

    Ok(Json(student_exam_to_response(exam, &window)))
}

async fn get_questions(
    axum::extract::Path(exam_id): axum::extract::Path<String>,
    CurrentStudent(student): CurrentStudent,
    state: axum::extract::State<AppState>,
) -> Result<Json<StudentQuestionsResponse>, ApiError> {
    let (exam, window) = fetch_student_exam(&state, &student, &exam_id).await?;

    match window.fetch_state(primitive_now_utc()) {
        WindowState::Locked => {
            return Err(DomainError::TooEarly {
                opens_at: format_primitive(window.opens_at()),
            }
            .into());
        }
        WindowState::Closed => {
            return Err(DomainError::WindowClosed {
                closes_at: format_primitive(window.closes_at()),
            }
            .into());
        }
        WindowState::Open => {}
    }

    let subjects = repositories::subjects::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch subjects"))?;
    let questions = repositories::questions::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch questions"))?;

    Ok(Json(StudentQuestionsResponse {
        exam: student_exam_to_response(exam, &window),
        subjects: subjects_to_responses(subjects, questions, question_to_student_response),
    }))
}

async fn submit_answers(
    axum::extract::Path(exam_id): axum::extract::Path<String>,
    CurrentStudent(student): CurrentStudent,
    state: axum::extract::State<AppState>,
    Json(payload): Json<SubmitAnswersPayload>,
) -> Result<Json<SubmissionAck>, ApiError> {
    let (exam, window) = fetch_student_exam(&state, &student, &exam_id).await?;

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let term = repositories::terms::find_active_for_branch(&mut *tx, &exam.branch_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to resolve active term"))?;

    let result = scoring::submit_answers(
        &mut tx,
        &exam,
        &student,
        &payload.answers,
        &window,
        now,
        term.map(|term| term.id),
    )
    .await?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok(Json(SubmissionAck {
        message: "Submission received".to_string(),
        result_id: result.id,
        exam_id: result.exam_id,
        attempted: result.attempted,
        total_questions: result.total_questions,
        submitted_at: format_primitive(result.created_at),
    }))
}

async fn my_results(
    CurrentStudent(student): CurrentStudent,
    state: axum::extract::State<AppState>,
) -> Result<Json<Vec<StudentResultResponse>>, ApiError> {
    let results = repositories::results::list_published_for_student(state.db(), &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list results"))?;

    let mut responses = Vec::with_capacity(results.len());
    for result in results {
        let rank =
            ranking::rank_for(state.db(), &result.exam_id, &result.class_id, result.percentage)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to compute rank"))?;

        responses.push(StudentResultResponse {
            exam_id: result.exam_id,
            exam_title: result.exam_title,
            raw_score: result.raw_score,
            percentage: result.percentage,
            total_questions: result.total_questions,
            attempted: result.attempted,
            term_id: result.term_id,
            published_at: result.published_at.map(format_primitive),
            rank,
        });
    }

    Ok(Json(responses))
}

/// Loads the exam for a student. An exam outside the student's class or
/// category collapses to the same 404 as a missing one, so the response
/// never reveals another class's schedule.
async fn fetch_student_exam(
    state: &AppState,
    student: &User,
    exam_id: &str,
) -> Result<(Exam, ExamWindow), ApiError> {
    let (class_id, kind) = student_scope(student)?;

    let exam = repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?;

    let Some(exam) = exam else {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    };

    if exam.class_id != class_id || exam.kind != kind {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    }

    let buffer = state.settings().exam().pre_exam_buffer_minutes;
    let window = ExamWindow::for_exam(exam.start_time, exam.duration_hours, buffer);

    Ok((exam, window))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime};
    use tower::ServiceExt;

    use crate::db::models::User;
    use crate::db::types::UserRole;
    use crate::repositories;
    use crate::test_support::{self, TestContext};

    struct ExamFixture {
        exam_id: String,
        question_ids: Vec<String>,
        teacher_token: String,
        student_tokens: Vec<String>,
        students: Vec<User>,
    }

    /// One open exam with two questions (correct options 1 and 2) and the
    /// requested number of enrolled students.
    async fn seed_open_exam(ctx: &TestContext, student_count: usize) -> ExamFixture {
        let branch = test_support::insert_branch(ctx.state.db(), "Main Campus").await;
        let teacher = test_support::insert_user(
            ctx.state.db(),
            "teacher",
            "Class Teacher",
            UserRole::Teacher,
            Some(&branch),
            None,
        )
        .await;
        let class =
            test_support::insert_class(ctx.state.db(), &branch, "JSS3", Some(&teacher.id)).await;
        test_support::insert_active_term(ctx.state.db(), &branch, "First Term").await;

        let mut students = Vec::new();
        let mut student_tokens = Vec::new();
        for index in 0..student_count {
            let student = test_support::insert_user(
                ctx.state.db(),
                &format!("student-{index}"),
                &format!("Student {index}"),
                UserRole::Student,
                Some(&branch),
                Some(&class.id),
            )
            .await;
            student_tokens.push(test_support::bearer_token(&student.id, ctx.state.settings()));
            students.push(student);
        }

        let teacher_token = test_support::bearer_token(&teacher.id, ctx.state.settings());
        let start = OffsetDateTime::now_utc().replace_nanosecond(0).expect("truncate nanos")
            + Duration::minutes(5);
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/exams",
                Some(&teacher_token),
                Some(json!({
                    "title": "First Term Maths",
                    "kind": "internal",
                    "subject_kind": "general",
                    "class_name": "JSS3",
                    "start_time": start.format(&Rfc3339).expect("format start"),
                    "duration_hours": 1.0,
                    "subjects": [{
                        "title": "Arithmetic",
                        "questions": [
                            {"text": "2 + 2?", "options": ["3", "4", "5"], "correct_index": 1},
                            {"text": "3 * 3?", "options": ["6", "8", "9"], "correct_index": 2},
                        ],
                    }],
                })),
            ))
            .await
            .expect("create exam");
        let status = response.status();
        let created = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "response: {created}");

        let exam_id = created["id"].as_str().expect("exam id").to_string();
        let question_ids = created["subjects"][0]["questions"]
            .as_array()
            .expect("questions")
            .iter()
            .map(|question| question["id"].as_str().expect("question id").to_string())
            .collect();

        ExamFixture { exam_id, question_ids, teacher_token, student_tokens, students }
    }

    async fn submit(
        ctx: &TestContext,
        fixture: &ExamFixture,
        token: &str,
        selections: [i32; 2],
    ) -> (StatusCode, serde_json::Value) {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/cbt/exams/{}/submit", fixture.exam_id),
                Some(token),
                Some(json!({
                    "answers": [
                        {
                            "question_id": fixture.question_ids[0],
                            "selected_option_index": selections[0],
                        },
                        {
                            "question_id": fixture.question_ids[1],
                            "selected_option_index": selections[1],
                        },
                    ],
                })),
            ))
            .await
            .expect("submit answers");
        let status = response.status();
        (status, test_support::read_json(response).await)
    }

    #[tokio::test]
    async fn resubmission_is_refused_and_first_score_kept() {
        let ctx = test_support::setup_test_context().await;
        let fixture = seed_open_exam(&ctx, 1).await;
        let token = &fixture.student_tokens[0];

        let (status, ack) = submit(&ctx, &fixture, token, [1, 2]).await;
        assert_eq!(status, StatusCode::OK, "response: {ack}");
        assert_eq!(ack["attempted"], 2);
        assert_eq!(ack["total_questions"], 2);

        let stored = repositories::results::find_by_exam_student(
            ctx.state.db(),
            &fixture.exam_id,
            &fixture.students[0].id,
        )
        .await
        .expect("fetch result")
        .expect("result row");
        assert_eq!(stored.raw_score, 2);
        assert_eq!(stored.percentage, 100.0);

        let (status, refused) = submit(&ctx, &fixture, token, [0, 0]).await;
        assert_eq!(status, StatusCode::CONFLICT, "response: {refused}");

        let stored = repositories::results::find_by_exam_student(
            ctx.state.db(),
            &fixture.exam_id,
            &fixture.students[0].id,
        )
        .await
        .expect("fetch result")
        .expect("result row");
        assert_eq!(stored.raw_score, 2, "first submission must stand");
    }

    #[tokio::test]
    async fn published_results_carry_rank_and_exam_title() {
        let ctx = test_support::setup_test_context().await;
        let fixture = seed_open_exam(&ctx, 3).await;

        // Two perfect scores and one 50%.
        for (token, selections) in
            fixture.student_tokens.iter().zip([[1, 2], [1, 2], [1, 0]])
        {
            let (status, ack) = submit(&ctx, &fixture, token, selections).await;
            assert_eq!(status, StatusCode::OK, "response: {ack}");
        }

        // Nothing is visible before the teacher publishes.
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/cbt/results",
                Some(&fixture.student_tokens[0]),
                None,
            ))
            .await
            .expect("list results");
        let status = response.status();
        let unpublished = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {unpublished}");
        assert_eq!(unpublished.as_array().expect("array").len(), 0);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/exams/{}/results/publish", fixture.exam_id),
                Some(&fixture.teacher_token),
                None,
            ))
            .await
            .expect("publish results");
        let status = response.status();
        let published = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {published}");
        assert_eq!(published["published_count"], 3);

        for (token, expected_rank, expected_percentage) in [
            (&fixture.student_tokens[0], "1st", 100.0),
            (&fixture.student_tokens[1], "1st", 100.0),
            (&fixture.student_tokens[2], "3rd", 50.0),
        ] {
            let response = ctx
                .app
                .clone()
                .oneshot(test_support::json_request(
                    Method::GET,
                    "/api/v1/cbt/results",
                    Some(token),
                    None,
                ))
                .await
                .expect("list results");
            let status = response.status();
            let results = test_support::read_json(response).await;
            assert_eq!(status, StatusCode::OK, "response: {results}");

            let entry = &results.as_array().expect("array")[0];
            assert_eq!(entry["exam_title"], "First Term Maths");
            assert_eq!(entry["rank"], expected_rank);
            assert_eq!(entry["percentage"], expected_percentage);
            assert!(entry["term_id"].is_string(), "active term attached: {entry}");
            assert!(entry["published_at"].is_string());
        }
    }
}
