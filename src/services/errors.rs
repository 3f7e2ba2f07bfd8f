use thiserror::Error;

/// Failure taxonomy of the exam lifecycle. Handlers convert these into HTTP
/// responses through `ApiError`; storage errors roll the surrounding
/// transaction back before surfacing.
#[derive(Debug, Error)]
pub(crate) enum DomainError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("schedule conflict with '{title}' ({start} - {end})")]
    ScheduleConflict { title: String, start: String, end: String },
    #[error("{0}")]
    Scope(&'static str),
    #[error("exam window is not open yet; questions available from {opens_at}")]
    TooEarly { opens_at: String },
    #[error("exam window closed at {closes_at}")]
    WindowClosed { closes_at: String },
    #[error("answers already submitted for this exam")]
    AlreadySubmitted,
    #[error("exam has no gradable questions")]
    NoQuestions,
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}
