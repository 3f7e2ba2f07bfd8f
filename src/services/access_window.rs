use time::{Duration, PrimitiveDateTime};

use crate::services::schedule::duration_from_hours;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WindowState {
    Locked,
    Open,
    Closed,
}

/// Per-exam access window. Pure over wall-clock time; nothing is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExamWindow {
    opens_at: PrimitiveDateTime,
    start: PrimitiveDateTime,
    closes_at: PrimitiveDateTime,
}

impl ExamWindow {
    pub(crate) fn for_exam(
        start: PrimitiveDateTime,
        duration_hours: f64,
        buffer_minutes: i64,
    ) -> Self {
        Self {
            opens_at: start - Duration::minutes(buffer_minutes),
            start,
            closes_at: start + duration_from_hours(duration_hours),
        }
    }

    pub(crate) fn opens_at(&self) -> PrimitiveDateTime {
        self.opens_at
    }

    pub(crate) fn start(&self) -> PrimitiveDateTime {
        self.start
    }

    pub(crate) fn closes_at(&self) -> PrimitiveDateTime {
        self.closes_at
    }

    /// Questions are fetchable from the pre-exam buffer through the end,
    /// boundaries inclusive.
    pub(crate) fn fetch_state(&self, now: PrimitiveDateTime) -> WindowState {
        if now < self.opens_at {
            WindowState::Locked
        } else if now > self.closes_at {
            WindowState::Closed
        } else {
            WindowState::Open
        }
    }

    /// Submission has no early restriction, only the hard cutoff.
    pub(crate) fn submit_state(&self, now: PrimitiveDateTime) -> WindowState {
        if now > self.closes_at {
            WindowState::Closed
        } else {
            WindowState::Open
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    // Exam 10:00-11:00 with the default 30 minute buffer.
    fn window() -> ExamWindow {
        ExamWindow::for_exam(datetime!(2026-03-02 10:00), 1.0, 30)
    }

    #[test]
    fn fetch_locked_one_minute_before_buffer() {
        assert_eq!(window().fetch_state(datetime!(2026-03-02 09:29)), WindowState::Locked);
    }

    #[test]
    fn fetch_opens_exactly_at_buffer() {
        assert_eq!(window().fetch_state(datetime!(2026-03-02 09:30)), WindowState::Open);
    }

    #[test]
    fn fetch_open_through_exam_end() {
        assert_eq!(window().fetch_state(datetime!(2026-03-02 10:30)), WindowState::Open);
        assert_eq!(window().fetch_state(datetime!(2026-03-02 11:00)), WindowState::Open);
    }

    #[test]
    fn fetch_closed_after_end() {
        assert_eq!(window().fetch_state(datetime!(2026-03-02 11:01)), WindowState::Closed);
    }

    #[test]
    fn submit_allowed_before_start() {
        assert_eq!(window().submit_state(datetime!(2026-03-02 09:00)), WindowState::Open);
    }

    #[test]
    fn submit_allowed_at_cutoff() {
        assert_eq!(window().submit_state(datetime!(2026-03-02 11:00)), WindowState::Open);
    }

    #[test]
    fn submit_rejected_past_cutoff() {
        assert_eq!(window().submit_state(datetime!(2026-03-02 11:01)), WindowState::Closed);
    }

    #[test]
    fn fractional_duration_shifts_cutoff() {
        let w = ExamWindow::for_exam(datetime!(2026-03-02 10:00), 1.5, 30);
        assert_eq!(w.closes_at(), datetime!(2026-03-02 11:30));
        assert_eq!(w.submit_state(datetime!(2026-03-02 11:29)), WindowState::Open);
        assert_eq!(w.submit_state(datetime!(2026-03-02 11:31)), WindowState::Closed);
    }
}
