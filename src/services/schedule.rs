use sqlx::{FromRow, PgConnection};
use time::{Duration, PrimitiveDateTime};

/// Half-open `[start, end)` occupancy of a scheduled exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExamInterval {
    pub(crate) start: PrimitiveDateTime,
    pub(crate) end: PrimitiveDateTime,
}

impl ExamInterval {
    pub(crate) fn new(start: PrimitiveDateTime, duration_hours: f64) -> Self {
        Self { start, end: start + duration_from_hours(duration_hours) }
    }
}

pub(crate) fn duration_from_hours(hours: f64) -> Duration {
    Duration::seconds((hours * 3600.0).round() as i64)
}

/// Back-to-back intervals (end == next start) do not overlap.
pub(crate) fn overlaps(a: ExamInterval, b: ExamInterval) -> bool {
    a.start < b.end && a.end > b.start
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ScheduledExam {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) duration_hours: f64,
}

impl ScheduledExam {
    pub(crate) fn interval(&self) -> ExamInterval {
        ExamInterval::new(self.start_time, self.duration_hours)
    }
}

/// Finds the first exam of `class_id` whose interval overlaps `candidate`.
///
/// Must run inside the transaction that will insert or update the exam. The
/// class row is locked first so two concurrent scheduling attempts for the
/// same class serialize; locking only the existing exam rows would not block
/// a concurrent insert.
pub(crate) async fn check_conflict(
    conn: &mut PgConnection,
    class_id: &str,
    candidate: ExamInterval,
    exclude_exam_id: Option<&str>,
) -> Result<Option<ScheduledExam>, sqlx::Error> {
    sqlx::query("SELECT id FROM school_classes WHERE id = $1 FOR UPDATE")
        .bind(class_id)
        .execute(&mut *conn)
        .await?;

    let existing: Vec<ScheduledExam> = sqlx::query_as(
        "SELECT id, title, start_time, duration_hours FROM exams \
         WHERE class_id = $1 AND ($2::TEXT IS NULL OR id <> $2) \
         ORDER BY start_time",
    )
    .bind(class_id)
    .bind(exclude_exam_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(existing.into_iter().find(|exam| overlaps(candidate, exam.interval())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn interval(start: PrimitiveDateTime, hours: f64) -> ExamInterval {
        ExamInterval::new(start, hours)
    }

    #[test]
    fn overlapping_intervals_conflict() {
        let a = interval(datetime!(2026-03-02 10:00), 2.0);
        let b = interval(datetime!(2026-03-02 11:00), 2.0);
        assert!(overlaps(a, b));
        assert!(overlaps(b, a));
    }

    #[test]
    fn back_to_back_is_not_a_conflict() {
        let a = interval(datetime!(2026-03-02 10:00), 2.0);
        let b = interval(datetime!(2026-03-02 12:00), 1.0);
        assert!(!overlaps(a, b));
        assert!(!overlaps(b, a));
    }

    #[test]
    fn containment_is_a_conflict() {
        let outer = interval(datetime!(2026-03-02 09:00), 4.0);
        let inner = interval(datetime!(2026-03-02 10:00), 1.0);
        assert!(overlaps(outer, inner));
        assert!(overlaps(inner, outer));
    }

    #[test]
    fn disjoint_intervals_do_not_conflict() {
        let a = interval(datetime!(2026-03-02 08:00), 1.0);
        let b = interval(datetime!(2026-03-02 12:00), 1.0);
        assert!(!overlaps(a, b));
    }

    #[test]
    fn fractional_durations_round_to_seconds() {
        let a = interval(datetime!(2026-03-02 10:00), 1.5);
        assert_eq!(a.end, datetime!(2026-03-02 11:30));
    }

    #[test]
    fn zero_width_interval_never_overlaps() {
        let degenerate = interval(datetime!(2026-03-02 10:30), 0.0);
        let busy = interval(datetime!(2026-03-02 10:00), 2.0);
        assert!(!overlaps(degenerate, busy));
        assert!(!overlaps(busy, degenerate));
    }
}
