use sqlx::PgPool;

use crate::repositories;

/// English ordinal suffix; 11th-13th are the exception to the last-digit rule.
pub(crate) fn ordinal(rank: i64) -> String {
    let suffix = match rank % 100 {
        11..=13 => "th",
        _ => match rank % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    };
    format!("{rank}{suffix}")
}

/// Standard competition ranking ("1224", not dense): 1 plus the number of
/// published results scoring strictly higher. Ties share a rank and the tied
/// positions are skipped below them.
pub(crate) fn competition_rank(score: f64, scores: &[f64]) -> i64 {
    1 + scores.iter().filter(|other| **other > score).count() as i64
}

/// Ordinal class rank for a published percentage, recomputed from the
/// published results of the same exam and class on every call. O(class size)
/// per lookup; fine at classroom scale, not meant for unbounded cohorts.
pub(crate) async fn rank_for(
    pool: &PgPool,
    exam_id: &str,
    class_id: &str,
    percentage: f64,
) -> Result<String, sqlx::Error> {
    let scores = repositories::results::published_percentages(pool, exam_id, class_id).await?;
    Ok(ordinal(competition_rank(percentage, &scores)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_suffixes() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(10), "10th");
        assert_eq!(ordinal(21), "21st");
        assert_eq!(ordinal(32), "32nd");
        assert_eq!(ordinal(43), "43rd");
        assert_eq!(ordinal(101), "101st");
        assert_eq!(ordinal(111), "111th");
    }

    #[test]
    fn teens_always_take_th() {
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(13), "13th");
        assert_eq!(ordinal(112), "112th");
        assert_eq!(ordinal(213), "213th");
    }

    #[test]
    fn tied_top_scores_share_first_and_skip_second() {
        let scores = [90.0, 90.0, 70.0];
        assert_eq!(ordinal(competition_rank(90.0, &scores)), "1st");
        assert_eq!(ordinal(competition_rank(70.0, &scores)), "3rd");
    }

    #[test]
    fn ties_push_lower_scores_down_by_multiplicity() {
        let scores = [90.0, 90.0, 80.0, 70.0];
        assert_eq!(competition_rank(90.0, &scores), 1);
        assert_eq!(competition_rank(80.0, &scores), 3);
        assert_eq!(competition_rank(70.0, &scores), 4);
    }

    #[test]
    fn higher_score_never_ranks_worse() {
        let scores = [100.0, 95.0, 95.0, 60.0, 30.0];
        let mut sorted = scores.to_vec();
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
        let ranks: Vec<i64> =
            sorted.iter().map(|score| competition_rank(*score, &scores)).collect();
        for pair in ranks.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn sole_result_ranks_first() {
        assert_eq!(competition_rank(42.0, &[42.0]), 1);
        assert_eq!(competition_rank(42.0, &[]), 1);
    }
}
