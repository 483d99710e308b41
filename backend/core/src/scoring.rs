//! Overall score computation.

/// Clamp a sub-score into `[0, 1]`. Missing or NaN scores count as 0.
fn normalise(score: Option<f64>) -> f64 {
    match score {
        Some(s) if s.is_finite() => s.clamp(0.0, 1.0),
        Some(s) if s == f64::INFINITY => 1.0,
        _ => 0.0,
    }
}

/// `round(((text + image) / 2) * 100)`, always within `0..=100`.
pub fn overall_score(text: Option<f64>, image: Option<f64>) -> u8 {
    let avg = (normalise(text) + normalise(image)) / 2.0;
    (avg * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_of_sub_scores() {
        assert_eq!(overall_score(Some(0.8), Some(0.6)), 70);
        assert_eq!(overall_score(Some(1.0), Some(1.0)), 100);
        assert_eq!(overall_score(Some(0.0), Some(0.0)), 0);
    }

    #[test]
    fn test_missing_sub_score_counts_as_zero() {
        assert_eq!(overall_score(Some(0.9), None), 45);
        assert_eq!(overall_score(None, None), 0);
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        // (0.25 + 0) / 2 * 100 = 12.5
        assert_eq!(overall_score(Some(0.25), Some(0.0)), 13);
        // (0.515625 + 0.5) / 2 * 100 = 50.78125
        assert_eq!(overall_score(Some(0.515625), Some(0.5)), 51);
    }

    #[test]
    fn test_out_of_range_inputs_stay_in_bounds() {
        assert_eq!(overall_score(Some(3.0), Some(2.0)), 100);
        assert_eq!(overall_score(Some(-1.0), Some(0.4)), 20);
        assert_eq!(overall_score(Some(f64::NAN), Some(1.0)), 50);
    }
}
