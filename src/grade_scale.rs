use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBand {
    pub letter: char,
    pub min_mark: f64,
    pub max_mark: f64,
    pub points: u8,
}

/// CUSAT grading table, highest band first.
pub const GRADE_BANDS: [GradeBand; 7] = [
    GradeBand {
        letter: 'S',
        min_mark: 90.0,
        max_mark: 100.0,
        points: 10,
    },
    GradeBand {
        letter: 'A',
        min_mark: 85.0,
        max_mark: 89.99,
        points: 9,
    },
    GradeBand {
        letter: 'B',
        min_mark: 80.0,
        max_mark: 84.99,
        points: 8,
    },
    GradeBand {
        letter: 'C',
        min_mark: 70.0,
        max_mark: 79.99,
        points: 7,
    },
    GradeBand {
        letter: 'D',
        min_mark: 60.0,
        max_mark: 69.99,
        points: 6,
    },
    GradeBand {
        letter: 'E',
        min_mark: 50.0,
        max_mark: 59.99,
        points: 5,
    },
    GradeBand {
        letter: 'F',
        min_mark: 0.0,
        max_mark: 49.99,
        points: 0,
    },
];

pub const MIN_MARK: f64 = 0.0;
pub const MAX_MARK: f64 = 100.0;

/// Band for a mark in [0, 100], or `None` outside that range.
///
/// The printed maxima (89.99, 84.99, ...) leave hairline gaps such as 89.995.
/// Matching on the band floor closes those gaps: a mark belongs to the highest
/// band whose floor it reaches, so every printed boundary keeps its printed
/// band and no mark matches twice.
pub fn classify(marks: f64) -> Option<GradeBand> {
    if !marks.is_finite() || !(MIN_MARK..=MAX_MARK).contains(&marks) {
        return None;
    }
    GRADE_BANDS.iter().find(|b| marks >= b.min_mark).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter_points(marks: f64) -> (char, u8) {
        let band = classify(marks).expect("mark in range");
        (band.letter, band.points)
    }

    #[test]
    fn boundaries_follow_the_table() {
        let cases = [
            (0.0, 'F', 0),
            (49.99, 'F', 0),
            (50.0, 'E', 5),
            (59.99, 'E', 5),
            (60.0, 'D', 6),
            (69.99, 'D', 6),
            (70.0, 'C', 7),
            (79.99, 'C', 7),
            (80.0, 'B', 8),
            (84.99, 'B', 8),
            (85.0, 'A', 9),
            (89.99, 'A', 9),
            (90.0, 'S', 10),
            (100.0, 'S', 10),
        ];
        for (marks, letter, points) in cases {
            assert_eq!(letter_points(marks), (letter, points), "marks={marks}");
        }
    }

    #[test]
    fn every_mark_in_range_matches_exactly_one_band() {
        // Hundredths plus the half-hundredth gap values between printed maxima.
        for i in 0..=20_000 {
            let marks = i as f64 / 200.0;
            let floor_matches = GRADE_BANDS
                .iter()
                .enumerate()
                .filter(|(idx, b)| {
                    let upper = if *idx == 0 {
                        MAX_MARK + f64::EPSILON
                    } else {
                        GRADE_BANDS[idx - 1].min_mark
                    };
                    marks >= b.min_mark && marks < upper
                })
                .count();
            assert_eq!(floor_matches, 1, "marks={marks}");
            assert!(classify(marks).is_some(), "marks={marks}");
        }
    }

    #[test]
    fn gap_values_fall_to_the_lower_band() {
        assert_eq!(letter_points(89.995), ('A', 9));
        assert_eq!(letter_points(49.995), ('F', 0));
    }

    #[test]
    fn out_of_range_marks_have_no_band() {
        assert!(classify(-0.01).is_none());
        assert!(classify(100.01).is_none());
        assert!(classify(f64::NAN).is_none());
    }
}
