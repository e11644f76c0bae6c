use serde::{Deserialize, Serialize, Serializer};

use crate::model::{Semester, Subject};

/// `floor(100x + 0.5) / 100`, the two-decimal counterpart of the
/// `Int(10*x + 0.5) / 10` round-off used for marks.
pub fn round_half_up_2(x: f64) -> f64 {
    ((100.0 * x) + 0.5).floor() / 100.0
}

/// A grade-point average, or "N/A" when there is nothing to average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gpa {
    Value(f64),
    NotAvailable,
}

impl Gpa {
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(v),
            Self::NotAvailable => None,
        }
    }
}

impl std::fmt::Display for Gpa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v:.2}"),
            Self::NotAvailable => f.write_str("N/A"),
        }
    }
}

/// Serializes as a number or `null`, never as the string "N/A".
impl Serialize for Gpa {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

/// How CGPA treats a semester whose SGPA is not available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingSgpaPolicy {
    /// Contributes 0 and still counts in the denominator. Depresses CGPA when
    /// data is sparse; kept for parity with existing records.
    #[default]
    CountAsZero,
    /// Left out of both sum and denominator.
    Exclude,
}

/// Credit-weighted grade-point average of one semester, rounded to 2 places.
pub fn sgpa(subjects: &[Subject]) -> Gpa {
    let total_credits: f64 = subjects.iter().map(|s| s.credits()).sum();
    if subjects.is_empty() || total_credits <= 0.0 {
        return Gpa::NotAvailable;
    }
    let credit_points: f64 = subjects
        .iter()
        .map(|s| s.credits() * f64::from(s.grade_points()))
        .sum();
    Gpa::Value(round_half_up_2(credit_points / total_credits))
}

/// Mean of per-semester SGPAs, rounded to 2 places.
pub fn cgpa_of(sgpas: &[Gpa], policy: MissingSgpaPolicy) -> Gpa {
    let mut sum = 0.0_f64;
    let mut denom = 0_usize;
    for g in sgpas {
        match (g, policy) {
            (Gpa::Value(v), _) => {
                sum += v;
                denom += 1;
            }
            (Gpa::NotAvailable, MissingSgpaPolicy::CountAsZero) => denom += 1,
            (Gpa::NotAvailable, MissingSgpaPolicy::Exclude) => {}
        }
    }
    if denom == 0 {
        return Gpa::NotAvailable;
    }
    Gpa::Value(round_half_up_2(sum / denom as f64))
}

/// CGPA over the semesters that have at least one subject.
pub fn cgpa(semesters: &[Semester], policy: MissingSgpaPolicy) -> Gpa {
    let sgpas: Vec<Gpa> = semesters
        .iter()
        .filter(|s| !s.subjects.is_empty())
        .map(|s| sgpa(&s.subjects))
        .collect();
    if sgpas.is_empty() {
        return Gpa::NotAvailable;
    }
    cgpa_of(&sgpas, policy)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterSummary {
    pub id: String,
    pub name: String,
    pub number: u8,
    pub subject_count: usize,
    pub total_credits: f64,
    pub sgpa: Gpa,
}

pub fn semester_summary(semester: &Semester) -> SemesterSummary {
    SemesterSummary {
        id: semester.id.clone(),
        name: semester.name.clone(),
        number: semester.number,
        subject_count: semester.subjects.len(),
        total_credits: semester.total_credits(),
        sgpa: sgpa(&semester.subjects),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSubject {
    pub name: String,
    pub marks: f64,
    pub credits: f64,
    pub grade: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSemester {
    pub name: String,
    pub number: u8,
    pub sgpa: Option<f64>,
    pub subjects: Vec<AnalysisSubject>,
}

/// Body of `POST /api/analyze-performance/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub semesters: Vec<AnalysisSemester>,
}

pub fn build_analysis_payload(canonical: &[Semester]) -> AnalysisRequest {
    let semesters = canonical
        .iter()
        .map(|sem| AnalysisSemester {
            name: sem.name.clone(),
            number: sem.number,
            sgpa: sgpa(&sem.subjects).value(),
            subjects: sem
                .subjects
                .iter()
                .map(|s| AnalysisSubject {
                    name: s.name().to_string(),
                    marks: s.marks(),
                    credits: s.credits(),
                    grade: s.grade().to_string(),
                })
                .collect(),
        })
        .collect();
    AnalysisRequest { semesters }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn subj(name: &str, marks: f64, credits: f64) -> Subject {
        Subject::create(name.to_string(), name.to_string(), marks, credits, Utc::now())
            .expect("subject")
    }

    fn sem(number: u8, subjects: Vec<Subject>) -> Semester {
        let mut s = Semester::new(format!("CSE-{number}"), number, Utc::now());
        s.subjects = subjects;
        s
    }

    #[test]
    fn round_half_up() {
        assert_eq!(round_half_up_2(7.5), 7.5);
        assert_eq!(round_half_up_2(17.0 / 3.0), 5.67);
        assert_eq!(round_half_up_2(8.125), 8.13);
        assert_eq!(round_half_up_2(0.0), 0.0);
    }

    #[test]
    fn sgpa_single_subject() {
        assert_eq!(sgpa(&[subj("DS", 92.0, 4.0)]), Gpa::Value(10.0));
        assert_eq!(Gpa::Value(10.0).to_string(), "10.00");
    }

    #[test]
    fn sgpa_is_credit_weighted() {
        let g = sgpa(&[subj("A", 80.0, 3.0), subj("B", 60.0, 1.0)]);
        assert_eq!(g, Gpa::Value(7.5));
    }

    #[test]
    fn sgpa_of_nothing_is_not_available() {
        assert_eq!(sgpa(&[]), Gpa::NotAvailable);
        assert_eq!(Gpa::NotAvailable.to_string(), "N/A");
    }

    #[test]
    fn cgpa_counts_missing_sgpa_as_zero_by_default() {
        let sgpas = [Gpa::Value(8.0), Gpa::NotAvailable, Gpa::Value(9.0)];
        assert_eq!(
            cgpa_of(&sgpas, MissingSgpaPolicy::CountAsZero),
            Gpa::Value(5.67)
        );
        assert_eq!(cgpa_of(&sgpas, MissingSgpaPolicy::Exclude), Gpa::Value(8.5));
        assert_eq!(
            cgpa_of(&[Gpa::NotAvailable], MissingSgpaPolicy::Exclude),
            Gpa::NotAvailable
        );
    }

    #[test]
    fn cgpa_skips_empty_semesters() {
        let semesters = vec![
            sem(1, vec![subj("A", 80.0, 3.0)]),
            sem(2, vec![]),
            sem(3, vec![subj("B", 90.0, 3.0)]),
        ];
        assert_eq!(
            cgpa(&semesters, MissingSgpaPolicy::CountAsZero),
            Gpa::Value(9.0)
        );
        assert_eq!(
            cgpa(&[sem(1, vec![])], MissingSgpaPolicy::CountAsZero),
            Gpa::NotAvailable
        );
    }

    #[test]
    fn payload_uses_null_for_missing_sgpa() {
        let payload = build_analysis_payload(&[
            sem(1, vec![subj("Data Structures", 92.0, 4.0)]),
            sem(2, vec![]),
        ]);
        let value = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(value["semesters"][0]["sgpa"], 10.0);
        assert_eq!(value["semesters"][0]["subjects"][0]["grade"], "S");
        assert!(value["semesters"][1]["sgpa"].is_null());
        assert!(!value.to_string().contains("N/A"));
    }

    #[test]
    fn gpa_serializes_as_number_or_null() {
        assert_eq!(
            serde_json::to_string(&Gpa::Value(7.5)).expect("json"),
            "7.5"
        );
        assert_eq!(
            serde_json::to_string(&Gpa::NotAvailable).expect("json"),
            "null"
        );
    }
}
