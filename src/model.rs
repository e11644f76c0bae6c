use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::grade_scale;

/// Subject picker value that switches the name to the free-text custom name.
pub const OTHER_SUBJECT: &str = "Other";
/// Credits prefilled in the add-subject form.
pub const DEFAULT_CREDITS: &str = "3";
pub const MAX_SEMESTERS: u8 = 8;

/// A graded subject. `grade` and `grade_points` are derived from `marks` by
/// every constructor, including deserialization, and have no setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StoredSubject")]
pub struct Subject {
    id: String,
    name: String,
    marks: f64,
    credits: f64,
    grade: char,
    grade_points: u8,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl Subject {
    fn build(
        id: String,
        name: String,
        marks: f64,
        credits: f64,
        created_at: DateTime<Utc>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Result<Self, String> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err("subject name must not be empty".to_string());
        }
        let Some(band) = grade_scale::classify(marks) else {
            return Err(format!("marks out of range: {marks}"));
        };
        if !credits.is_finite() || credits <= 0.0 {
            return Err(format!("credits must be positive: {credits}"));
        }
        Ok(Self {
            id,
            name,
            marks,
            credits,
            grade: band.letter,
            grade_points: band.points,
            created_at,
            updated_at,
        })
    }

    pub(crate) fn create(
        id: String,
        name: String,
        marks: f64,
        credits: f64,
        now: DateTime<Utc>,
    ) -> Result<Self, String> {
        Self::build(id, name, marks, credits, now, None)
    }

    /// Same subject with new inputs; keeps `id` and `created_at`.
    pub(crate) fn revise(
        &self,
        name: String,
        marks: f64,
        credits: f64,
        now: DateTime<Utc>,
    ) -> Result<Self, String> {
        Self::build(
            self.id.clone(),
            name,
            marks,
            credits,
            self.created_at,
            Some(now),
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn marks(&self) -> f64 {
        self.marks
    }

    pub fn credits(&self) -> f64 {
        self.credits
    }

    pub fn grade(&self) -> char {
        self.grade
    }

    pub fn grade_points(&self) -> u8 {
        self.grade_points
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

/// On-disk subject shape. Stored `grade`/`gradePoints` are ignored and
/// recomputed; UI-transient fields such as `isEditing` are dropped.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSubject {
    id: String,
    name: String,
    #[serde(deserialize_with = "de_lenient_f64")]
    marks: f64,
    #[serde(deserialize_with = "de_lenient_f64")]
    credits: f64,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<StoredSubject> for Subject {
    type Error = String;

    fn try_from(s: StoredSubject) -> Result<Self, Self::Error> {
        Subject::build(
            s.id,
            s.name,
            s.marks,
            s.credits,
            s.created_at.unwrap_or_default(),
            s.updated_at,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Semester {
    pub id: String,
    pub name: String,
    pub number: u8,
    #[serde(default, deserialize_with = "de_readable_subjects")]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    /// Unix millis of the last change to this semester.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<i64>,
}

impl Semester {
    pub(crate) fn new(id: String, number: u8, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: format!("Semester {number}"),
            number,
            subjects: Vec::new(),
            created_at: now,
            last_updated: Some(now.timestamp_millis()),
        }
    }

    pub fn recency(&self) -> i64 {
        self.last_updated.unwrap_or(0)
    }

    pub fn total_credits(&self) -> f64 {
        self.subjects.iter().map(|s| s.credits()).sum()
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = Some(now.timestamp_millis());
    }
}

/// Subject form input as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDraft {
    pub name: String,
    #[serde(default)]
    pub custom_name: Option<String>,
    pub marks: String,
    pub credits: String,
}

impl SubjectDraft {
    pub fn new(name: &str, marks: &str, credits: &str) -> Self {
        Self {
            name: name.to_string(),
            custom_name: None,
            marks: marks.to_string(),
            credits: credits.to_string(),
        }
    }

    pub fn with_custom_name(mut self, custom_name: &str) -> Self {
        self.custom_name = Some(custom_name.to_string());
        self
    }

    /// Name that will be stored: the custom name when "Other" was picked.
    pub fn resolved_name(&self) -> &str {
        if self.name == OTHER_SUBJECT {
            self.custom_name.as_deref().unwrap_or("").trim()
        } else {
            self.name.trim()
        }
    }
}

/// Whole-string finite number, surrounding whitespace ignored.
pub fn parse_number(raw: &str) -> Option<f64> {
    let v = raw.trim().parse::<f64>().ok()?;
    v.is_finite().then_some(v)
}

fn de_lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(v) => Ok(v),
        NumberOrText::Text(s) => {
            parse_number(&s).ok_or_else(|| de::Error::custom(format!("not a number: {s:?}")))
        }
    }
}

/// Subjects that pass the factory. Unreadable ones (for example an edit saved
/// mid-typing with `marks: ""`) are dropped with a warning so the rest of the
/// semester stays usable.
fn de_readable_subjects<'de, D>(deserializer: D) -> Result<Vec<Subject>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = Vec::<serde_json::Value>::deserialize(deserializer)?;
    let mut subjects = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        let id = item
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        match serde_json::from_value::<Subject>(item) {
            Ok(subject) => subjects.push(subject),
            Err(e) => tracing::warn!(idx, subject_id = %id, error = %e, "unreadable subject; skipping"),
        }
    }
    Ok(subjects)
}
