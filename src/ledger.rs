use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::branch::BranchCode;
use crate::error::{Field, LedgerError, Result};
use crate::kv::KvStore;
use crate::model::{parse_number, Semester, Subject, SubjectDraft, MAX_SEMESTERS};

pub const LEDGER_KEY_PREFIX: &str = "gradeGarage_";

/// Identity of one persisted ledger: a user's records under one branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerKey {
    user_email: String,
    branch: BranchCode,
}

impl LedgerKey {
    pub fn new(user_email: &str, branch: BranchCode) -> Result<Self> {
        let user_email = user_email.trim();
        if user_email.is_empty() {
            return Err(LedgerError::validation(
                Field::UserEmail,
                "user email must not be empty",
            ));
        }
        Ok(Self {
            user_email: user_email.to_string(),
            branch,
        })
    }

    pub fn user_email(&self) -> &str {
        &self.user_email
    }

    pub fn branch(&self) -> &BranchCode {
        &self.branch
    }

    pub fn storage_key(&self) -> String {
        format!("{}{}", user_prefix(&self.user_email), self.branch)
    }
}

/// Key prefix shared by every branch ledger of one user.
pub fn user_prefix(user_email: &str) -> String {
    format!("{}{}_", LEDGER_KEY_PREFIX, user_email.trim())
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ValidSubject<'a> {
    name: &'a str,
    marks: f64,
    credits: f64,
}

/// Checks a draft against the semester it targets. The first failing rule wins.
fn validate_draft<'a>(
    semester: &Semester,
    draft: &'a SubjectDraft,
    editing: Option<&str>,
) -> Result<ValidSubject<'a>> {
    if draft.name.trim().is_empty() {
        return Err(LedgerError::validation(
            Field::Name,
            "please enter both subject name and marks",
        ));
    }
    if draft.marks.trim().is_empty() {
        return Err(LedgerError::validation(
            Field::Marks,
            "please enter both subject name and marks",
        ));
    }
    let marks = match parse_number(&draft.marks) {
        Some(v) if (0.0..=100.0).contains(&v) => v,
        _ => {
            return Err(LedgerError::validation(
                Field::Marks,
                "marks must be a number between 0 and 100",
            ))
        }
    };
    let credits = match parse_number(&draft.credits) {
        Some(v) if v > 0.0 => v,
        _ => {
            return Err(LedgerError::validation(
                Field::Credits,
                "credits must be a positive number",
            ))
        }
    };

    let name = draft.resolved_name();
    if name.is_empty() {
        return Err(LedgerError::validation(
            Field::Name,
            "please enter a valid subject name",
        ));
    }
    let duplicate = semester
        .subjects
        .iter()
        .filter(|s| editing != Some(s.id()))
        .any(|s| s.name() == name);
    if duplicate {
        return Err(LedgerError::validation(
            Field::Name,
            "this subject already exists in this semester",
        ));
    }

    Ok(ValidSubject {
        name,
        marks,
        credits,
    })
}

/// In-memory copy of one ledger. Mutations validate first and leave the
/// ledger untouched on error.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    key: LedgerKey,
    semesters: Vec<Semester>,
}

impl Ledger {
    pub fn empty(key: LedgerKey) -> Self {
        Self {
            key,
            semesters: Vec::new(),
        }
    }

    pub fn load(kv: &dyn KvStore, key: LedgerKey) -> Result<Self> {
        let storage_key = key.storage_key();
        let Some(raw) = kv.get(&storage_key)? else {
            return Ok(Self::empty(key));
        };
        let semesters: Vec<Semester> =
            serde_json::from_slice(&raw).map_err(|source| LedgerError::CorruptLedger {
                key: storage_key,
                source,
            })?;
        Ok(Self { key, semesters })
    }

    pub fn save(&self, kv: &mut dyn KvStore) -> Result<()> {
        let raw = serde_json::to_vec(&self.semesters).map_err(LedgerError::Serialize)?;
        kv.set(&self.key.storage_key(), &raw)?;
        Ok(())
    }

    pub fn key(&self) -> &LedgerKey {
        &self.key
    }

    pub fn semesters(&self) -> &[Semester] {
        &self.semesters
    }

    pub fn semester(&self, semester_id: &str) -> Result<&Semester> {
        self.semesters
            .iter()
            .find(|s| s.id == semester_id)
            .ok_or_else(|| LedgerError::SemesterNotFound(semester_id.to_string()))
    }

    fn semester_mut(&mut self, semester_id: &str) -> Result<&mut Semester> {
        self.semesters
            .iter_mut()
            .find(|s| s.id == semester_id)
            .ok_or_else(|| LedgerError::SemesterNotFound(semester_id.to_string()))
    }

    fn next_semester_id(&self, now: DateTime<Utc>) -> String {
        let mut millis = now.timestamp_millis();
        loop {
            let id = format!("{}-{}", self.key.branch, millis);
            if !self.semesters.iter().any(|s| s.id == id) {
                return id;
            }
            millis += 1;
        }
    }

    pub fn add_semester(&mut self, now: DateTime<Utc>) -> Result<&Semester> {
        if self.semesters.len() >= usize::from(MAX_SEMESTERS) {
            return Err(LedgerError::LimitExceeded { max: MAX_SEMESTERS });
        }
        // Numbering follows the count, so a deleted semester leaves a gap
        // and the next one may reuse a surviving number.
        let number = self.semesters.len() as u8 + 1;
        let id = self.next_semester_id(now);
        self.semesters.push(Semester::new(id, number, now));
        Ok(&self.semesters[self.semesters.len() - 1])
    }

    pub fn delete_semester(&mut self, semester_id: &str) -> Result<Semester> {
        let idx = self
            .semesters
            .iter()
            .position(|s| s.id == semester_id)
            .ok_or_else(|| LedgerError::SemesterNotFound(semester_id.to_string()))?;
        Ok(self.semesters.remove(idx))
    }

    pub fn add_subject(
        &mut self,
        semester_id: &str,
        draft: &SubjectDraft,
        now: DateTime<Utc>,
    ) -> Result<&Subject> {
        let semester = self.semester_mut(semester_id)?;
        let valid = validate_draft(semester, draft, None)?;
        let subject = Subject::create(
            Uuid::new_v4().to_string(),
            valid.name.to_string(),
            valid.marks,
            valid.credits,
            now,
        )
        .map_err(|reason| LedgerError::validation(Field::Name, reason))?;
        semester.subjects.push(subject);
        semester.touch(now);
        Ok(&semester.subjects[semester.subjects.len() - 1])
    }

    pub fn update_subject(
        &mut self,
        semester_id: &str,
        subject_id: &str,
        draft: &SubjectDraft,
        now: DateTime<Utc>,
    ) -> Result<&Subject> {
        let semester = self.semester_mut(semester_id)?;
        let idx = semester
            .subjects
            .iter()
            .position(|s| s.id() == subject_id)
            .ok_or_else(|| LedgerError::SubjectNotFound(subject_id.to_string()))?;
        let valid = validate_draft(semester, draft, Some(subject_id))?;
        let revised = semester.subjects[idx]
            .revise(valid.name.to_string(), valid.marks, valid.credits, now)
            .map_err(|reason| LedgerError::validation(Field::Name, reason))?;
        semester.subjects[idx] = revised;
        semester.touch(now);
        Ok(&semester.subjects[idx])
    }

    pub fn delete_subject(
        &mut self,
        semester_id: &str,
        subject_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Subject> {
        let semester = self.semester_mut(semester_id)?;
        let idx = semester
            .subjects
            .iter()
            .position(|s| s.id() == subject_id)
            .ok_or_else(|| LedgerError::SubjectNotFound(subject_id.to_string()))?;
        let removed = semester.subjects.remove(idx);
        semester.touch(now);
        Ok(removed)
    }
}

/// Ledger operations with persistence: every successful mutation writes the
/// whole ledger back under its key, a failed one writes nothing.
pub struct AcademicRecordStore<S: KvStore> {
    kv: S,
}

impl<S: KvStore> AcademicRecordStore<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    pub fn ledger(&self, key: &LedgerKey) -> Result<Ledger> {
        Ledger::load(&self.kv, key.clone())
    }

    fn mutate<T>(
        &mut self,
        key: &LedgerKey,
        op: impl FnOnce(&mut Ledger, DateTime<Utc>) -> Result<T>,
    ) -> Result<T> {
        let mut ledger = self.ledger(key)?;
        let out = op(&mut ledger, Utc::now())?;
        ledger.save(&mut self.kv)?;
        Ok(out)
    }

    pub fn add_semester(&mut self, key: &LedgerKey) -> Result<Semester> {
        let semester = self.mutate(key, |l, now| l.add_semester(now).cloned())?;
        tracing::debug!(
            key = %key.storage_key(),
            semester_id = %semester.id,
            number = semester.number,
            "semester added"
        );
        Ok(semester)
    }

    pub fn delete_semester(&mut self, key: &LedgerKey, semester_id: &str) -> Result<Semester> {
        let removed = self.mutate(key, |l, _| l.delete_semester(semester_id))?;
        tracing::debug!(
            key = %key.storage_key(),
            semester_id,
            subjects = removed.subjects.len(),
            "semester deleted"
        );
        Ok(removed)
    }

    pub fn add_subject(
        &mut self,
        key: &LedgerKey,
        semester_id: &str,
        draft: &SubjectDraft,
    ) -> Result<Subject> {
        let subject = self.mutate(key, |l, now| {
            l.add_subject(semester_id, draft, now).cloned()
        })?;
        tracing::debug!(
            key = %key.storage_key(),
            semester_id,
            subject_id = subject.id(),
            grade = %subject.grade(),
            "subject added"
        );
        Ok(subject)
    }

    pub fn update_subject(
        &mut self,
        key: &LedgerKey,
        semester_id: &str,
        subject_id: &str,
        draft: &SubjectDraft,
    ) -> Result<Subject> {
        let subject = self.mutate(key, |l, now| {
            l.update_subject(semester_id, subject_id, draft, now).cloned()
        })?;
        tracing::debug!(
            key = %key.storage_key(),
            semester_id,
            subject_id,
            grade = %subject.grade(),
            "subject updated"
        );
        Ok(subject)
    }

    pub fn delete_subject(
        &mut self,
        key: &LedgerKey,
        semester_id: &str,
        subject_id: &str,
    ) -> Result<Subject> {
        let removed = self.mutate(key, |l, now| {
            l.delete_subject(semester_id, subject_id, now)
        })?;
        tracing::debug!(
            key = %key.storage_key(),
            semester_id,
            subject_id,
            "subject deleted"
        );
        Ok(removed)
    }
}
