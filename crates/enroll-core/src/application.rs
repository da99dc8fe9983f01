//! Enrollment applications and the submission form.
//!
//! Exactly one queue item is created per application, atomically with it.
//! An application leaves `pending` only through an explicit decision, which
//! is final.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{
  Error, Result,
  applicant::{Applicant, ApplicantDetails, Gender},
  queue::{Priority, QueueStatus, WorkerId},
};

// ─── Enumerations ────────────────────────────────────────────────────────────

/// The level an applicant is enrolling into.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GradeLevel {
  Grade11,
  Grade12,
  #[default]
  College,
}

impl GradeLevel {
  /// Reporting order.
  pub const ALL: [GradeLevel; 3] =
    [GradeLevel::Grade11, GradeLevel::Grade12, GradeLevel::College];
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EnrollmentStatus {
  #[default]
  Pending,
  Approved,
  Rejected,
}

/// The outcome of reviewing an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
  Approved,
  Rejected,
}

impl From<Decision> for EnrollmentStatus {
  fn from(d: Decision) -> Self {
    match d {
      Decision::Approved => Self::Approved,
      Decision::Rejected => Self::Rejected,
    }
  }
}

// ─── Application ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentApplication {
  pub id:              i64,
  pub applicant_id:    i64,
  pub academic_year:   String,
  pub grade_level:     GradeLevel,
  pub previous_school: String,
  pub previous_grade:  String,
  pub priority:        Priority,
  pub status:          EnrollmentStatus,
  pub submitted_at:    DateTime<Utc>,
  pub processed_at:    Option<DateTime<Utc>>,
  pub processed_by:    Option<WorkerId>,
  pub notes:           Option<String>,
}

impl EnrollmentApplication {
  /// Apply a decision. Only `pending` applications can be decided.
  pub fn decide(
    &self,
    decision: &DecisionInput,
    now: DateTime<Utc>,
  ) -> Result<Self> {
    if self.status != EnrollmentStatus::Pending {
      return Err(Error::AlreadyDecided { id: self.id, status: self.status });
    }
    Ok(Self {
      status: decision.decision.into(),
      processed_at: Some(now),
      processed_by: Some(decision.decided_by.clone()),
      notes: decision.notes.clone(),
      ..self.clone()
    })
  }
}

/// Input to [`crate::store::AdmissionStore::decide_application`].
#[derive(Debug, Clone)]
pub struct DecisionInput {
  pub decision:   Decision,
  pub decided_by: WorkerId,
  pub notes:      Option<String>,
}

// ─── Submission form ─────────────────────────────────────────────────────────

/// Raw submission as received from a caller. Every field is optional; blank
/// strings count as absent.
///
/// | Field | Default when absent |
/// |-------|---------------------|
/// | `gender` | `other` |
/// | `grade_level` | `college` |
/// | `priority_level` | `medium` |
/// | `date_of_birth` | none |
/// | every other text field | empty string |
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationForm {
  pub first_name:                     Option<String>,
  pub last_name:                      Option<String>,
  pub middle_name:                    Option<String>,
  pub email:                          Option<String>,
  pub phone:                          Option<String>,
  /// `YYYY-MM-DD`.
  pub date_of_birth:                  Option<String>,
  pub gender:                         Option<String>,
  pub address:                        Option<String>,
  pub city:                           Option<String>,
  pub state:                          Option<String>,
  pub zip_code:                       Option<String>,
  pub emergency_contact_name:         Option<String>,
  pub emergency_contact_phone:        Option<String>,
  pub emergency_contact_relationship: Option<String>,
  pub academic_year:                  Option<String>,
  pub grade_level:                    Option<String>,
  pub previous_school:                Option<String>,
  pub previous_grade:                 Option<String>,
  pub priority_level:                 Option<String>,
}

/// A submission after defaulting; what the store actually writes.
#[derive(Debug, Clone, PartialEq)]
pub struct NewApplication {
  pub applicant:       ApplicantDetails,
  pub academic_year:   String,
  pub grade_level:     GradeLevel,
  pub previous_school: String,
  pub previous_grade:  String,
  pub priority:        Priority,
}

fn present(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.is_empty())
}

fn text(value: Option<String>) -> String { present(value).unwrap_or_default() }

fn parsed<T>(field: &'static str, value: Option<String>) -> Result<T>
where
  T: std::str::FromStr + Default,
{
  match present(value) {
    None => Ok(T::default()),
    Some(raw) => raw.parse().map_err(|_| Error::Validation {
      field,
      reason: format!("unrecognised value {raw:?}"),
    }),
  }
}

impl ApplicationForm {
  /// Fill in documented defaults. Fails only when an enumerated field or the
  /// date of birth is present but not understood.
  pub fn normalize(self) -> Result<NewApplication> {
    let date_of_birth = match present(self.date_of_birth) {
      None => None,
      Some(raw) => Some(NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(
        |e| Error::Validation {
          field:  "date_of_birth",
          reason: format!("{raw:?}: {e}"),
        },
      )?),
    };

    let gender: Gender = parsed("gender", self.gender)?;
    let grade_level: GradeLevel = parsed("grade_level", self.grade_level)?;
    let priority: Priority = parsed("priority_level", self.priority_level)?;

    Ok(NewApplication {
      applicant: ApplicantDetails {
        first_name: text(self.first_name),
        last_name: text(self.last_name),
        middle_name: text(self.middle_name),
        email: text(self.email),
        phone: text(self.phone),
        date_of_birth,
        gender,
        address: text(self.address),
        city: text(self.city),
        state: text(self.state),
        zip_code: text(self.zip_code),
        emergency_contact_name: text(self.emergency_contact_name),
        emergency_contact_phone: text(self.emergency_contact_phone),
        emergency_contact_relationship: text(
          self.emergency_contact_relationship,
        ),
      },
      academic_year: text(self.academic_year),
      grade_level,
      previous_school: text(self.previous_school),
      previous_grade: text(self.previous_grade),
      priority,
    })
  }
}

/// What a successful submission hands back to the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
  pub student_number: String,
  pub application_id: i64,
  pub queue_number:   i64,
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::AdmissionStore::list_applications`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationQuery {
  pub status:          Option<EnrollmentStatus>,
  pub grade_level:     Option<GradeLevel>,
  /// Substring matched against first name, last name, and student number.
  pub search:          Option<String>,
  pub submitted_from:  Option<DateTime<Utc>>,
  pub submitted_until: Option<DateTime<Utc>>,
}

/// An application joined with its applicant and queue position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSummary {
  pub application:  EnrollmentApplication,
  pub applicant:    Applicant,
  pub queue_number: Option<i64>,
  pub queue_status: Option<QueueStatus>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{Classify as _, ErrorKind};

  #[test]
  fn empty_form_takes_documented_defaults() {
    let new = ApplicationForm::default().normalize().unwrap();
    assert_eq!(new.applicant.gender, Gender::Other);
    assert_eq!(new.grade_level, GradeLevel::College);
    assert_eq!(new.priority, Priority::Medium);
    assert_eq!(new.applicant.first_name, "");
    assert_eq!(new.applicant.date_of_birth, None);
  }

  #[test]
  fn blank_strings_count_as_absent() {
    let form = ApplicationForm {
      gender: Some(String::new()),
      priority_level: Some(String::new()),
      grade_level: Some(String::new()),
      date_of_birth: Some(String::new()),
      ..Default::default()
    };
    let new = form.normalize().unwrap();
    assert_eq!(new.applicant.gender, Gender::Other);
    assert_eq!(new.priority, Priority::Medium);
    assert_eq!(new.grade_level, GradeLevel::College);
  }

  #[test]
  fn supplied_values_are_kept() {
    let form: ApplicationForm = serde_json::from_value(serde_json::json!({
      "first_name": "Grace",
      "last_name": "Hopper",
      "gender": "female",
      "date_of_birth": "2008-12-09",
      "grade_level": "grade11",
      "priority_level": "high",
    }))
    .unwrap();
    let new = form.normalize().unwrap();
    assert_eq!(new.applicant.first_name, "Grace");
    assert_eq!(new.applicant.gender, Gender::Female);
    assert_eq!(
      new.applicant.date_of_birth,
      NaiveDate::from_ymd_opt(2008, 12, 9)
    );
    assert_eq!(new.grade_level, GradeLevel::Grade11);
    assert_eq!(new.priority, Priority::High);
  }

  #[test]
  fn unknown_priority_is_a_validation_error() {
    let form = ApplicationForm {
      priority_level: Some("urgent".into()),
      ..Default::default()
    };
    let err = form.normalize().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("priority_level"));
  }

  #[test]
  fn decisions_are_final() {
    let app = EnrollmentApplication {
      id:              9,
      applicant_id:    9,
      academic_year:   "2026-2027".into(),
      grade_level:     GradeLevel::College,
      previous_school: String::new(),
      previous_grade:  String::new(),
      priority:        Priority::Medium,
      status:          EnrollmentStatus::Pending,
      submitted_at:    Utc::now(),
      processed_at:    None,
      processed_by:    None,
      notes:           None,
    };
    let input = DecisionInput {
      decision:   Decision::Approved,
      decided_by: WorkerId::new("registrar"),
      notes:      Some("complete file".into()),
    };
    let decided = app.decide(&input, Utc::now()).unwrap();
    assert_eq!(decided.status, EnrollmentStatus::Approved);
    assert_eq!(decided.processed_by, Some(WorkerId::new("registrar")));

    let err = decided.decide(&input, Utc::now()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
  }
}
