//! Applicants: the people behind enrollment applications.
//!
//! An applicant is written once, at submission, and is immutable afterwards.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Gender {
  Male,
  Female,
  #[default]
  Other,
}

/// Identity and contact attributes of an applicant, after defaulting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantDetails {
  pub first_name:                     String,
  pub last_name:                      String,
  pub middle_name:                    String,
  pub email:                          String,
  pub phone:                          String,
  pub date_of_birth:                  Option<NaiveDate>,
  pub gender:                         Gender,
  pub address:                        String,
  pub city:                           String,
  pub state:                          String,
  pub zip_code:                       String,
  pub emergency_contact_name:         String,
  pub emergency_contact_phone:        String,
  pub emergency_contact_relationship: String,
}

/// A persisted applicant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Applicant {
  pub id:             i64,
  /// `YYYY` followed by a zero-padded per-year sequence, e.g. `20260007`.
  pub student_number: String,
  #[serde(flatten)]
  pub details:        ApplicantDetails,
  pub created_at:     DateTime<Utc>,
}

impl Applicant {
  pub fn full_name(&self) -> String {
    let d = &self.details;
    [d.first_name.as_str(), d.middle_name.as_str(), d.last_name.as_str()]
      .into_iter()
      .filter(|part| !part.is_empty())
      .collect::<Vec<_>>()
      .join(" ")
  }
}

/// Format a student number from its year and 1-based sequence within that
/// year. Sequences beyond 9999 simply widen.
pub fn student_number(year: i32, sequence: i64) -> String {
  format!("{year}{sequence:04}")
}

/// The `LIKE` prefix that selects every student number issued in `year`.
pub fn student_number_prefix(year: i32) -> String { format!("{year}") }
