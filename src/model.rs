use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sector: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Eligibility thresholds attached to a drive.
///
/// `allowed_branches` empty means any branch is accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Criteria {
    pub min_cgpa: f64,
    pub max_backlogs: u32,
    pub min_attendance_pct: f64,
    pub allowed_branches: Vec<String>,
    pub no_due_required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drive {
    pub id: String,
    pub company_id: String,
    pub title: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub criteria: Criteria,
    pub created_at: DateTime<Utc>,
}

/// A student record. The eligibility-relevant fields form the candidate view
/// used by the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    #[serde(default)]
    pub roll_no: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub cgpa: f64,
    #[serde(default)]
    pub backlogs: u32,
    #[serde(default)]
    pub attendance_pct: f64,
    #[serde(default)]
    pub no_due: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Applied,
    Shortlisted,
    Ineligible,
    Selected,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "APPLIED",
            ApplicationStatus::Shortlisted => "SHORTLISTED",
            ApplicationStatus::Ineligible => "INELIGIBLE",
            ApplicationStatus::Selected => "SELECTED",
            ApplicationStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "APPLIED" => Some(ApplicationStatus::Applied),
            "SHORTLISTED" => Some(ApplicationStatus::Shortlisted),
            "INELIGIBLE" => Some(ApplicationStatus::Ineligible),
            "SELECTED" => Some(ApplicationStatus::Selected),
            "REJECTED" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub drive_id: String,
    pub student_id: String,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub reason: String,
    pub updated_at: DateTime<Utc>,
}

/// An interview slot. `start_time` is kept as the operator entered it
/// (`YYYY-MM-DDTHH:MM`) and ordered lexicographically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: String,
    pub drive_id: String,
    pub start_time: String,
    pub room: String,
    pub capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub slot_id: String,
    pub application_id: String,
    pub token_no: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferStatus {
    Offered,
    Accepted,
    Declined,
}

impl OfferStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OFFERED" => Some(OfferStatus::Offered),
            "ACCEPTED" => Some(OfferStatus::Accepted),
            "DECLINED" => Some(OfferStatus::Declined),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub id: String,
    pub drive_id: String,
    pub application_id: String,
    pub student_id: String,
    #[serde(default)]
    pub ctc_lpa: Option<f64>,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
}

/// History entry written by every shortlist run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortlistRun {
    pub id: String,
    pub drive_id: String,
    pub ran_at: DateTime<Utc>,
    pub evaluated: usize,
    pub shortlisted: usize,
    pub ineligible: usize,
    #[serde(default)]
    pub skipped: usize,
}
