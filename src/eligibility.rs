use crate::model::{Application, ApplicationStatus, Criteria, Student};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

pub const ELIGIBLE_REASON: &str = "Eligible as per criteria";
pub const REASON_SEPARATOR: &str = " • ";

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub passed: bool,
    pub reasons: Vec<String>,
}

impl Verdict {
    pub fn reason_text(&self) -> String {
        if self.passed {
            ELIGIBLE_REASON.to_string()
        } else {
            self.reasons.join(REASON_SEPARATOR)
        }
    }
}

/// Checks a candidate against a drive's criteria.
///
/// Every rule is evaluated so that all violations are reported together, in a
/// fixed order: CGPA, backlogs, attendance, no-due, branch.
pub fn evaluate(candidate: &Student, criteria: &Criteria) -> Verdict {
    let mut reasons = Vec::new();

    if candidate.cgpa < criteria.min_cgpa {
        reasons.push(format!("CGPA < {}", criteria.min_cgpa));
    }
    if candidate.backlogs > criteria.max_backlogs {
        reasons.push(format!("Backlogs > {}", criteria.max_backlogs));
    }
    if candidate.attendance_pct < criteria.min_attendance_pct {
        reasons.push(format!("Attendance < {}%", criteria.min_attendance_pct));
    }
    if criteria.no_due_required && !candidate.no_due {
        reasons.push("No Due required".to_string());
    }
    if !criteria.allowed_branches.is_empty()
        && !branch_allowed(&candidate.branch, &criteria.allowed_branches)
    {
        reasons.push("Branch not eligible".to_string());
    }

    Verdict {
        passed: reasons.is_empty(),
        reasons,
    }
}

fn normalize_branch(b: &str) -> String {
    b.trim().to_lowercase()
}

fn branch_allowed(branch: &str, allowed: &[String]) -> bool {
    let b = normalize_branch(branch);
    allowed.iter().any(|a| normalize_branch(a) == b)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriveEvaluation {
    pub applications: Vec<Application>,
    pub evaluated: usize,
    pub shortlisted: usize,
    pub ineligible: usize,
    /// APPLIED records whose student could not be found; returned unchanged.
    pub skipped: usize,
}

/// Classifies every APPLIED application of `drive_id`.
///
/// Applications of other drives, or in any other status, pass through
/// unchanged. The output keeps the input order.
pub fn evaluate_drive(
    applications: &[Application],
    candidates: &HashMap<&str, &Student>,
    drive_id: &str,
    criteria: &Criteria,
    now: DateTime<Utc>,
) -> DriveEvaluation {
    let mut out = DriveEvaluation {
        applications: Vec::with_capacity(applications.len()),
        ..DriveEvaluation::default()
    };

    for app in applications {
        if app.drive_id != drive_id || app.status != ApplicationStatus::Applied {
            out.applications.push(app.clone());
            continue;
        }
        let Some(candidate) = candidates.get(app.student_id.as_str()) else {
            out.skipped += 1;
            out.applications.push(app.clone());
            continue;
        };

        let verdict = evaluate(candidate, criteria);
        out.evaluated += 1;
        let status = if verdict.passed {
            out.shortlisted += 1;
            ApplicationStatus::Shortlisted
        } else {
            out.ineligible += 1;
            ApplicationStatus::Ineligible
        };
        out.applications.push(Application {
            status,
            reason: verdict.reason_text(),
            updated_at: now,
            ..app.clone()
        });
    }

    out
}

/// Allowed branch codes that match no student branch in `students`.
///
/// Such a code can never be satisfied (usually a typo in the drive setup).
/// Returns nothing when there are no students to compare against.
pub fn unknown_branches(criteria: &Criteria, students: &[Student]) -> Vec<String> {
    if students.is_empty() {
        return Vec::new();
    }
    let mut out: Vec<String> = Vec::new();
    for allowed in &criteria.allowed_branches {
        let norm = normalize_branch(allowed);
        if norm.is_empty() {
            continue;
        }
        let known = students.iter().any(|s| normalize_branch(&s.branch) == norm);
        if !known && !out.iter().any(|o| normalize_branch(o) == norm) {
            out.push(allowed.trim().to_string());
        }
    }
    out
}
