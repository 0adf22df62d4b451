use crate::allocator::{assign, ordered_shortlist, ordered_slots, replace_drive_assignments};
use crate::eligibility::{evaluate_drive, unknown_branches};
use crate::model::{
    Application, ApplicationStatus, Assignment, Company, Criteria, Drive, Offer, OfferStatus,
    ShortlistRun, Slot, Student,
};
use crate::store::{keys, load, save, Batch, KvStore, StoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// "Nothing to do yet" outcomes. Not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Advisory {
    #[error("select a drive first")]
    NoActiveDrive,
    #[error("create slots first")]
    NoSlotsDefined,
    #[error("no shortlisted candidates")]
    NoEligibleCandidates,
}

impl Advisory {
    pub fn code(self) -> &'static str {
        match self {
            Advisory::NoActiveDrive => "no_active_drive",
            Advisory::NoSlotsDefined => "no_slots_defined",
            Advisory::NoEligibleCandidates => "no_eligible_candidates",
        }
    }
}

#[derive(Debug, Error)]
pub enum PlacementError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, PlacementError>;

fn not_found(entity: &'static str, id: &str) -> PlacementError {
    PlacementError::NotFound {
        entity,
        id: id.to_string(),
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cascade {
    pub drives: usize,
    pub applications: usize,
    pub slots: usize,
    pub assignments: usize,
    pub offers: usize,
    pub runs: usize,
}

// ---- companies ----

pub fn list_companies(store: &dyn KvStore) -> Result<Vec<Company>> {
    let mut companies: Vec<Company> = load(store, keys::COMPANIES)?;
    companies.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(companies)
}

pub fn create_company(
    store: &mut dyn KvStore,
    name: &str,
    sector: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Company> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PlacementError::Invalid("name must not be empty".into()));
    }
    let mut companies: Vec<Company> = load(store, keys::COMPANIES)?;
    if companies.iter().any(|c| c.name.eq_ignore_ascii_case(name)) {
        return Err(PlacementError::Conflict(format!("company already exists: {}", name)));
    }
    let company = Company {
        id: new_id(),
        name: name.to_string(),
        sector: sector.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string),
        created_at: now,
    };
    companies.push(company.clone());
    save(store, keys::COMPANIES, &companies)?;
    Ok(company)
}

pub fn delete_company(store: &mut dyn KvStore, company_id: &str) -> Result<Cascade> {
    let mut companies: Vec<Company> = load(store, keys::COMPANIES)?;
    let before = companies.len();
    companies.retain(|c| c.id != company_id);
    if companies.len() == before {
        return Err(not_found("company", company_id));
    }
    let drives: Vec<Drive> = load(store, keys::DRIVES)?;
    let drive_ids: HashSet<String> = drives
        .iter()
        .filter(|d| d.company_id == company_id)
        .map(|d| d.id.clone())
        .collect();

    let mut batch = Batch::default();
    batch.put(keys::COMPANIES, &companies)?;
    let cascade = remove_drives(store, &drive_ids, &mut batch)?;
    batch.commit(store)?;
    Ok(cascade)
}

// ---- drives ----

pub fn list_drives(store: &dyn KvStore, company_id: Option<&str>) -> Result<Vec<Drive>> {
    let mut drives: Vec<Drive> = load(store, keys::DRIVES)?;
    if let Some(cid) = company_id {
        drives.retain(|d| d.company_id == cid);
    }
    drives.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(drives)
}

pub fn get_drive(store: &dyn KvStore, drive_id: &str) -> Result<Drive> {
    let drives: Vec<Drive> = load(store, keys::DRIVES)?;
    drives
        .into_iter()
        .find(|d| d.id == drive_id)
        .ok_or_else(|| not_found("drive", drive_id))
}

fn validate_criteria(criteria: &Criteria) -> Result<Criteria> {
    if !(0.0..=10.0).contains(&criteria.min_cgpa) {
        return Err(PlacementError::Invalid("minCgpa must be between 0 and 10".into()));
    }
    if !(0.0..=100.0).contains(&criteria.min_attendance_pct) {
        return Err(PlacementError::Invalid(
            "minAttendancePct must be between 0 and 100".into(),
        ));
    }
    let mut branches: Vec<String> = Vec::new();
    for b in &criteria.allowed_branches {
        let t = b.trim().to_uppercase();
        if !t.is_empty() && !branches.contains(&t) {
            branches.push(t);
        }
    }
    Ok(Criteria {
        allowed_branches: branches,
        ..criteria.clone()
    })
}

pub fn create_drive(
    store: &mut dyn KvStore,
    company_id: &str,
    title: &str,
    role: Option<&str>,
    criteria: &Criteria,
    now: DateTime<Utc>,
) -> Result<Drive> {
    let title = title.trim();
    if title.is_empty() {
        return Err(PlacementError::Invalid("title must not be empty".into()));
    }
    let companies: Vec<Company> = load(store, keys::COMPANIES)?;
    if !companies.iter().any(|c| c.id == company_id) {
        return Err(not_found("company", company_id));
    }
    let drive = Drive {
        id: new_id(),
        company_id: company_id.to_string(),
        title: title.to_string(),
        role: role.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string),
        criteria: validate_criteria(criteria)?,
        created_at: now,
    };
    let mut drives: Vec<Drive> = load(store, keys::DRIVES)?;
    drives.push(drive.clone());
    save(store, keys::DRIVES, &drives)?;
    Ok(drive)
}

pub fn update_criteria(
    store: &mut dyn KvStore,
    drive_id: &str,
    criteria: &Criteria,
) -> Result<Drive> {
    let criteria = validate_criteria(criteria)?;
    let mut drives: Vec<Drive> = load(store, keys::DRIVES)?;
    let Some(drive) = drives.iter_mut().find(|d| d.id == drive_id) else {
        return Err(not_found("drive", drive_id));
    };
    drive.criteria = criteria;
    let updated = drive.clone();
    save(store, keys::DRIVES, &drives)?;
    Ok(updated)
}

pub fn delete_drive(store: &mut dyn KvStore, drive_id: &str) -> Result<Cascade> {
    let drives: Vec<Drive> = load(store, keys::DRIVES)?;
    if !drives.iter().any(|d| d.id == drive_id) {
        return Err(not_found("drive", drive_id));
    }
    let ids: HashSet<String> = [drive_id.to_string()].into_iter().collect();
    let mut batch = Batch::default();
    let cascade = remove_drives(store, &ids, &mut batch)?;
    batch.commit(store)?;
    Ok(cascade)
}

/// Stages removal of the given drives and everything hanging off them.
fn remove_drives(
    store: &dyn KvStore,
    drive_ids: &HashSet<String>,
    batch: &mut Batch,
) -> Result<Cascade> {
    let mut cascade = Cascade::default();
    if drive_ids.is_empty() {
        return Ok(cascade);
    }

    let mut drives: Vec<Drive> = load(store, keys::DRIVES)?;
    let mut applications: Vec<Application> = load(store, keys::APPLICATIONS)?;
    let mut slots: Vec<Slot> = load(store, keys::SLOTS)?;
    let mut assignments: Vec<Assignment> = load(store, keys::ASSIGNMENTS)?;
    let mut offers: Vec<Offer> = load(store, keys::OFFERS)?;
    let mut runs: Vec<ShortlistRun> = load(store, keys::RUNS)?;

    let n = drives.len();
    drives.retain(|d| !drive_ids.contains(&d.id));
    cascade.drives = n - drives.len();

    let removed_slots: HashSet<String> = slots
        .iter()
        .filter(|s| drive_ids.contains(&s.drive_id))
        .map(|s| s.id.clone())
        .collect();
    let removed_apps: HashSet<String> = applications
        .iter()
        .filter(|a| drive_ids.contains(&a.drive_id))
        .map(|a| a.id.clone())
        .collect();

    let n = slots.len();
    slots.retain(|s| !removed_slots.contains(&s.id));
    cascade.slots = n - slots.len();

    let n = applications.len();
    applications.retain(|a| !removed_apps.contains(&a.id));
    cascade.applications = n - applications.len();

    let n = assignments.len();
    assignments.retain(|a| {
        !removed_slots.contains(&a.slot_id) && !removed_apps.contains(&a.application_id)
    });
    cascade.assignments = n - assignments.len();

    let n = offers.len();
    offers.retain(|o| !drive_ids.contains(&o.drive_id));
    cascade.offers = n - offers.len();

    let n = runs.len();
    runs.retain(|r| !drive_ids.contains(&r.drive_id));
    cascade.runs = n - runs.len();

    batch
        .put(keys::DRIVES, &drives)?
        .put(keys::SLOTS, &slots)?
        .put(keys::APPLICATIONS, &applications)?
        .put(keys::ASSIGNMENTS, &assignments)?
        .put(keys::OFFERS, &offers)?
        .put(keys::RUNS, &runs)?;

    let active: Option<String> = load(store, keys::ACTIVE_DRIVE)?;
    if active.as_ref().is_some_and(|id| drive_ids.contains(id)) {
        batch.put(keys::ACTIVE_DRIVE, &Option::<String>::None)?;
    }

    Ok(cascade)
}

pub fn set_active_drive(store: &mut dyn KvStore, drive_id: Option<&str>) -> Result<Option<Drive>> {
    let drive = match drive_id {
        Some(id) => Some(get_drive(store, id)?),
        None => None,
    };
    save(store, keys::ACTIVE_DRIVE, &drive.as_ref().map(|d| d.id.clone()))?;
    Ok(drive)
}

/// The active drive, if one is set and still exists.
pub fn active_drive(store: &dyn KvStore) -> Result<Option<Drive>> {
    let active: Option<String> = load(store, keys::ACTIVE_DRIVE)?;
    let Some(id) = active else {
        return Ok(None);
    };
    match get_drive(store, &id) {
        Ok(d) => Ok(Some(d)),
        Err(PlacementError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// An explicit drive id must exist; otherwise falls back to the active drive.
pub fn resolve_drive(store: &dyn KvStore, drive_id: Option<&str>) -> Result<Option<Drive>> {
    match drive_id.map(str::trim).filter(|s| !s.is_empty()) {
        Some(id) => get_drive(store, id).map(Some),
        None => active_drive(store),
    }
}

// ---- students ----

pub fn list_students(store: &dyn KvStore, branch: Option<&str>) -> Result<Vec<Student>> {
    let mut students: Vec<Student> = load(store, keys::STUDENTS)?;
    if let Some(b) = branch.map(str::trim).filter(|s| !s.is_empty()) {
        students.retain(|s| s.branch.trim().eq_ignore_ascii_case(b));
    }
    students.sort_by(|a, b| a.roll_no.cmp(&b.roll_no).then_with(|| a.name.cmp(&b.name)));
    Ok(students)
}

/// Inserts or replaces a student. An empty id creates a new record.
pub fn upsert_student(store: &mut dyn KvStore, student: Student) -> Result<Student> {
    if !(0.0..=10.0).contains(&student.cgpa) {
        return Err(PlacementError::Invalid("cgpa must be between 0 and 10".into()));
    }
    if !(0.0..=100.0).contains(&student.attendance_pct) {
        return Err(PlacementError::Invalid(
            "attendancePct must be between 0 and 100".into(),
        ));
    }
    let mut student = Student {
        roll_no: student.roll_no.trim().to_string(),
        name: student.name.trim().to_string(),
        branch: student.branch.trim().to_uppercase(),
        ..student
    };
    if student.id.trim().is_empty() {
        student.id = new_id();
    }

    let mut students: Vec<Student> = load(store, keys::STUDENTS)?;
    if !student.roll_no.is_empty()
        && students
            .iter()
            .any(|s| s.id != student.id && s.roll_no.eq_ignore_ascii_case(&student.roll_no))
    {
        return Err(PlacementError::Conflict(format!(
            "roll number already in use: {}",
            student.roll_no
        )));
    }
    match students.iter_mut().find(|s| s.id == student.id) {
        Some(existing) => *existing = student.clone(),
        None => students.push(student.clone()),
    }
    save(store, keys::STUDENTS, &students)?;
    Ok(student)
}

pub fn delete_student(store: &mut dyn KvStore, student_id: &str) -> Result<Cascade> {
    let mut students: Vec<Student> = load(store, keys::STUDENTS)?;
    let n = students.len();
    students.retain(|s| s.id != student_id);
    if students.len() == n {
        return Err(not_found("student", student_id));
    }
    let applications: Vec<Application> = load(store, keys::APPLICATIONS)?;
    let app_ids: HashSet<String> = applications
        .iter()
        .filter(|a| a.student_id == student_id)
        .map(|a| a.id.clone())
        .collect();

    let mut batch = Batch::default();
    batch.put(keys::STUDENTS, &students)?;
    let cascade = remove_applications(store, &app_ids, &mut batch)?;
    batch.commit(store)?;
    Ok(cascade)
}

fn remove_applications(
    store: &dyn KvStore,
    app_ids: &HashSet<String>,
    batch: &mut Batch,
) -> Result<Cascade> {
    let mut cascade = Cascade::default();
    if app_ids.is_empty() {
        return Ok(cascade);
    }
    let mut applications: Vec<Application> = load(store, keys::APPLICATIONS)?;
    let mut assignments: Vec<Assignment> = load(store, keys::ASSIGNMENTS)?;
    let mut offers: Vec<Offer> = load(store, keys::OFFERS)?;

    let n = applications.len();
    applications.retain(|a| !app_ids.contains(&a.id));
    cascade.applications = n - applications.len();

    let n = assignments.len();
    assignments.retain(|a| !app_ids.contains(&a.application_id));
    cascade.assignments = n - assignments.len();

    let n = offers.len();
    offers.retain(|o| !app_ids.contains(&o.application_id));
    cascade.offers = n - offers.len();

    batch
        .put(keys::APPLICATIONS, &applications)?
        .put(keys::ASSIGNMENTS, &assignments)?
        .put(keys::OFFERS, &offers)?;
    Ok(cascade)
}

// ---- applications ----

pub fn list_applications(
    store: &dyn KvStore,
    drive_id: &str,
    status: Option<ApplicationStatus>,
) -> Result<Vec<Application>> {
    let mut applications: Vec<Application> = load(store, keys::APPLICATIONS)?;
    applications.retain(|a| a.drive_id == drive_id && status.map_or(true, |s| a.status == s));
    Ok(applications)
}

/// Creates an APPLIED record. One application per (drive, student).
pub fn create_application(
    store: &mut dyn KvStore,
    drive_id: &str,
    student_id: &str,
    now: DateTime<Utc>,
) -> Result<Application> {
    get_drive(store, drive_id)?;
    let students: Vec<Student> = load(store, keys::STUDENTS)?;
    if !students.iter().any(|s| s.id == student_id) {
        return Err(not_found("student", student_id));
    }
    let mut applications: Vec<Application> = load(store, keys::APPLICATIONS)?;
    if applications
        .iter()
        .any(|a| a.drive_id == drive_id && a.student_id == student_id)
    {
        return Err(PlacementError::Conflict(
            "student already applied to this drive".into(),
        ));
    }
    let app = Application {
        id: new_id(),
        drive_id: drive_id.to_string(),
        student_id: student_id.to_string(),
        status: ApplicationStatus::Applied,
        reason: String::new(),
        updated_at: now,
    };
    applications.push(app.clone());
    save(store, keys::APPLICATIONS, &applications)?;
    Ok(app)
}

fn set_application_status(
    applications: &mut [Application],
    application_id: &str,
    status: ApplicationStatus,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<Application> {
    let Some(app) = applications.iter_mut().find(|a| a.id == application_id) else {
        return Err(not_found("application", application_id));
    };
    app.status = status;
    app.reason = reason.to_string();
    app.updated_at = now;
    Ok(app.clone())
}

/// Marks an application REJECTED and frees its interview token. Applications
/// holding an offer (SELECTED) or already rejected are left alone.
pub fn reject_application(
    store: &mut dyn KvStore,
    application_id: &str,
    now: DateTime<Utc>,
) -> Result<Application> {
    let mut applications: Vec<Application> = load(store, keys::APPLICATIONS)?;
    let Some(current) = applications.iter().find(|a| a.id == application_id) else {
        return Err(not_found("application", application_id));
    };
    if matches!(
        current.status,
        ApplicationStatus::Selected | ApplicationStatus::Rejected
    ) {
        return Err(PlacementError::Invalid(format!(
            "cannot reject an application with status {}",
            current.status.as_str()
        )));
    }
    let app = set_application_status(
        &mut applications,
        application_id,
        ApplicationStatus::Rejected,
        "Rejected by placement office",
        now,
    )?;
    let mut assignments: Vec<Assignment> = load(store, keys::ASSIGNMENTS)?;
    assignments.retain(|a| a.application_id != application_id);

    let mut batch = Batch::default();
    batch
        .put(keys::APPLICATIONS, &applications)?
        .put(keys::ASSIGNMENTS, &assignments)?;
    batch.commit(store)?;
    Ok(app)
}

pub fn delete_application(store: &mut dyn KvStore, application_id: &str) -> Result<Cascade> {
    let applications: Vec<Application> = load(store, keys::APPLICATIONS)?;
    if !applications.iter().any(|a| a.id == application_id) {
        return Err(not_found("application", application_id));
    }
    let ids: HashSet<String> = [application_id.to_string()].into_iter().collect();
    let mut batch = Batch::default();
    let cascade = remove_applications(store, &ids, &mut batch)?;
    batch.commit(store)?;
    Ok(cascade)
}

// ---- slots ----

pub fn list_slots(store: &dyn KvStore, drive_id: &str) -> Result<Vec<Slot>> {
    let slots: Vec<Slot> = load(store, keys::SLOTS)?;
    Ok(ordered_slots(&slots, drive_id).into_iter().cloned().collect())
}

pub fn create_slot(
    store: &mut dyn KvStore,
    drive_id: &str,
    start_time: &str,
    room: &str,
    capacity: u32,
) -> Result<Slot> {
    get_drive(store, drive_id)?;
    let start_time = start_time.trim();
    let room = room.trim();
    if start_time.is_empty() {
        return Err(PlacementError::Invalid("startTime must not be empty".into()));
    }
    if room.is_empty() {
        return Err(PlacementError::Invalid("room must not be empty".into()));
    }
    if capacity == 0 {
        return Err(PlacementError::Invalid("capacity must be positive".into()));
    }
    let slot = Slot {
        id: new_id(),
        drive_id: drive_id.to_string(),
        start_time: start_time.to_string(),
        room: room.to_string(),
        capacity,
    };
    let mut slots: Vec<Slot> = load(store, keys::SLOTS)?;
    slots.push(slot.clone());
    save(store, keys::SLOTS, &slots)?;
    Ok(slot)
}

/// Deletes a slot together with its assignments. Returns how many
/// assignments went with it.
pub fn delete_slot(store: &mut dyn KvStore, slot_id: &str) -> Result<usize> {
    let mut slots: Vec<Slot> = load(store, keys::SLOTS)?;
    let n = slots.len();
    slots.retain(|s| s.id != slot_id);
    if slots.len() == n {
        return Err(not_found("slot", slot_id));
    }
    let mut assignments: Vec<Assignment> = load(store, keys::ASSIGNMENTS)?;
    let n = assignments.len();
    assignments.retain(|a| a.slot_id != slot_id);
    let removed = n - assignments.len();

    let mut batch = Batch::default();
    batch
        .put(keys::SLOTS, &slots)?
        .put(keys::ASSIGNMENTS, &assignments)?;
    batch.commit(store)?;
    Ok(removed)
}

// ---- shortlist + assignment ----

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShortlistOutcome {
    pub drive_id: Option<String>,
    pub run: Option<ShortlistRun>,
    pub unknown_branches: Vec<String>,
    pub advisory: Option<Advisory>,
}

/// Re-evaluates every APPLIED application of the drive and records the run.
pub fn run_shortlist(
    store: &mut dyn KvStore,
    drive_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ShortlistOutcome> {
    let Some(drive) = resolve_drive(store, drive_id)? else {
        return Ok(ShortlistOutcome {
            advisory: Some(Advisory::NoActiveDrive),
            ..ShortlistOutcome::default()
        });
    };

    let students: Vec<Student> = load(store, keys::STUDENTS)?;
    let applications: Vec<Application> = load(store, keys::APPLICATIONS)?;
    let by_id: HashMap<&str, &Student> = students.iter().map(|s| (s.id.as_str(), s)).collect();

    let eval = evaluate_drive(&applications, &by_id, &drive.id, &drive.criteria, now);
    let run = ShortlistRun {
        id: new_id(),
        drive_id: drive.id.clone(),
        ran_at: now,
        evaluated: eval.evaluated,
        shortlisted: eval.shortlisted,
        ineligible: eval.ineligible,
        skipped: eval.skipped,
    };
    let mut runs: Vec<ShortlistRun> = load(store, keys::RUNS)?;
    runs.push(run.clone());

    let mut batch = Batch::default();
    batch
        .put(keys::APPLICATIONS, &eval.applications)?
        .put(keys::RUNS, &runs)?;
    batch.commit(store)?;

    let unknown = unknown_branches(&drive.criteria, &students);
    if !unknown.is_empty() {
        warn!(drive = %drive.id, branches = ?unknown, "allowed branches match no student");
    }
    if eval.skipped > 0 {
        warn!(drive = %drive.id, skipped = eval.skipped, "applications without a student record");
    }
    info!(
        drive = %drive.id,
        evaluated = eval.evaluated,
        shortlisted = eval.shortlisted,
        ineligible = eval.ineligible,
        "shortlist run complete"
    );

    Ok(ShortlistOutcome {
        drive_id: Some(drive.id),
        run: Some(run),
        unknown_branches: unknown,
        advisory: None,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignOutcome {
    pub drive_id: Option<String>,
    pub assignments: Vec<Assignment>,
    pub shortlisted: usize,
    pub capacity: u64,
    pub advisory: Option<Advisory>,
}

impl AssignOutcome {
    pub fn assigned(&self) -> usize {
        self.assignments.len()
    }
}

/// Recomputes the drive's interview assignments and replaces the old ones.
///
/// Without slots or shortlisted candidates the drive's assignments are still
/// cleared and the outcome carries an advisory.
pub fn auto_assign(store: &mut dyn KvStore, drive_id: Option<&str>) -> Result<AssignOutcome> {
    let Some(drive) = resolve_drive(store, drive_id)? else {
        return Ok(AssignOutcome {
            advisory: Some(Advisory::NoActiveDrive),
            ..AssignOutcome::default()
        });
    };

    let slots: Vec<Slot> = load(store, keys::SLOTS)?;
    let applications: Vec<Application> = load(store, keys::APPLICATIONS)?;
    let existing: Vec<Assignment> = load(store, keys::ASSIGNMENTS)?;

    let slot_order = ordered_slots(&slots, &drive.id);
    let shortlist = ordered_shortlist(&applications, &drive.id);
    let drive_slot_ids: HashSet<&str> = slot_order.iter().map(|s| s.id.as_str()).collect();

    let fresh = assign(&slot_order, &shortlist, new_id);
    let stored = replace_drive_assignments(existing, &drive_slot_ids, fresh.clone());
    save(store, keys::ASSIGNMENTS, &stored)?;

    let advisory = if slot_order.is_empty() {
        Some(Advisory::NoSlotsDefined)
    } else if shortlist.is_empty() {
        Some(Advisory::NoEligibleCandidates)
    } else {
        None
    };
    let capacity: u64 = slot_order.iter().map(|s| u64::from(s.capacity)).sum();

    info!(
        drive = %drive.id,
        assigned = fresh.len(),
        shortlisted = shortlist.len(),
        "auto assign complete"
    );
    if fresh.len() < shortlist.len() {
        warn!(
            drive = %drive.id,
            unassigned = shortlist.len() - fresh.len(),
            "slot capacity short of shortlist"
        );
    }

    Ok(AssignOutcome {
        drive_id: Some(drive.id),
        shortlisted: shortlist.len(),
        capacity,
        assignments: fresh,
        advisory,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRow {
    pub assignment_id: String,
    pub slot_id: String,
    pub start_time: String,
    pub room: String,
    pub token_no: u32,
    pub application_id: String,
    pub student_id: String,
    pub student_name: String,
    pub roll_no: String,
}

/// The drive's assignments in slot order then token order.
pub fn assignment_rows(store: &dyn KvStore, drive_id: &str) -> Result<Vec<AssignmentRow>> {
    let slots: Vec<Slot> = load(store, keys::SLOTS)?;
    let assignments: Vec<Assignment> = load(store, keys::ASSIGNMENTS)?;
    let applications: Vec<Application> = load(store, keys::APPLICATIONS)?;
    let students: Vec<Student> = load(store, keys::STUDENTS)?;

    let apps: HashMap<&str, &Application> =
        applications.iter().map(|a| (a.id.as_str(), a)).collect();
    let studs: HashMap<&str, &Student> = students.iter().map(|s| (s.id.as_str(), s)).collect();

    let mut rows = Vec::new();
    for slot in ordered_slots(&slots, drive_id) {
        let mut in_slot: Vec<&Assignment> =
            assignments.iter().filter(|a| a.slot_id == slot.id).collect();
        in_slot.sort_by_key(|a| a.token_no);
        for a in in_slot {
            let student_id = apps
                .get(a.application_id.as_str())
                .map(|app| app.student_id.clone())
                .unwrap_or_default();
            let student = studs.get(student_id.as_str());
            rows.push(AssignmentRow {
                assignment_id: a.id.clone(),
                slot_id: slot.id.clone(),
                start_time: slot.start_time.clone(),
                room: slot.room.clone(),
                token_no: a.token_no,
                application_id: a.application_id.clone(),
                student_name: student.map(|s| s.name.clone()).unwrap_or_default(),
                roll_no: student.map(|s| s.roll_no.clone()).unwrap_or_default(),
                student_id,
            });
        }
    }
    Ok(rows)
}

pub fn list_runs(store: &dyn KvStore, drive_id: Option<&str>) -> Result<Vec<ShortlistRun>> {
    let mut runs: Vec<ShortlistRun> = load(store, keys::RUNS)?;
    if let Some(id) = drive_id {
        runs.retain(|r| r.drive_id == id);
    }
    runs.sort_by(|a, b| b.ran_at.cmp(&a.ran_at));
    Ok(runs)
}

// ---- offers ----

pub fn list_offers(store: &dyn KvStore, drive_id: Option<&str>) -> Result<Vec<Offer>> {
    let mut offers: Vec<Offer> = load(store, keys::OFFERS)?;
    if let Some(id) = drive_id {
        offers.retain(|o| o.drive_id == id);
    }
    Ok(offers)
}

/// Extends an offer for a shortlisted application and marks it SELECTED.
pub fn create_offer(
    store: &mut dyn KvStore,
    application_id: &str,
    ctc_lpa: Option<f64>,
    now: DateTime<Utc>,
) -> Result<Offer> {
    if ctc_lpa.is_some_and(|v| !v.is_finite() || v < 0.0) {
        return Err(PlacementError::Invalid("ctcLpa must be a non-negative number".into()));
    }
    let mut applications: Vec<Application> = load(store, keys::APPLICATIONS)?;
    let Some(current) = applications.iter().find(|a| a.id == application_id) else {
        return Err(not_found("application", application_id));
    };
    if current.status != ApplicationStatus::Shortlisted {
        return Err(PlacementError::Invalid(format!(
            "only SHORTLISTED applications can receive an offer (status is {})",
            current.status.as_str()
        )));
    }
    let mut offers: Vec<Offer> = load(store, keys::OFFERS)?;
    if offers.iter().any(|o| o.application_id == application_id) {
        return Err(PlacementError::Conflict(
            "an offer already exists for this application".into(),
        ));
    }

    let app = set_application_status(
        &mut applications,
        application_id,
        ApplicationStatus::Selected,
        "Offer extended",
        now,
    )?;
    let offer = Offer {
        id: new_id(),
        drive_id: app.drive_id.clone(),
        application_id: app.id.clone(),
        student_id: app.student_id.clone(),
        ctc_lpa,
        status: OfferStatus::Offered,
        created_at: now,
    };
    offers.push(offer.clone());

    let mut batch = Batch::default();
    batch
        .put(keys::APPLICATIONS, &applications)?
        .put(keys::OFFERS, &offers)?;
    batch.commit(store)?;
    Ok(offer)
}

pub fn set_offer_status(
    store: &mut dyn KvStore,
    offer_id: &str,
    status: OfferStatus,
) -> Result<Offer> {
    let mut offers: Vec<Offer> = load(store, keys::OFFERS)?;
    let Some(offer) = offers.iter_mut().find(|o| o.id == offer_id) else {
        return Err(not_found("offer", offer_id));
    };
    offer.status = status;
    let updated = offer.clone();
    save(store, keys::OFFERS, &offers)?;
    Ok(updated)
}
