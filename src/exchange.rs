//! Whole-workspace JSON exchange document.
//!
//! One object with a top-level array per entity type. Import replaces the
//! store contents in a single batch after checking ids and references.

use crate::model::{Application, Assignment, Company, Drive, Offer, ShortlistRun, Slot, Student};
use crate::store::{keys, load, Batch, KvStore, StoreError};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementDocument {
    pub companies: Vec<Company>,
    pub drives: Vec<Drive>,
    pub students: Vec<Student>,
    pub applications: Vec<Application>,
    pub slots: Vec<Slot>,
    pub assignments: Vec<Assignment>,
    pub offers: Vec<Offer>,
    pub runs: Vec<ShortlistRun>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCounts {
    pub companies: usize,
    pub drives: usize,
    pub students: usize,
    pub applications: usize,
    pub slots: usize,
    pub assignments: usize,
    pub offers: usize,
    pub runs: usize,
}

impl PlacementDocument {
    pub fn counts(&self) -> DocumentCounts {
        DocumentCounts {
            companies: self.companies.len(),
            drives: self.drives.len(),
            students: self.students.len(),
            applications: self.applications.len(),
            slots: self.slots.len(),
            assignments: self.assignments.len(),
            offers: self.offers.len(),
            runs: self.runs.len(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document must be a JSON object of arrays")]
    NotAnObject,

    #[error("duplicate {entity} id: {id}")]
    DuplicateId { entity: &'static str, id: String },

    #[error("{entity} {id} references unknown {target} {target_id}")]
    DanglingRef {
        entity: &'static str,
        id: String,
        target: &'static str,
        target_id: String,
    },

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub fn snapshot(store: &dyn KvStore) -> Result<PlacementDocument, StoreError> {
    Ok(PlacementDocument {
        companies: load(store, keys::COMPANIES)?,
        drives: load(store, keys::DRIVES)?,
        students: load(store, keys::STUDENTS)?,
        applications: load(store, keys::APPLICATIONS)?,
        slots: load(store, keys::SLOTS)?,
        assignments: load(store, keys::ASSIGNMENTS)?,
        offers: load(store, keys::OFFERS)?,
        runs: load(store, keys::RUNS)?,
    })
}

pub fn parse_document(text: &str) -> Result<PlacementDocument, ExchangeError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(ExchangeError::NotAnObject);
    }
    let doc: PlacementDocument = serde_json::from_value(value)?;
    validate(&doc)?;
    Ok(doc)
}

fn unique_ids<'a, I>(entity: &'static str, ids: I) -> Result<HashSet<&'a str>, ExchangeError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(ExchangeError::DuplicateId {
                entity,
                id: id.to_string(),
            });
        }
    }
    Ok(seen)
}

fn require(
    known: &HashSet<&str>,
    entity: &'static str,
    id: &str,
    target: &'static str,
    target_id: &str,
) -> Result<(), ExchangeError> {
    if known.contains(target_id) {
        return Ok(());
    }
    Err(ExchangeError::DanglingRef {
        entity,
        id: id.to_string(),
        target,
        target_id: target_id.to_string(),
    })
}

/// Checks ids, references and slot token bounds.
pub fn validate(doc: &PlacementDocument) -> Result<(), ExchangeError> {
    let companies = unique_ids("company", doc.companies.iter().map(|c| c.id.as_str()))?;
    let drives = unique_ids("drive", doc.drives.iter().map(|d| d.id.as_str()))?;
    let students = unique_ids("student", doc.students.iter().map(|s| s.id.as_str()))?;
    let applications = unique_ids("application", doc.applications.iter().map(|a| a.id.as_str()))?;
    let slots = unique_ids("slot", doc.slots.iter().map(|s| s.id.as_str()))?;
    unique_ids("assignment", doc.assignments.iter().map(|a| a.id.as_str()))?;
    unique_ids("offer", doc.offers.iter().map(|o| o.id.as_str()))?;
    unique_ids("run", doc.runs.iter().map(|r| r.id.as_str()))?;

    for d in &doc.drives {
        require(&companies, "drive", &d.id, "company", &d.company_id)?;
    }
    let mut pairs = HashSet::new();
    for a in &doc.applications {
        require(&drives, "application", &a.id, "drive", &a.drive_id)?;
        require(&students, "application", &a.id, "student", &a.student_id)?;
        if !pairs.insert((a.drive_id.as_str(), a.student_id.as_str())) {
            return Err(ExchangeError::Invalid(format!(
                "student {} has more than one application for drive {}",
                a.student_id, a.drive_id
            )));
        }
    }
    let app_owner: HashMap<&str, (&str, &str)> = doc
        .applications
        .iter()
        .map(|a| (a.id.as_str(), (a.drive_id.as_str(), a.student_id.as_str())))
        .collect();
    let mut slot_drive: HashMap<&str, &str> = HashMap::new();
    let mut capacity: HashMap<&str, u32> = HashMap::new();
    for s in &doc.slots {
        require(&drives, "slot", &s.id, "drive", &s.drive_id)?;
        if s.capacity == 0 {
            return Err(ExchangeError::Invalid(format!("slot {} has zero capacity", s.id)));
        }
        capacity.insert(s.id.as_str(), s.capacity);
        slot_drive.insert(s.id.as_str(), s.drive_id.as_str());
    }
    let mut tokens = HashSet::new();
    for a in &doc.assignments {
        require(&slots, "assignment", &a.id, "slot", &a.slot_id)?;
        require(&applications, "assignment", &a.id, "application", &a.application_id)?;
        let slot_drive_id = slot_drive.get(a.slot_id.as_str()).copied().unwrap_or("");
        let app_drive_id = app_owner.get(a.application_id.as_str()).map_or("", |o| o.0);
        if slot_drive_id != app_drive_id {
            return Err(ExchangeError::Invalid(format!(
                "assignment {} puts an application of drive {} into a slot of drive {}",
                a.id, app_drive_id, slot_drive_id
            )));
        }
        let cap = capacity.get(a.slot_id.as_str()).copied().unwrap_or(0);
        if a.token_no == 0 || a.token_no > cap {
            return Err(ExchangeError::Invalid(format!(
                "assignment {} token {} outside 1..={}",
                a.id, a.token_no, cap
            )));
        }
        if !tokens.insert((a.slot_id.as_str(), a.token_no)) {
            return Err(ExchangeError::Invalid(format!(
                "token {} used twice in slot {}",
                a.token_no, a.slot_id
            )));
        }
    }
    for o in &doc.offers {
        require(&applications, "offer", &o.id, "application", &o.application_id)?;
        let (drive_id, student_id) = app_owner
            .get(o.application_id.as_str())
            .copied()
            .unwrap_or(("", ""));
        if o.drive_id != drive_id || o.student_id != student_id {
            return Err(ExchangeError::Invalid(format!(
                "offer {} does not match the drive and student of application {}",
                o.id, o.application_id
            )));
        }
    }
    for r in &doc.runs {
        require(&drives, "run", &r.id, "drive", &r.drive_id)?;
    }
    Ok(())
}

/// Replaces every entity array with the document's contents. The active drive
/// is cleared when it is not part of the document.
pub fn replace_all(store: &mut dyn KvStore, doc: &PlacementDocument) -> Result<(), StoreError> {
    let active: Option<String> = load(store, keys::ACTIVE_DRIVE)?;
    let mut batch = Batch::default();
    batch
        .put(keys::COMPANIES, &doc.companies)?
        .put(keys::DRIVES, &doc.drives)?
        .put(keys::STUDENTS, &doc.students)?
        .put(keys::APPLICATIONS, &doc.applications)?
        .put(keys::SLOTS, &doc.slots)?
        .put(keys::ASSIGNMENTS, &doc.assignments)?
        .put(keys::OFFERS, &doc.offers)?
        .put(keys::RUNS, &doc.runs)?;
    if let Some(id) = active {
        if !doc.drives.iter().any(|d| d.id == id) {
            batch.put(keys::ACTIVE_DRIVE, &Option::<String>::None)?;
        }
    }
    batch.commit(store)
}

pub fn export_to_file(store: &dyn KvStore, out_path: &Path) -> anyhow::Result<DocumentCounts> {
    let doc = snapshot(store).context("failed to read workspace data")?;
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let text = serde_json::to_string(&doc).context("failed to serialize document")?;
    std::fs::write(out_path, text)
        .with_context(|| format!("failed to write {}", out_path.to_string_lossy()))?;
    Ok(doc.counts())
}

pub fn read_document(in_path: &Path) -> anyhow::Result<PlacementDocument> {
    let text = std::fs::read_to_string(in_path)
        .with_context(|| format!("failed to read {}", in_path.to_string_lossy()))?;
    Ok(parse_document(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApplicationStatus, Criteria, OfferStatus};
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn sample() -> PlacementDocument {
        let at = Utc.with_ymd_and_hms(2026, 7, 1, 9, 0, 0).unwrap();
        PlacementDocument {
            companies: vec![Company {
                id: "c1".into(),
                name: "Acme".into(),
                sector: None,
                created_at: at,
            }],
            drives: vec![Drive {
                id: "d1".into(),
                company_id: "c1".into(),
                title: "SDE".into(),
                role: None,
                criteria: Criteria::default(),
                created_at: at,
            }],
            students: vec![Student {
                id: "s1".into(),
                roll_no: "R1".into(),
                name: "Asha".into(),
                branch: "CSE".into(),
                cgpa: 8.0,
                backlogs: 0,
                attendance_pct: 90.0,
                no_due: true,
            }],
            applications: vec![Application {
                id: "a1".into(),
                drive_id: "d1".into(),
                student_id: "s1".into(),
                status: ApplicationStatus::Shortlisted,
                reason: "Eligible as per criteria".into(),
                updated_at: at,
            }],
            slots: vec![Slot {
                id: "sl1".into(),
                drive_id: "d1".into(),
                start_time: "2026-07-02T10:00".into(),
                room: "Lab".into(),
                capacity: 2,
            }],
            assignments: vec![Assignment {
                id: "as1".into(),
                slot_id: "sl1".into(),
                application_id: "a1".into(),
                token_no: 1,
            }],
            offers: Vec::new(),
            runs: Vec::new(),
        }
    }

    #[test]
    fn missing_arrays_default_to_empty() {
        let doc = parse_document(r#"{"companies":[]}"#).expect("parse");
        assert_eq!(doc, PlacementDocument::default());
    }

    #[test]
    fn rejects_non_object_documents() {
        assert!(matches!(parse_document("[]"), Err(ExchangeError::NotAnObject)));
        assert!(matches!(parse_document("{"), Err(ExchangeError::Json(_))));
    }

    #[test]
    fn rejects_dangling_and_out_of_range_records() {
        let mut doc = sample();
        doc.applications[0].student_id = "ghost".into();
        assert!(matches!(
            validate(&doc),
            Err(ExchangeError::DanglingRef { target: "student", .. })
        ));

        let mut doc = sample();
        doc.assignments[0].token_no = 3;
        assert!(matches!(validate(&doc), Err(ExchangeError::Invalid(_))));

        let mut doc = sample();
        doc.drives.push(Drive {
            id: "d2".into(),
            ..doc.drives[0].clone()
        });
        doc.applications[0].drive_id = "d2".into();
        assert!(matches!(validate(&doc), Err(ExchangeError::Invalid(_))));

        let mut doc = sample();
        let mut offer = Offer {
            id: "o1".into(),
            drive_id: "d1".into(),
            application_id: "a1".into(),
            student_id: "s1".into(),
            ctc_lpa: Some(12.0),
            status: OfferStatus::Offered,
            created_at: doc.companies[0].created_at,
        };
        doc.offers.push(offer.clone());
        validate(&doc).expect("matching offer is valid");
        offer.student_id = "zzz".into();
        doc.offers[0] = offer.clone();
        assert!(matches!(validate(&doc), Err(ExchangeError::Invalid(_))));
        offer.student_id = "s1".into();
        offer.drive_id = "d9".into();
        doc.offers[0] = offer;
        assert!(matches!(validate(&doc), Err(ExchangeError::Invalid(_))));

        let mut doc = sample();
        doc.students.push(doc.students[0].clone());
        assert!(matches!(
            validate(&doc),
            Err(ExchangeError::DuplicateId { entity: "student", .. })
        ));
    }

    #[test]
    fn replace_all_then_snapshot_returns_same_document() {
        let mut store = MemoryStore::default();
        let doc = sample();
        validate(&doc).expect("sample is valid");
        replace_all(&mut store, &doc).expect("replace");
        assert_eq!(snapshot(&store).expect("snapshot"), doc);
        assert_eq!(doc.counts().assignments, 1);
    }
}
