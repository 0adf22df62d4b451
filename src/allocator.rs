use crate::model::{Application, ApplicationStatus, Assignment, Slot};
use std::collections::HashSet;

/// Slots of one drive in allocation order: earliest start first, room name as
/// tie-break.
pub fn ordered_slots<'a>(slots: &'a [Slot], drive_id: &str) -> Vec<&'a Slot> {
    let mut out: Vec<&Slot> = slots.iter().filter(|s| s.drive_id == drive_id).collect();
    out.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a.room.cmp(&b.room))
    });
    out
}

/// Shortlisted applications of one drive, oldest `updated_at` first.
///
/// The sort is stable: records sharing a timestamp (one shortlist run stamps
/// them all at once) keep their stored order.
pub fn ordered_shortlist<'a>(
    applications: &'a [Application],
    drive_id: &str,
) -> Vec<&'a Application> {
    let mut out: Vec<&Application> = applications
        .iter()
        .filter(|a| a.drive_id == drive_id && a.status == ApplicationStatus::Shortlisted)
        .collect();
    out.sort_by_key(|a| a.updated_at);
    out
}

/// Greedy first-come allocation.
///
/// Fills tokens `1..=capacity` of each slot in order before moving to the next
/// slot. Candidates beyond total capacity get nothing.
pub fn assign<F>(slots: &[&Slot], shortlisted: &[&Application], mut new_id: F) -> Vec<Assignment>
where
    F: FnMut() -> String,
{
    let mut out = Vec::new();
    let mut next = shortlisted.iter();

    'slots: for slot in slots {
        for token_no in 1..=slot.capacity {
            let Some(app) = next.next() else {
                break 'slots;
            };
            out.push(Assignment {
                id: new_id(),
                slot_id: slot.id.clone(),
                application_id: app.id.clone(),
                token_no,
            });
        }
    }

    out
}

/// Drops every assignment that points at one of `drive_slot_ids` and appends
/// `fresh`. Assignments of other drives keep their position.
pub fn replace_drive_assignments(
    existing: Vec<Assignment>,
    drive_slot_ids: &HashSet<&str>,
    fresh: Vec<Assignment>,
) -> Vec<Assignment> {
    let mut out: Vec<Assignment> = existing
        .into_iter()
        .filter(|a| !drive_slot_ids.contains(a.slot_id.as_str()))
        .collect();
    out.extend(fresh);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::HashMap;

    fn slot(id: &str, drive: &str, start: &str, room: &str, capacity: u32) -> Slot {
        Slot {
            id: id.to_string(),
            drive_id: drive.to_string(),
            start_time: start.to_string(),
            room: room.to_string(),
            capacity,
        }
    }

    fn shortlisted(id: &str, drive: &str, minutes: i64) -> Application {
        Application {
            id: id.to_string(),
            drive_id: drive.to_string(),
            student_id: format!("stu-{}", id),
            status: ApplicationStatus::Shortlisted,
            reason: "Eligible as per criteria".to_string(),
            updated_at: Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    fn counter() -> impl FnMut() -> String {
        let mut n = 0;
        move || {
            n += 1;
            format!("as-{}", n)
        }
    }

    fn key(a: &Assignment) -> (String, String, u32) {
        (a.slot_id.clone(), a.application_id.clone(), a.token_no)
    }

    #[test]
    fn slots_ordered_by_start_then_room() {
        let slots = vec![
            slot("s3", "d1", "2026-04-02T10:00", "B-101", 2),
            slot("s1", "d1", "2026-04-02T09:00", "B-102", 2),
            slot("s2", "d1", "2026-04-02T09:00", "A-201", 2),
            slot("sx", "d2", "2026-04-01T08:00", "A-100", 2),
        ];
        let ids: Vec<&str> = ordered_slots(&slots, "d1").iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s2", "s1", "s3"]);
    }

    #[test]
    fn shortlist_is_fifo_and_filtered() {
        let late = shortlisted("late", "d1", 30);
        let early = shortlisted("early", "d1", 5);
        let mut ineligible = shortlisted("no", "d1", 0);
        ineligible.status = ApplicationStatus::Ineligible;
        let other = shortlisted("other", "d2", 0);
        let apps = vec![late, ineligible, early, other];

        let ids: Vec<&str> = ordered_shortlist(&apps, "d1").iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[test]
    fn single_slot_takes_only_first_candidate() {
        let slots = vec![slot("s1", "d1", "2026-04-02T09:00", "A", 1)];
        let a = shortlisted("A", "d1", 0);
        let b = shortlisted("B", "d1", 1);
        let out = assign(&[&slots[0]], &[&a, &b], counter());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].application_id, "A");
        assert_eq!(out[0].token_no, 1);
        assert_eq!(out[0].slot_id, "s1");
    }

    #[test]
    fn fills_slots_in_order_with_contiguous_tokens() {
        let slots = vec![
            slot("s1", "d1", "2026-04-02T09:00", "A", 2),
            slot("s2", "d1", "2026-04-02T10:00", "A", 3),
        ];
        let apps: Vec<Application> = (0..4).map(|i| shortlisted(&format!("a{}", i), "d1", i)).collect();
        let refs: Vec<&Application> = apps.iter().collect();
        let slot_refs: Vec<&Slot> = slots.iter().collect();

        let out = assign(&slot_refs, &refs, counter());
        let keys: Vec<(String, String, u32)> = out.iter().map(key).collect();
        assert_eq!(
            keys,
            vec![
                ("s1".to_string(), "a0".to_string(), 1),
                ("s1".to_string(), "a1".to_string(), 2),
                ("s2".to_string(), "a2".to_string(), 1),
                ("s2".to_string(), "a3".to_string(), 2),
            ]
        );
    }

    #[test]
    fn never_exceeds_capacity_and_reports_shortfall() {
        let slots = vec![
            slot("s1", "d1", "2026-04-02T09:00", "A", 3),
            slot("s2", "d1", "2026-04-02T10:00", "A", 1),
            slot("s3", "d1", "2026-04-02T11:00", "A", 4),
        ];
        let apps: Vec<Application> = (0..10).map(|i| shortlisted(&format!("a{}", i), "d1", i)).collect();
        let refs: Vec<&Application> = apps.iter().collect();
        let slot_refs: Vec<&Slot> = slots.iter().collect();

        let out = assign(&slot_refs, &refs, counter());
        assert_eq!(out.len(), 8);

        let mut per_slot: HashMap<&str, Vec<u32>> = HashMap::new();
        for a in &out {
            per_slot.entry(a.slot_id.as_str()).or_default().push(a.token_no);
        }
        for s in &slots {
            let tokens = per_slot.get(s.id.as_str()).cloned().unwrap_or_default();
            assert!(tokens.len() as u32 <= s.capacity);
            let expected: Vec<u32> = (1..=tokens.len() as u32).collect();
            assert_eq!(tokens, expected);
        }
        // The tail of the FIFO list is what goes unassigned.
        assert!(out.iter().all(|a| a.application_id != "a8" && a.application_id != "a9"));
    }

    #[test]
    fn earlier_candidates_never_placed_after_later_ones() {
        let slots = vec![
            slot("s1", "d1", "2026-04-02T09:00", "A", 2),
            slot("s2", "d1", "2026-04-02T09:30", "A", 2),
        ];
        let apps = vec![
            shortlisted("third", "d1", 20),
            shortlisted("first", "d1", 0),
            shortlisted("second", "d1", 10),
        ];
        let ordered = ordered_shortlist(&apps, "d1");
        let slot_order = ordered_slots(&slots, "d1");
        let out = assign(&slot_order, &ordered, counter());

        let position = |id: &str| out.iter().position(|a| a.application_id == id).expect("assigned");
        assert!(position("first") < position("second"));
        assert!(position("second") < position("third"));
    }

    #[test]
    fn empty_inputs_yield_no_assignments() {
        let a = shortlisted("a", "d1", 0);
        assert!(assign(&[], &[&a], counter()).is_empty());
        let s = slot("s1", "d1", "2026-04-02T09:00", "A", 5);
        assert!(assign(&[&s], &[], counter()).is_empty());
    }

    #[test]
    fn rerun_replaces_only_the_drive_slots() {
        let slots = vec![slot("s1", "d1", "2026-04-02T09:00", "A", 2)];
        let apps = vec![shortlisted("a", "d1", 0), shortlisted("b", "d1", 1)];
        let ordered = ordered_shortlist(&apps, "d1");
        let slot_order = ordered_slots(&slots, "d1");
        let drive_slot_ids: HashSet<&str> = slot_order.iter().map(|s| s.id.as_str()).collect();

        let foreign = Assignment {
            id: "keep".to_string(),
            slot_id: "other-drive-slot".to_string(),
            application_id: "z".to_string(),
            token_no: 1,
        };

        let first = assign(&slot_order, &ordered, counter());
        let stored = replace_drive_assignments(vec![foreign.clone()], &drive_slot_ids, first.clone());
        assert_eq!(stored.len(), 3);

        let second = assign(&slot_order, &ordered, counter());
        let restored = replace_drive_assignments(stored, &drive_slot_ids, second.clone());
        assert_eq!(restored.len(), 3);
        assert_eq!(restored[0], foreign);

        let first_keys: Vec<_> = first.iter().map(key).collect();
        let second_keys: Vec<_> = restored[1..].iter().map(key).collect();
        assert_eq!(first_keys, second_keys);
    }
}
