// src/services/scheduling.rs
//
// Read-side invariant checkers. These are pure functions over a local
// store snapshot, evaluated synchronously before a write is issued. They
// hold no lock, so two near-simultaneous writers can both pass; that race
// is accepted.

use crate::types::{CollectionSnapshot, LessonSlot, SlotKind};

/// Whether scheduling `candidate` would double-book its teacher: an
/// existing slot on the same day with the identical start time and the
/// same teacher, but a different class. Break slots never conflict, and a
/// slot never conflicts with its own stored version (that is an update).
pub fn has_conflict<'a, I>(existing: I, candidate: &LessonSlot) -> bool
where
    I: IntoIterator<Item = &'a LessonSlot>,
{
    if candidate.kind == SlotKind::Break {
        return false;
    }
    existing.into_iter().any(|slot| {
        slot.kind != SlotKind::Break
            && slot.id != candidate.id
            && slot.day == candidate.day
            && slot.start_time == candidate.start_time
            && slot.teacher_id == candidate.teacher_id
            && slot.class_id != candidate.class_id
    })
}

/// Deserializes the timetable snapshot into typed slots, carrying the
/// document id into each record. Records that do not parse as slots are
/// skipped rather than failing the check.
pub fn snapshot_slots(snapshot: &CollectionSnapshot) -> Vec<LessonSlot> {
    snapshot
        .iter()
        .filter_map(|(id, fields)| {
            let mut slot: LessonSlot =
                serde_json::from_value(serde_json::Value::Object(fields.clone())).ok()?;
            slot.id = Some(id.clone());
            Some(slot)
        })
        .collect()
}
