//! Priority ordering of an event's listener sequence.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::registration::EventRegistration;

/// Orders two registrations by priority (lower first).
///
/// Equal priorities compare as `Equal`; combined with a stable sort this
/// keeps earlier registrations ahead of later ones.
pub fn compare_priority(a: &EventRegistration, b: &EventRegistration) -> Ordering {
    a.priority.cmp(&b.priority)
}

/// Sorts one event's sequence in place. `sort_by` is stable.
pub fn sort_by_priority(entries: &mut [Arc<EventRegistration>]) {
    entries.sort_by(|a, b| compare_priority(a, b));
}
