use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::transport::WireSegment;

/// A reconciled transcript segment.
///
/// Invariant: a segment without an absolute start time never enters the
/// canonical set; `from_wire` enforces that at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: Option<String>,
    pub text: String,
    pub absolute_start_time: DateTime<Utc>,
    pub absolute_end_time: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub speaker: Option<String>,
    pub language: Option<String>,
}

impl Segment {
    /// Convert a wire segment, silently filtering anything without a start
    /// time or text. Those are not errors, just unusable.
    pub fn from_wire(wire: WireSegment) -> Option<Self> {
        let absolute_start_time = wire.absolute_start_time?;
        let text = wire.text?;
        Some(Self {
            id: wire.id,
            text,
            absolute_start_time,
            absolute_end_time: wire.absolute_end_time,
            updated_at: wire.updated_at,
            speaker: wire.speaker,
            language: wire.language,
        })
    }
}

/// Outcome of a single upsert into the canonical set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// First revision seen for this start time.
    Inserted,
    /// A strictly newer revision replaced the stored one.
    Updated,
    /// Discarded: not newer than what we already hold.
    Stale,
}

/// Canonical, deduplicated segment set for one meeting, keyed by absolute
/// start time. BTreeMap iteration gives the ascending-order invariant.
#[derive(Debug, Default)]
pub struct SegmentStore {
    segments: BTreeMap<DateTime<Utc>, Segment>,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one revision. The rule is identical for mutable and finalized
    /// event classes; finalization affects display only, never precedence.
    pub fn upsert(&mut self, incoming: Segment) -> Upsert {
        match self.segments.entry(incoming.absolute_start_time) {
            Entry::Vacant(slot) => {
                slot.insert(incoming);
                Upsert::Inserted
            }
            Entry::Occupied(mut slot) => {
                if let (Some(stored), Some(new)) = (slot.get().updated_at, incoming.updated_at) {
                    // Exact ties keep the revision seen first.
                    if new <= stored {
                        return Upsert::Stale;
                    }
                }
                slot.insert(incoming);
                Upsert::Updated
            }
        }
    }

    /// Segments in ascending start-time order.
    pub fn ordered(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values()
    }

    pub fn get(&self, key: &DateTime<Utc>) -> Option<&Segment> {
        self.segments.get(key)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Drop everything. Only a full session reset (leaving the meeting) ever
    /// calls this; individual segments are never deleted.
    pub fn clear(&mut self) {
        self.segments.clear();
    }
}
