use chrono::{DateTime, Duration, TimeZone, Utc};
use dailies_scribe::{FocusState, Segment, SegmentStore, TranscriptRouter};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap()
}

fn seg(offset_secs: i64, text: &str) -> Segment {
    Segment {
        id: None,
        text: text.to_string(),
        absolute_start_time: base() + Duration::seconds(offset_secs),
        absolute_end_time: None,
        updated_at: None,
        speaker: Some("Lead".to_string()),
        language: None,
    }
}

fn router_with_rows(n: usize) -> TranscriptRouter {
    let mut router = TranscriptRouter::new(true, 512);
    for i in 0..n {
        router.add_context(format!("shot_{:03}", i));
    }
    router
}

/// Upsert segments and route their keys in one step.
fn ingest(router: &mut TranscriptRouter, store: &mut SegmentStore, segments: Vec<Segment>) {
    let keys: Vec<DateTime<Utc>> = segments.iter().map(|s| s.absolute_start_time).collect();
    for segment in segments {
        store.upsert(segment);
    }
    router.record_new_keys(&keys);
    router.render_active(store);
}

#[test]
fn test_pinned_overrides_focused() {
    let mut router = router_with_rows(3);
    let mut store = SegmentStore::new();

    router.pin(2);
    router.focus(0);
    assert_eq!(router.active_target(), Some(2));

    ingest(&mut router, &mut store, vec![seg(0, "routed text.")]);

    assert!(router.context(2).unwrap().transcript.contains("routed text."));
    assert!(router.context(0).unwrap().transcript.is_empty());
    assert!(router.context(1).unwrap().transcript.is_empty());
}

#[test]
fn test_focused_row_receives_text() {
    let mut router = router_with_rows(2);
    let mut store = SegmentStore::new();

    router.focus(1);
    ingest(&mut router, &mut store, vec![seg(0, "note for row one.")]);

    assert!(router.context(1).unwrap().transcript.contains("note for row one."));
    assert!(router.context(0).unwrap().transcript.is_empty());
}

#[test]
fn test_unfocused_falls_back_to_first_row() {
    let router = router_with_rows(2);
    assert_eq!(router.active_target(), Some(0));
}

#[test]
fn test_no_rows_drops_updates() {
    let mut router = TranscriptRouter::new(true, 512);
    let mut store = SegmentStore::new();
    assert_eq!(router.active_target(), None);

    // Must not panic; keys simply go unassigned.
    ingest(&mut router, &mut store, vec![seg(0, "nowhere to go")]);
}

#[test]
fn test_unpin_returns_to_last_focused() {
    let mut router = router_with_rows(3);
    router.focus(1);
    router.pin(2);
    router.focus(0); // remembered, but routing stays pinned
    assert_eq!(router.active_target(), Some(2));

    router.unpin();
    assert_eq!(router.focus_state(), FocusState::Focused(0));
}

#[test]
fn test_unpin_after_direct_pin_focuses_that_row() {
    let mut router = router_with_rows(2);
    router.pin(1);
    router.unpin();
    // Pinning row 1 made it the last-touched row.
    assert_eq!(router.focus_state(), FocusState::Focused(1));
}

#[test]
fn test_smart_toggle_pins_when_unpinned() {
    let mut router = router_with_rows(3);
    router.smart_toggle(1);
    assert_eq!(router.focus_state(), FocusState::Pinned(1));
}

#[test]
fn test_smart_toggle_on_pinned_row_unpins() {
    let mut router = router_with_rows(3);
    router.pin(1);
    router.smart_toggle(1);
    assert_eq!(router.focus_state(), FocusState::Focused(1));
}

#[test]
fn test_smart_toggle_on_other_row_moves_focus_without_pinning() {
    let mut router = router_with_rows(3);
    router.pin(0);
    router.smart_toggle(2);
    assert_eq!(router.focus_state(), FocusState::Focused(2));
    assert_eq!(router.active_target(), Some(2));
}

#[test]
fn test_smart_toggle_off_a_pin_restores_delivery() {
    let mut router = router_with_rows(3);
    router.pin(0);
    router.force_stop();
    assert!(!router.is_receiving());

    // Moving focus off the pin turns delivery back on, the same as focus().
    router.smart_toggle(1);
    assert_eq!(router.focus_state(), FocusState::Focused(1));
    assert!(router.is_receiving());
}

#[test]
fn test_blur_pauses_without_changing_target() {
    let mut router = router_with_rows(2);
    router.focus(1);
    router.blur();

    assert!(!router.is_receiving());
    assert_eq!(router.active_target(), Some(1));
}

#[test]
fn test_blur_is_ignored_while_pinned() {
    let mut router = router_with_rows(2);
    router.pin(0);
    router.blur();
    assert!(router.is_receiving());
}

#[test]
fn test_pause_resume_preserves_transcript() {
    let mut router = router_with_rows(1);
    let mut store = SegmentStore::new();

    ingest(
        &mut router,
        &mut store,
        vec![seg(0, "first note."), seg(5, "second note.")],
    );
    let before = router.context(0).unwrap().transcript.clone();
    assert!(!before.is_empty());

    router.pause();
    router.resume();
    router.render_active(&store);

    assert_eq!(router.context(0).unwrap().transcript, before);
}

#[test]
fn test_keys_arriving_while_paused_are_not_assigned() {
    let mut router = router_with_rows(1);
    let mut store = SegmentStore::new();

    ingest(&mut router, &mut store, vec![seg(0, "kept.")]);
    router.pause();
    ingest(&mut router, &mut store, vec![seg(10, "missed.")]);

    router.resume();
    router.render_active(&store);
    let transcript = &router.context(0).unwrap().transcript;
    assert!(transcript.contains("kept."));
    assert!(!transcript.contains("missed."));
}

#[test]
fn test_keys_are_never_reassigned() {
    let mut router = router_with_rows(2);
    let mut store = SegmentStore::new();

    // Row 0 is active when the segment first arrives.
    ingest(&mut router, &mut store, vec![seg(0, "belongs to row zero.")]);

    // The same key reappears unchanged after focus moves to row 1.
    router.focus(1);
    ingest(&mut router, &mut store, vec![seg(0, "belongs to row zero.")]);

    assert!(router
        .context(0)
        .unwrap()
        .transcript
        .contains("belongs to row zero."));
    assert!(router.context(1).unwrap().transcript.is_empty());
}

#[test]
fn test_new_keys_follow_the_active_row() {
    let mut router = router_with_rows(2);
    let mut store = SegmentStore::new();

    ingest(&mut router, &mut store, vec![seg(0, "for row zero.")]);
    router.focus(1);
    ingest(&mut router, &mut store, vec![seg(10, "for row one.")]);

    assert!(router.context(0).unwrap().transcript.contains("for row zero."));
    assert!(router.context(1).unwrap().transcript.contains("for row one."));
    assert!(!router.context(1).unwrap().transcript.contains("for row zero."));
}

#[test]
fn test_reset_clears_assignments_but_keeps_rows() {
    let mut router = router_with_rows(2);
    let mut store = SegmentStore::new();

    ingest(&mut router, &mut store, vec![seg(0, "ephemeral.")]);
    router.reset();

    assert_eq!(router.contexts().len(), 2);
    assert!(router.context(0).unwrap().transcript.is_empty());
}
