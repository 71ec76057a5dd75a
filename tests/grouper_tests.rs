use chrono::{DateTime, Duration, TimeZone, Utc};
use dailies_scribe::engine::{chunk_group, clean_text, group_segments};
use dailies_scribe::Segment;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 14, 30, 0).unwrap()
}

fn seg(offset_secs: i64, speaker: Option<&str>, text: &str) -> Segment {
    Segment {
        id: None,
        text: text.to_string(),
        absolute_start_time: base() + Duration::seconds(offset_secs),
        absolute_end_time: Some(base() + Duration::seconds(offset_secs + 3)),
        updated_at: None,
        speaker: speaker.map(|s| s.to_string()),
        language: None,
    }
}

#[test]
fn test_clean_text_collapses_whitespace() {
    assert_eq!(clean_text("  hello   world \t again\n"), "hello world again");
    assert_eq!(clean_text("   "), "");
    assert_eq!(clean_text("plain"), "plain");
}

#[test]
fn test_consecutive_same_speaker_merge() {
    let segments = vec![
        seg(0, Some("Lead"), "The highlights are"),
        seg(5, Some("Lead"), "too hot on the left."),
    ];
    let groups = group_segments(&segments, false);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].text, "The highlights are too hot on the left.");
    assert_eq!(groups[0].segment_count, 2);
    assert_eq!(groups[0].start_time, base());
    assert_eq!(groups[0].end_time, base() + Duration::seconds(8));
}

#[test]
fn test_speaker_change_starts_new_group() {
    let segments = vec![
        seg(0, Some("Lead"), "Soften the shadows."),
        seg(5, Some("Artist"), "Will do."),
        seg(10, Some("Lead"), "Thanks."),
    ];
    let groups = group_segments(&segments, false);

    assert_eq!(groups.len(), 3);
    assert_eq!(groups[0].speaker.as_deref(), Some("Lead"));
    assert_eq!(groups[1].speaker.as_deref(), Some("Artist"));
    assert_eq!(groups[2].speaker.as_deref(), Some("Lead"));
}

#[test]
fn test_empty_segments_are_dropped() {
    let segments = vec![
        seg(0, Some("Lead"), "First part"),
        seg(5, Some("Lead"), "   \t "),
        seg(10, Some("Lead"), "second part"),
    ];
    let groups = group_segments(&segments, false);

    // The whitespace-only segment neither appears nor breaks the group.
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].text, "First part second part");
    assert_eq!(groups[0].segment_count, 2);
}

#[test]
fn test_group_text_is_cleaned() {
    let segments = vec![seg(0, Some("Lead"), "  spaced   out  ")];
    let groups = group_segments(&segments, false);
    assert_eq!(groups[0].text, "spaced out");
}

#[test]
fn test_short_group_is_single_chunk() {
    let groups = group_segments(&[seg(0, Some("Lead"), "Short note.")], false);
    let chunks = chunk_group(&groups[0], 512);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "Short note.");
}

#[test]
fn test_chunking_splits_at_sentence_boundaries() {
    let text = "One sentence here. Another sentence there! A third one? And a fourth.";
    let groups = group_segments(&[seg(0, Some("Lead"), text)], false);
    let chunks = chunk_group(&groups[0], 30);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        // No chunk exceeds the limit, and none ends mid-sentence.
        assert!(chunk.text.chars().count() <= 30);
        assert!(chunk.text.ends_with(['.', '!', '?']));
    }
}

#[test]
fn test_chunk_round_trip_reproduces_text() {
    let text = "One sentence here. Another sentence there! A third one? And a fourth.";
    let groups = group_segments(&[seg(0, Some("Lead"), text)], false);
    let chunks = chunk_group(&groups[0], 30);

    let joined = chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    assert_eq!(joined, text);
}

#[test]
fn test_oversized_sentence_is_emitted_whole() {
    let long_sentence = format!("{} end.", "word ".repeat(30).trim());
    let text = format!("Short lead-in. {} Short tail.", long_sentence);
    let groups = group_segments(&[seg(0, Some("Lead"), &text)], false);
    let chunks = chunk_group(&groups[0], 40);

    // The over-long sentence is its own chunk, unsplit.
    assert!(chunks.iter().any(|c| c.text == long_sentence));
}

#[test]
fn test_chunks_inherit_speaker_and_timestamp() {
    let text = "First sentence goes here. Second sentence goes here. Third one too.";
    let groups = group_segments(&[seg(0, Some("Lead"), text)], false);
    let chunks = chunk_group(&groups[0], 30);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert_eq!(chunk.speaker.as_deref(), Some("Lead"));
        assert_eq!(chunk.start_time, groups[0].start_time);
    }
}

#[test]
fn test_display_line_with_speaker() {
    let groups = group_segments(&[seg(5, Some("Lead"), "Looks good.")], false);
    assert_eq!(groups[0].display_line(true), "[14:30:05] Lead: Looks good.");
}

#[test]
fn test_display_line_suppressed_speaker_keeps_timestamp() {
    let groups = group_segments(&[seg(5, Some("Lead"), "Looks good.")], false);
    assert_eq!(groups[0].display_line(false), "[14:30:05]: Looks good.");
}

#[test]
fn test_display_line_without_speaker_attribution() {
    let groups = group_segments(&[seg(5, None, "Looks good.")], false);
    assert_eq!(groups[0].display_line(true), "[14:30:05]: Looks good.");
}

#[test]
fn test_formatted_timestamp() {
    let groups = group_segments(&[seg(125, Some("Lead"), "hi")], false);
    assert_eq!(groups[0].formatted_timestamp(), "14:32:05");
}
