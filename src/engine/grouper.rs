use chrono::{DateTime, Utc};
use serde::Serialize;

use super::segment::Segment;

/// Default maximum characters per displayed chunk.
pub const MAX_CHUNK_CHARS: usize = 512;

/// Consecutive same-speaker segments combined for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeakerGroup {
    pub speaker: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub text: String,
    pub segment_count: usize,
    /// Whether the underlying segments may still be revised.
    pub mutable: bool,
    pub highlighted: bool,
}

impl SpeakerGroup {
    pub fn formatted_timestamp(&self) -> String {
        self.start_time.format("%H:%M:%S").to_string()
    }

    /// One display line. Speaker labels can be suppressed; the timestamp is
    /// always kept.
    pub fn display_line(&self, show_speaker: bool) -> String {
        let timestamp = self.formatted_timestamp();
        match (&self.speaker, show_speaker) {
            (Some(speaker), true) => format!("[{}] {}: {}", timestamp, speaker, self.text),
            _ => format!("[{}]: {}", timestamp, self.text),
        }
    }
}

/// Trim and collapse interior whitespace runs to single spaces.
pub fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Group a time-ordered segment sequence by consecutive speaker.
///
/// Segments whose cleaned text is empty are dropped. Group text is the
/// space-joined concatenation of member texts; the end time extends as
/// members are absorbed.
pub fn group_segments<'a>(
    segments: impl IntoIterator<Item = &'a Segment>,
    mutable: bool,
) -> Vec<SpeakerGroup> {
    let mut groups: Vec<SpeakerGroup> = Vec::new();

    for segment in segments {
        let text = clean_text(&segment.text);
        if text.is_empty() {
            continue;
        }
        let end_time = segment
            .absolute_end_time
            .unwrap_or(segment.absolute_start_time);

        match groups.last_mut() {
            Some(group) if group.speaker == segment.speaker => {
                group.text.push(' ');
                group.text.push_str(&text);
                if end_time > group.end_time {
                    group.end_time = end_time;
                }
                group.segment_count += 1;
            }
            _ => groups.push(SpeakerGroup {
                speaker: segment.speaker.clone(),
                start_time: segment.absolute_start_time,
                end_time,
                text,
                segment_count: 1,
                mutable,
                highlighted: false,
            }),
        }
    }

    groups
}

/// Split combined text into sentences: boundaries fall after `.`, `!` or `?`
/// followed by whitespace.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(next_idx, next)) = chars.peek() {
                if next.is_whitespace() {
                    let sentence = text[start..next_idx].trim();
                    if !sentence.is_empty() {
                        sentences.push(sentence);
                    }
                    start = next_idx;
                }
            }
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Split a long group at sentence boundaries so no chunk exceeds `max_chars`,
/// except when a single sentence alone does — that sentence is emitted whole.
/// Chunks inherit the parent's speaker and timestamps.
pub fn chunk_group(group: &SpeakerGroup, max_chars: usize) -> Vec<SpeakerGroup> {
    if group.text.chars().count() <= max_chars {
        return vec![group.clone()];
    }

    let mut texts: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(&group.text) {
        let sentence_len = sentence.chars().count();
        if !current.is_empty() && current_len + 1 + sentence_len > max_chars {
            texts.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current.is_empty() {
            current.push_str(sentence);
            current_len = sentence_len;
        } else {
            current.push(' ');
            current.push_str(sentence);
            current_len += 1 + sentence_len;
        }
    }
    if !current.is_empty() {
        texts.push(current);
    }

    texts
        .into_iter()
        .map(|text| SpeakerGroup {
            text,
            ..group.clone()
        })
        .collect()
}
