// Unit tests for sentence-boundary text buffering
//
// These tests verify the emission triggers (terminator, size cap, flush)
// and that no text is ever lost or duplicated.

use monsieur_voice::TranscriptionBuffer;

#[test]
fn test_terminator_with_buffered_content_emits_combined_unit() {
    let mut buffer = TranscriptionBuffer::new();

    assert_eq!(buffer.ingest("Hello "), None);
    assert_eq!(buffer.ingest("world."), Some("Hello world.".to_string()));
    assert!(buffer.is_empty());
}

#[test]
fn test_three_fragments_emit_exactly_one_unit() {
    let mut buffer = TranscriptionBuffer::new();

    assert_eq!(buffer.ingest("Hi"), None);
    assert_eq!(buffer.ingest(" there"), None);
    assert_eq!(buffer.ingest("!"), Some("Hi there!".to_string()));
    assert_eq!(buffer.flush(), None);
}

#[test]
fn test_terminated_fragment_on_empty_buffer_stays_pending() {
    // One-fragment lookahead: a complete sentence arriving alone is held so
    // the next fragment can still join it
    let mut buffer = TranscriptionBuffer::new();

    assert_eq!(buffer.ingest("Hello."), None);
    assert_eq!(buffer.pending_len(), "Hello.".len());
    assert_eq!(buffer.flush(), Some("Hello.".to_string()));
}

#[test]
fn test_trailing_whitespace_does_not_hide_terminator() {
    let mut buffer = TranscriptionBuffer::new();

    assert_eq!(buffer.ingest("First part"), None);
    assert_eq!(
        buffer.ingest(" done.  "),
        Some("First part done.  ".to_string())
    );
}

#[test]
fn test_all_terminator_characters_trigger_emission() {
    for terminator in [".", "!", "?", ":", ";"] {
        let mut buffer = TranscriptionBuffer::new();
        buffer.ingest("lead ");
        let unit = buffer.ingest(terminator);
        assert_eq!(
            unit,
            Some(format!("lead {terminator}")),
            "terminator {terminator:?} should emit"
        );
    }
}

#[test]
fn test_size_cap_emits_before_flush_on_unpunctuated_stream() {
    let mut buffer = TranscriptionBuffer::new();

    let fragment = "abcdefghij"; // 10 chars, no terminator
    let mut emitted = Vec::new();
    for _ in 0..30 {
        if let Some(unit) = buffer.ingest(fragment) {
            emitted.push(unit);
        }
    }

    assert!(
        !emitted.is_empty(),
        "size cap should fire on a 300-char unpunctuated stream"
    );
    assert!(
        emitted[0].len() > 200,
        "the first forced unit carries the over-cap buffer"
    );
}

#[test]
fn test_flush_on_empty_buffer_is_noop() {
    let mut buffer = TranscriptionBuffer::new();
    assert_eq!(buffer.flush(), None);
    assert_eq!(buffer.flush(), None);
}

#[test]
fn test_flush_emits_full_content_and_clears() {
    let mut buffer = TranscriptionBuffer::new();
    buffer.ingest("some pending ");
    buffer.ingest("text");

    assert_eq!(buffer.flush(), Some("some pending text".to_string()));
    assert!(buffer.is_empty());
    assert_eq!(buffer.flush(), None);
}

#[test]
fn test_no_text_lost_or_duplicated_across_emissions() {
    // The concatenation of all emitted units plus the final flush must equal
    // the concatenation of all ingested fragments
    let fragments = [
        "The engineering team ",
        "has identified the root cause.",
        " A fix is in testing",
        " and should ship tomorrow!",
        " Unpunctuated tail with ",
        "a very long stretch of text that keeps going without any sentence ",
        "boundary at all so the size cap has to step in at some point to keep ",
        "latency bounded while nothing terminates the sentence ",
        "still going",
    ];

    let mut buffer = TranscriptionBuffer::new();
    let mut output = String::new();
    for fragment in fragments {
        if let Some(unit) = buffer.ingest(fragment) {
            output.push_str(&unit);
        }
    }
    if let Some(unit) = buffer.flush() {
        output.push_str(&unit);
    }

    assert_eq!(output, fragments.concat());
}

#[test]
fn test_size_cap_counts_characters_not_bytes() {
    let mut buffer = TranscriptionBuffer::with_max_len(10);

    // 8 characters but 16 UTF-8 bytes: must not trip a 10-character cap
    assert_eq!(buffer.ingest(&"é".repeat(8)), None);
    // 11 characters total now exceeds the cap
    assert_eq!(buffer.ingest(&"é".repeat(3)), Some("é".repeat(11)));
    assert!(buffer.is_empty());
}

#[test]
fn test_custom_size_cap() {
    let mut buffer = TranscriptionBuffer::with_max_len(10);

    assert_eq!(buffer.ingest("12345"), None);
    // 11 chars > 10: forced out
    assert_eq!(buffer.ingest("678901"), Some("12345678901".to_string()));
    assert!(buffer.is_empty());
}
