/// Sentence-boundary buffering for incrementally arriving text
///
/// Text from an LLM arrives token-by-token; submitting every fragment to the
/// synthesis provider wastes a round trip per fragment, while buffering too
/// long delays the first audio. The buffer emits a unit when a fragment ends
/// at sentence punctuation, or when the pending text grows past a soft size
/// cap on long unpunctuated streams.
pub struct TranscriptionBuffer {
    pending: String,
    max_len: usize,
}

/// Characters that terminate a synthesis unit
const SENTENCE_TERMINATORS: [char; 5] = ['.', '!', '?', ':', ';'];

/// Soft cap on buffered characters before a unit is forced out
const DEFAULT_MAX_LEN: usize = 200;

impl TranscriptionBuffer {
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LEN)
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            pending: String::new(),
            max_len,
        }
    }

    /// Ingest one fragment, returning a synthesis unit if one is ready.
    ///
    /// The terminator check happens on the current fragment while the unit
    /// emitted is the existing buffer plus that fragment: a terminator
    /// arriving with buffered content forces the combined unit out. A
    /// terminated fragment with nothing buffered stays pending (one-fragment
    /// lookahead), so a following fragment can still join the same unit.
    pub fn ingest(&mut self, fragment: &str) -> Option<String> {
        let ends_sentence = fragment
            .trim_end()
            .ends_with(|c| SENTENCE_TERMINATORS.contains(&c));

        if ends_sentence && !self.pending.is_empty() {
            let mut unit = std::mem::take(&mut self.pending);
            unit.push_str(fragment);
            return Some(unit);
        }

        self.pending.push_str(fragment);

        // The cap counts characters, not bytes, so multibyte text is not
        // forced out early
        if self.pending.chars().count() > self.max_len {
            return Some(std::mem::take(&mut self.pending));
        }

        None
    }

    /// Emit whatever is pending, if anything
    pub fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl Default for TranscriptionBuffer {
    fn default() -> Self {
        Self::new()
    }
}
