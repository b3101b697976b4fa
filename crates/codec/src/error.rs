use thiserror::Error;

/// Result type for decoding operations
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Errors raised while turning stored bytes back into values.
///
/// A decode failure is always fatal to the read that hit it; no partial value
/// is ever produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer ended before the value was complete
    #[error("Truncated input: needed {needed} bytes at offset {offset}, only {remaining} remaining")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// The bytes were present but do not describe a valid value
    #[error("Malformed {what}: {reason}")]
    Malformed { what: &'static str, reason: String },

    /// A fixed-shape record was followed by unexpected bytes
    #[error("{count} trailing bytes after {what}")]
    TrailingBytes { what: &'static str, count: usize },
}

impl DecodeError {
    /// Create a malformed-input error
    pub fn malformed(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            what,
            reason: reason.into(),
        }
    }
}

/// Errors raised while encoding a value that cannot be represented.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// A count or delta does not fit its fixed-width slot
    #[error("{what} out of range: {value} (max {max})")]
    Overflow {
        what: &'static str,
        value: i64,
        max: i64,
    },

    /// The value breaks an invariant the encoding relies on
    #[error("Invalid {what}: {reason}")]
    Invalid { what: &'static str, reason: String },
}

impl EncodeError {
    pub fn invalid(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            what,
            reason: reason.into(),
        }
    }
}

/// Violations of the structural invariants of model values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    #[error("Paragraph has no sentence breaks")]
    EmptyParagraph,

    #[error("Sentence breaks must be strictly increasing (index {index})")]
    BreaksNotIncreasing { index: usize },

    #[error("Section children must be ordered by start offset (child {index})")]
    ChildrenOutOfOrder { index: usize },

    #[error("Sentence indices must be strictly increasing (index {index})")]
    SentencesNotIncreasing { index: usize },
}
