/// A payload from the store that could not be turned into a typed value.
#[derive(Debug)]
pub enum ParseError {
    /// The payload was keyed by an empty string.
    EmptyKey,
    /// The payload did not match the expected shape.
    Malformed {
        /// The key of the offending payload.
        key: String,
        /// Why deserialization failed.
        source: serde_json::Error,
    },
    /// A required field was absent.
    MissingField {
        /// The key of the offending payload.
        key: String,
        /// The name of the absent field.
        field: &'static str,
    },
    /// A field held a value outside of its valid range.
    OutOfRange {
        /// The key of the offending payload.
        key: String,
        /// The name of the field.
        field: &'static str,
        /// The rejected value.
        value: i64,
    },
}
impl ParseError {
    /// The key of the offending payload, or an empty string if it had none.
    pub fn key(&self) -> &str {
        match self {
            ParseError::EmptyKey => "",
            ParseError::Malformed { key, .. }
            | ParseError::MissingField { key, .. }
            | ParseError::OutOfRange { key, .. } => key,
        }
    }
}
impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::EmptyKey => write!(f, "Payload has an empty key"),
            ParseError::Malformed { key, source } => {
                write!(f, "Malformed payload for `{key}`: {source}")
            }
            ParseError::MissingField { key, field } => {
                write!(f, "Payload for `{key}` is missing `{field}`")
            }
            ParseError::OutOfRange { key, field, value } => {
                write!(f, "Payload for `{key}` has out-of-range `{field}`: {value}")
            }
        }
    }
}
impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Malformed { source, .. } => Some(source),
            _ => None,
        }
    }
}
