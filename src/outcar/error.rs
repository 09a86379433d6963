/// Errors that can occur while reading an OUTCAR file
#[derive(Debug, thiserror::Error)]
pub enum OutcarError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line pattern failed to compile
    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    /// A section ends before its last row
    #[error("line {line}: file ends inside the {section} section")]
    UnexpectedEnd { line: usize, section: &'static str },

    /// A field that should be numeric is not
    #[error("line {line}: invalid number {text:?}")]
    InvalidNumber { line: usize, text: String },

    /// A line has fewer fields than required
    #[error("line {line}: expected {expected} fields, found {found}")]
    MissingFields {
        line: usize,
        expected: usize,
        found: usize,
    },
}
