/// Errors that can occur while reading or writing a KPOINTS file
#[derive(Debug, thiserror::Error)]
pub enum KpointsError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file ends before a required line
    #[error("unexpected end of file, expected {0}")]
    UnexpectedEnd(&'static str),

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

    /// The generation scheme on the third line is not recognised
    #[error("unsupported generation scheme {0:?}")]
    UnsupportedScheme(String),

    /// Line mode needs the points in start/end pairs
    #[error("line mode needs pairs of points, found {0}")]
    UnpairedLinePoints(usize),
}
