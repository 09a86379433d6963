/// Errors that can occur while reading an EIGENVAL file
#[derive(Debug, thiserror::Error)]
pub enum EigenvalError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file ends before a required header line
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

    /// Only one or two spin channels are written by VASP
    #[error("unsupported number of spin channels {0}")]
    UnsupportedSpin(usize),

    /// The number of k-point blocks differs from the header
    #[error("header announces {expected} k-points, found {found} blocks")]
    KpointCountMismatch { expected: usize, found: usize },

    /// A k-point block has the wrong number of band rows
    #[error("k-point {kpoint}: expected {expected} bands, found {found}")]
    BandCountMismatch {
        kpoint: usize,
        expected: usize,
        found: usize,
    },

    /// A band row names a band outside the header range
    #[error("line {line}: band index {index} out of range")]
    BandOutOfRange { line: usize, index: usize },
}
