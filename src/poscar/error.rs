/// Errors that can occur while reading or writing a POSCAR file
#[derive(Debug, thiserror::Error)]
pub enum PoscarError {
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

    /// The species names line is absent (VASP 4 layout)
    #[error("species names line is missing, only the VASP 5 layout is supported")]
    MissingSpecies,

    /// Species names and counts differ in length
    #[error("{species} species names but {counts} counts")]
    CountMismatch { species: usize, counts: usize },

    /// A species name is not an element symbol
    #[error("unknown element {0:?}")]
    UnknownElement(String),

    /// The positions are followed by neither velocities nor
    /// predictor-corrector coordinates
    #[error("line {line}: expected velocities or predictor-corrector coordinates")]
    UnexpectedBlock { line: usize },

    /// The lattice vectors are linearly dependent
    #[error("lattice vectors are linearly dependent")]
    SingularLattice,
}
