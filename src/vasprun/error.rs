use std::fmt;

/// Quantity another extraction depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prerequisite {
    /// Atomic species (gives the atom count)
    Species,
    /// ISPIN run parameter
    Ispin,
    /// NBANDS run parameter
    Nbands,
    /// Regular k-point list
    Kpoints,
}

impl fmt::Display for Prerequisite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Prerequisite::Species => "the species",
            Prerequisite::Ispin => "ISPIN",
            Prerequisite::Nbands => "NBANDS",
            Prerequisite::Kpoints => "the k-points",
        };
        f.write_str(name)
    }
}

/// Failure while converting or shaping one extracted quantity
///
/// These are recorded per quantity, so they are cheap to clone and carry no
/// I/O state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractError {
    /// Number of rows or columns does not match the expected arity
    #[error("count mismatch in {section}: expected {expected}, found {found}")]
    CountMismatch {
        section: &'static str,
        expected: usize,
        found: usize,
    },

    /// A numeric field holds the overflow sentinel
    #[error("overflow detected in {section}: {text:?}")]
    Overflow { section: &'static str, text: String },

    /// Shaping needs a quantity that was not extracted
    #[error("{section} requires {prerequisite}, which was not extracted")]
    MissingPrerequisite {
        section: &'static str,
        prerequisite: Prerequisite,
    },

    /// A value that should be unique occurred several times
    #[error("multiple entries of {0} were located")]
    MultipleEntries(&'static str),

    /// Text that is neither a number nor the overflow sentinel
    #[error("invalid number in {section}: {text:?}")]
    InvalidNumber { section: &'static str, text: String },
}

/// Errors surfaced by the vasprun.xml extractor
#[derive(Debug, thiserror::Error)]
pub enum VasprunError {
    /// Error from the XML reader
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document has no usable root element, even in recovery mode
    #[error("structural parse error: {0}")]
    StructuralParse(String),

    /// The size of the input could not be determined
    #[error("cannot determine size of {0}")]
    NoSize(String),

    /// An atomic symbol is not in the element table
    #[error("unknown atomic element {0:?}")]
    UnresolvableSpecies(String),

    /// Status selector other than `initial`, `final` or `all`
    #[error("unsupported status selector {0:?}, expected initial, final or all")]
    InvalidStatusSelector(String),

    /// Unknown total energy name
    #[error("unsupported energy type {0:?}")]
    InvalidEnergyKind(String),

    /// Parsing was interrupted through the cancellation flag
    #[error("parsing cancelled")]
    Cancelled,

    /// Conversion failure of a single quantity
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Failure class, stable across both extraction strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    StructuralParse,
    CountMismatch,
    Overflow,
    MissingPrerequisite,
    UnresolvableSpecies,
    InvalidStatusSelector,
    MultipleEntries,
    InvalidNumber,
    InvalidEnergyKind,
    NoSize,
    Io,
    Cancelled,
}

impl ErrorKind {
    /// Numeric code of the failure class
    pub fn code(self) -> u16 {
        match self {
            ErrorKind::MultipleEntries => 500,
            ErrorKind::MissingPrerequisite => 501,
            ErrorKind::CountMismatch => 505,
            ErrorKind::UnresolvableSpecies => 506,
            ErrorKind::InvalidStatusSelector => 507,
            ErrorKind::NoSize => 508,
            ErrorKind::Overflow => 509,
            ErrorKind::StructuralParse => 511,
            ErrorKind::InvalidNumber => 512,
            ErrorKind::InvalidEnergyKind => 513,
            ErrorKind::Cancelled => 514,
            ErrorKind::Io => 14,
        }
    }
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::CountMismatch { .. } => ErrorKind::CountMismatch,
            ExtractError::Overflow { .. } => ErrorKind::Overflow,
            ExtractError::MissingPrerequisite { .. } => ErrorKind::MissingPrerequisite,
            ExtractError::MultipleEntries(_) => ErrorKind::MultipleEntries,
            ExtractError::InvalidNumber { .. } => ErrorKind::InvalidNumber,
        }
    }

    pub(crate) fn missing(section: &'static str, prerequisite: Prerequisite) -> Self {
        ExtractError::MissingPrerequisite {
            section,
            prerequisite,
        }
    }

    pub(crate) fn mismatch(section: &'static str, expected: usize, found: usize) -> Self {
        ExtractError::CountMismatch {
            section,
            expected,
            found,
        }
    }
}

impl VasprunError {
    /// Failure class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            VasprunError::Xml(_) | VasprunError::StructuralParse(_) => ErrorKind::StructuralParse,
            VasprunError::Io(_) => ErrorKind::Io,
            VasprunError::NoSize(_) => ErrorKind::NoSize,
            VasprunError::UnresolvableSpecies(_) => ErrorKind::UnresolvableSpecies,
            VasprunError::InvalidStatusSelector(_) => ErrorKind::InvalidStatusSelector,
            VasprunError::InvalidEnergyKind(_) => ErrorKind::InvalidEnergyKind,
            VasprunError::Cancelled => ErrorKind::Cancelled,
            VasprunError::Extract(e) => e.kind(),
        }
    }
}
