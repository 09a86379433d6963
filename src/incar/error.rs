/// Errors that can occur while reading or writing an INCAR file
#[derive(Debug, thiserror::Error)]
pub enum IncarError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A directive has no `=` separating tag and value
    #[error("line {line}: missing '=' in {directive:?}")]
    MissingEquals { line: usize, directive: String },

    /// A directive has more than one `=`
    #[error("line {line}: more than one '=' in {directive:?}")]
    MultipleEquals { line: usize, directive: String },

    /// Nothing before the `=`
    #[error("line {line}: directive without a tag")]
    EmptyTag { line: usize },

    /// Nothing after the `=`
    #[error("tag {0} has no value")]
    EmptyValue(String),

    /// The elements of a list value are of different types
    #[error("the values of tag {0} are not all of the same type, maybe a '#' is missing before a comment")]
    MixedTypes(String),
}
