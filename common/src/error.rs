use thiserror::Error;

/// Broad classes of failure, used by callers that only need to know whether
/// to fix their input, distrust a board snapshot, or give up on a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid dimensions, mine counts, cell codes or search parameters.
    /// Always reported before any randomness or search begins.
    Configuration,
    /// The revealed numbers admit no consistent mine assignment.
    InconsistentBoard,
    /// A constraint component is too large to enumerate exhaustively.
    Enumeration,
    /// A binary snapshot could not be encoded or decoded.
    Encoding,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("board dimensions must be positive, got {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("expected {expected} cells, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("invalid cell code {code} at index {index}")]
    InvalidCellCode { code: i32, index: usize },

    #[error("point ({x}, {y}) is outside the {rows}x{cols} board")]
    OutOfBounds {
        x: usize,
        y: usize,
        rows: usize,
        cols: usize,
    },

    #[error("{mines} mines do not fit into {available} cells outside the safe zone")]
    TooManyMines { mines: usize, available: usize },

    #[error("declared mine count {declared} is outside the feasible range {min}..={max}")]
    MineCountOutOfRange {
        declared: usize,
        min: usize,
        max: usize,
    },

    #[error("mine density {0} is not within 0.0..=1.0")]
    InvalidDensity(f64),

    #[error("invalid search configuration: {0}")]
    InvalidSearch(&'static str),

    #[error("revealed numbers admit no consistent mine assignment")]
    InconsistentBoard,

    #[error("component of {cells} cells has {groups} undecided groups, over the limit of {limit}")]
    ComponentTooLarge {
        cells: usize,
        groups: usize,
        limit: usize,
    },

    #[error("snapshot encoding failed: {0}")]
    Serialization(#[from] bcs::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidDimensions { .. }
            | Error::ShapeMismatch { .. }
            | Error::InvalidCellCode { .. }
            | Error::OutOfBounds { .. }
            | Error::TooManyMines { .. }
            | Error::MineCountOutOfRange { .. }
            | Error::InvalidDensity(_)
            | Error::InvalidSearch(_) => ErrorKind::Configuration,
            Error::InconsistentBoard => ErrorKind::InconsistentBoard,
            Error::ComponentTooLarge { .. } => ErrorKind::Enumeration,
            Error::Serialization(_) => ErrorKind::Encoding,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
