use thiserror::Error;

/// Failures surfaced by [`ChainTable`](crate::ChainTable) and its adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TableError {
    /// `remove` hashed to a bucket holding no entries.
    #[error("no element found: target bucket is empty")]
    NotFound,
    /// A traversal observed a structural mutation made after it was created.
    #[error("table was structurally modified during traversal")]
    Invalidated,
    /// A traversal was driven against a table other than the one that
    /// created it.
    #[error("traversal used with a table other than its own")]
    WrongTable,
    /// A constructor argument broke a documented precondition.
    #[error("precondition violated: {0}")]
    PreconditionViolation(&'static str),
}
