use crate::SqlWriter;

/// Backend specific pieces: the URL scheme it answers to and its SQL dialect.
pub trait Driver: Send + Sync {
    /// URL scheme, e.g. `postgres`.
    const NAME: &'static str;
    type SqlWriter: SqlWriter;

    fn sql_writer(&self) -> Self::SqlWriter;
}
