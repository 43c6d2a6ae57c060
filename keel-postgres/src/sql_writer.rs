use keel_core::SqlWriter;

/// Postgres dialect: the generic writer already emits `$n` placeholders and
/// passes column types through verbatim.
#[derive(Default, Debug, Clone, Copy)]
pub struct PostgresSqlWriter {}

impl SqlWriter for PostgresSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
}
