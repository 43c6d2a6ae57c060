use crate::{
    ColumnDef, Entity, Filter, Fragment, Persistable, Query, TableDef, Value, separated_by,
    writer::Context,
};
use std::fmt::Write;

/// Dialect printer converting record descriptors into concrete SQL statements.
///
/// Statements are appended to a [`Query`]: the text goes in `sql` and every
/// data value is pushed to `params` behind a positional placeholder. The
/// defaults produce the PostgreSQL dialect.
pub trait SqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter;

    /// Render a table or column name.
    ///
    /// Names come from the derive and are trusted, they are written verbatim.
    fn write_identifier(&self, _context: &mut Context, out: &mut String, value: &str) {
        out.push_str(value);
    }

    /// Render the next positional placeholder (`$1`, `$2`, ...).
    fn write_placeholder(&self, context: &mut Context, out: &mut String) {
        context.counter += 1;
        let _ = write!(out, "${}", context.counter);
    }

    /// Render a placeholder and bind `value` to it.
    fn write_bind(&self, context: &mut Context, out: &mut Query, value: Value) {
        self.write_placeholder(context, &mut out.sql);
        out.params.push(value);
    }

    /// Render the predicate of a filter: `c1=$1 AND c2=$2`.
    fn write_filter(&self, context: &mut Context, out: &mut Query, filter: &Filter) {
        for term in &filter.terms {
            self.write_identifier(context, &mut out.sql, &term.column);
            out.sql.push('=');
            self.write_bind(context, out, term.value.clone());
            if let Some(conjunction) = &term.conjunction {
                out.sql.push(' ');
                out.sql.push_str(conjunction);
                out.sql.push(' ');
            }
        }
    }

    /// Render `<name> <type>` for a CREATE TABLE.
    fn write_create_table_column_fragment(
        &self,
        context: &mut Context,
        out: &mut String,
        column: &ColumnDef,
    ) {
        self.write_identifier(context, out, column.name());
        if !column.column_type.is_empty() {
            out.push(' ');
            out.push_str(column.column_type);
        }
    }

    /// Emit CREATE TABLE IF NOT EXISTS listing every non ignored column.
    fn write_create_table_def(&self, out: &mut Query, table: &TableDef) {
        let mut context = Context::for_query(Fragment::SqlCreateTable, out);
        let out = &mut out.sql;
        out.reserve(64 + table.columns.len() * 32);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("CREATE TABLE IF NOT EXISTS ");
        self.write_identifier(&mut context, out, table.name);
        out.push_str(" (");
        separated_by(
            out,
            table.columns.iter().filter(|c| !c.ignored),
            |out, v| self.write_create_table_column_fragment(&mut context, out, v),
            ", ",
        );
        out.push_str(");");
    }

    fn write_create_table<E>(&self, out: &mut Query)
    where
        Self: Sized,
        E: Entity,
    {
        self.write_create_table_def(out, &TableDef::of::<E>());
    }

    /// Emit SELECT with optional WHERE, then ORDER BY when the table has an ordering key.
    fn write_select_def(&self, out: &mut Query, table: &TableDef, filter: Option<&Filter>) {
        let mut context = Context::for_query(Fragment::SqlSelect, out);
        out.sql.reserve(64 + table.columns.len() * 16);
        if !out.sql.is_empty() {
            out.sql.push('\n');
        }
        out.sql.push_str("SELECT ");
        separated_by(
            &mut out.sql,
            table.columns.iter().filter(|c| c.is_selected()),
            |out, v| self.write_identifier(&mut context, out, v.name()),
            ",",
        );
        out.sql.push_str(" FROM ");
        self.write_identifier(
            &mut context.switch_fragment(Fragment::SqlSelectFrom).current,
            &mut out.sql,
            table.name,
        );
        if let Some(filter) = filter.filter(|v| !v.is_empty()) {
            out.sql.push_str(" WHERE ");
            self.write_filter(
                &mut context.switch_fragment(Fragment::SqlSelectWhere).current,
                out,
                filter,
            );
        }
        if let Some(order_by) = table.order_by() {
            out.sql.push_str(" ORDER BY ");
            self.write_identifier(
                &mut context.switch_fragment(Fragment::SqlSelectOrderBy).current,
                &mut out.sql,
                order_by.name(),
            );
        }
        out.sql.push(';');
    }

    fn write_select<E>(&self, out: &mut Query, filter: Option<&Filter>)
    where
        Self: Sized,
        E: Entity,
    {
        self.write_select_def(out, &TableDef::of::<E>(), filter);
    }

    /// Emit INSERT of the writable columns returning the identifier.
    fn write_insert<E>(&self, out: &mut Query, entity: &E)
    where
        Self: Sized,
        E: Persistable,
    {
        let mut context = Context::for_query(Fragment::SqlInsertInto, out);
        let (columns, values): (Vec<_>, Vec<_>) = writable_values(entity).unzip();
        out.sql.reserve(64 + columns.len() * 24);
        if !out.sql.is_empty() {
            out.sql.push('\n');
        }
        out.sql.push_str("INSERT INTO ");
        self.write_identifier(&mut context, &mut out.sql, E::table_name());
        if columns.is_empty() {
            out.sql.push_str(" DEFAULT VALUES");
        } else {
            out.sql.push_str(" (");
            separated_by(
                &mut out.sql,
                columns.iter().copied(),
                |out, v: &ColumnDef| self.write_identifier(&mut context, out, v.name()),
                ",",
            );
            out.sql.push_str(") VALUES (");
            let mut context = context.switch_fragment(Fragment::SqlInsertIntoValues);
            for (i, value) in values.into_iter().enumerate() {
                if i > 0 {
                    out.sql.push(',');
                }
                self.write_bind(&mut context.current, out, value);
            }
            out.sql.push(')');
        }
        out.sql.push_str(" RETURNING ");
        self.write_identifier(
            &mut context
                .switch_fragment(Fragment::SqlInsertIntoReturning)
                .current,
            &mut out.sql,
            E::ID_COLUMN,
        );
        out.sql.push(';');
    }

    /// Emit UPDATE of the writable columns keyed by the identifier.
    ///
    /// Writes nothing when the record has no writable column.
    fn write_update<E>(&self, out: &mut Query, entity: &E)
    where
        Self: Sized,
        E: Persistable,
    {
        let values = writable_values(entity).collect::<Vec<_>>();
        if values.is_empty() {
            return;
        }
        let mut context = Context::for_query(Fragment::SqlUpdate, out);
        out.sql.reserve(64 + values.len() * 24);
        if !out.sql.is_empty() {
            out.sql.push('\n');
        }
        out.sql.push_str("UPDATE ");
        self.write_identifier(&mut context, &mut out.sql, E::table_name());
        out.sql.push_str(" SET ");
        {
            let mut context = context.switch_fragment(Fragment::SqlUpdateSet);
            for (i, (column, value)) in values.into_iter().enumerate() {
                if i > 0 {
                    out.sql.push_str(", ");
                }
                self.write_identifier(&mut context.current, &mut out.sql, column.name());
                out.sql.push('=');
                self.write_bind(&mut context.current, out, value);
            }
        }
        out.sql.push_str(" WHERE ");
        let mut context = context.switch_fragment(Fragment::SqlUpdateWhere);
        self.write_identifier(&mut context.current, &mut out.sql, E::ID_COLUMN);
        out.sql.push('=');
        self.write_bind(&mut context.current, out, Value::Int64(Some(entity.id())));
        out.sql.push(';');
    }

    /// Emit DELETE of the row with the record's identifier.
    fn write_delete<E>(&self, out: &mut Query, entity: &E)
    where
        Self: Sized,
        E: Persistable,
    {
        let mut context = Context::for_query(Fragment::SqlDeleteFrom, out);
        if !out.sql.is_empty() {
            out.sql.push('\n');
        }
        out.sql.push_str("DELETE FROM ");
        self.write_identifier(&mut context, &mut out.sql, E::table_name());
        out.sql.push_str(" WHERE ");
        let mut context = context.switch_fragment(Fragment::SqlDeleteFromWhere);
        self.write_identifier(&mut context.current, &mut out.sql, E::ID_COLUMN);
        out.sql.push('=');
        self.write_bind(&mut context.current, out, Value::Int64(Some(entity.id())));
        out.sql.push(';');
    }
}

/// Writable columns of the record paired with their values, in declaration order.
fn writable_values<E: Entity>(entity: &E) -> impl Iterator<Item = (&'static ColumnDef, Value)> {
    E::columns()
        .iter()
        .filter(|c| c.is_selected())
        .zip(entity.row())
        .filter(|(c, _)| c.is_writable())
}

/// Fallback generic SQL writer (PostgreSQL conventions).
#[derive(Default, Debug, Clone, Copy)]
pub struct GenericSqlWriter;
impl GenericSqlWriter {
    /// Construct a new generic writer.
    pub fn new() -> Self {
        Self {}
    }
}
impl SqlWriter for GenericSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
}
