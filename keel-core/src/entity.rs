use crate::{
    AsValue, ColumnDef, Driver, Error, ErrorContext, Executor, Filter, Query, Result, Row,
    RowLabeled, RowsAffected, SqlWriter, TableDef, column::order_by_column,
    future::{self, Either},
    stream::{Stream, StreamExt, TryStreamExt},
};
use futures::{FutureExt, TryFutureExt};
use std::{future::Future, pin::pin};

/// A record type mapped to a table.
///
/// Usually implemented through `#[derive(Entity)]`. The table is named after
/// the type and has one column per field that is not tagged `skip`.
pub trait Entity: Send + Sync {
    fn table_name() -> &'static str;
    fn columns() -> &'static [ColumnDef];

    /// Default ordering key: the last non ignored column tagged `order_by`.
    fn order_by() -> Option<&'static ColumnDef> {
        order_by_column(Self::columns())
    }

    fn table_def() -> TableDef
    where
        Self: Sized,
    {
        TableDef::of::<Self>()
    }

    /// Values of the non ignored fields, in declaration order.
    fn row(&self) -> Row;

    fn from_row(row: RowLabeled) -> Result<Self>
    where
        Self: Sized;

    fn create_table<Exec: Executor>(executor: &Exec) -> impl Future<Output = Result<()>> + Send
    where
        Self: Sized,
    {
        let mut query = Query::default();
        executor
            .driver()
            .sql_writer()
            .write_create_table::<Self>(&mut query);
        executor.execute(query).map_ok(|_| ())
    }

    /// Every row of the table, in the default order.
    fn find_all<Exec: Executor>(executor: &Exec) -> impl Stream<Item = Result<Self>> + Send
    where
        Self: Sized,
    {
        let mut query = Query::default();
        executor
            .driver()
            .sql_writer()
            .write_select::<Self>(&mut query, None);
        executor
            .fetch(query)
            .and_then(|row| future::ready(Self::from_row(row)))
    }

    /// Rows matching the filter tokens `column, value[, conjunction, column, value]...`.
    fn find_filtered<Exec: Executor, S: AsRef<str>>(
        executor: &Exec,
        tokens: &[S],
    ) -> impl Stream<Item = Result<Self>> + Send
    where
        Self: Sized,
    {
        let query = Filter::parse(tokens).map(|filter| {
            let mut query = Query::default();
            executor
                .driver()
                .sql_writer()
                .write_select::<Self>(&mut query, Some(&filter));
            query
        });
        async move { query.map(|query| executor.fetch(query)) }
            .try_flatten_stream()
            .and_then(|row| future::ready(Self::from_row(row)))
    }
}

/// A record with an integer identifier generated by the backend.
///
/// An identifier `<= 0` means the record was never stored: `save` inserts it
/// and captures the generated identifier, otherwise it updates the row.
pub trait Persistable: Entity {
    const ID_COLUMN: &'static str = "ID";

    fn id(&self) -> i64;
    /// Fails when `id` does not fit the identifier field.
    fn set_id(&mut self, id: i64) -> Result<()>;

    /// Insert the record, resolves to the returned row holding the identifier.
    fn insert<Exec: Executor>(&self, executor: &Exec) -> impl Future<Output = Result<RowLabeled>> + Send
    where
        Self: Sized,
    {
        let mut query = Query::default();
        executor
            .driver()
            .sql_writer()
            .write_insert(&mut query, self);
        executor.fetch_one(query)
    }

    fn update<Exec: Executor>(
        &self,
        executor: &Exec,
    ) -> impl Future<Output = Result<RowsAffected>> + Send
    where
        Self: Sized,
    {
        let mut query = Query::default();
        executor
            .driver()
            .sql_writer()
            .write_update(&mut query, self);
        if query.is_empty() {
            log::warn!(
                "{} has no writable columns, the update of {} is skipped",
                Self::table_name(),
                self.id()
            );
            return Either::Left(future::ready(Ok(RowsAffected::default())));
        }
        Either::Right(executor.execute(query))
    }

    fn delete<Exec: Executor>(
        &self,
        executor: &Exec,
    ) -> impl Future<Output = Result<RowsAffected>> + Send
    where
        Self: Sized,
    {
        let mut query = Query::default();
        executor
            .driver()
            .sql_writer()
            .write_delete(&mut query, self);
        executor.execute(query)
    }

    /// Insert when the record was never stored (updating its identifier), update otherwise.
    fn save<Exec: Executor>(&mut self, executor: &Exec) -> impl Future<Output = Result<()>> + Send
    where
        Self: Sized,
    {
        async move {
            if self.id() > 0 {
                return self.update(executor).await.map(|_| ());
            }
            let mut row = self.insert(executor).await?;
            let id = row.take_column(Self::ID_COLUMN).ok_or_else(|| {
                Error::msg(format!(
                    "The insert into {} did not return the column {}",
                    Self::table_name(),
                    Self::ID_COLUMN
                ))
            })?;
            let id = i64::try_from_value(id).with_context(|| {
                format!("While reading the identifier of a new {}", Self::table_name())
            })?;
            self.set_id(id)
        }
    }

    fn find_by_id<Exec: Executor>(
        executor: &Exec,
        id: i64,
    ) -> impl Future<Output = Result<Option<Self>>> + Send
    where
        Self: Sized,
    {
        let mut query = Query::default();
        executor.driver().sql_writer().write_select::<Self>(
            &mut query,
            Some(&Filter::column_equals(Self::ID_COLUMN, id)),
        );
        let stream = executor
            .fetch(query)
            .and_then(|row| future::ready(Self::from_row(row)));
        async move { pin!(stream).into_future().map(|(v, _)| v).await.transpose() }
    }
}
