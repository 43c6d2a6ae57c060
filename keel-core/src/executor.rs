use crate::{
    Driver, Error, Query, QueryResult, Result, RowLabeled, RowsAffected,
    truncate_long,
    stream::{Stream, StreamExt, TryStreamExt},
};
use futures::FutureExt;
use std::{future::Future, pin::pin};

/// Runs synthesized queries against a backend.
///
/// Receivers are shared references: a single handle serves concurrent
/// callers, the driver multiplexes the requests on its connection.
pub trait Executor: Send + Sync {
    type Driver: Driver;

    fn driver(&self) -> &Self::Driver;

    /// General method to send any query and return any result type (either row or count).
    ///
    /// Parameters are bound positionally, `params[i]` to `$i+1`.
    fn run(&self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send;

    /// Execute the query and returns the rows.
    fn fetch(&self, query: Query) -> impl Stream<Item = Result<RowLabeled>> + Send {
        self.run(query).filter_map(|v| async move {
            match v {
                Ok(QueryResult::Row(v)) => Some(Ok(v)),
                Err(e) => Some(Err(e)),
                _ => None,
            }
        })
    }

    /// Execute the query and return the total number of rows affected.
    fn execute(&self, query: Query) -> impl Future<Output = Result<RowsAffected>> + Send {
        self.run(query)
            .filter_map(|v| async move {
                match v {
                    Ok(QueryResult::Affected(v)) => Some(Ok(v)),
                    Err(e) => Some(Err(e)),
                    _ => None,
                }
            })
            .try_collect()
    }

    /// Execute the query and return its first row, an error if it produced none.
    fn fetch_one(&self, query: Query) -> impl Future<Output = Result<RowLabeled>> + Send {
        let sql = query.sql.clone();
        let stream = self.fetch(query);
        async move {
            pin!(stream)
                .into_future()
                .map(|(v, _)| v)
                .await
                .transpose()?
                .ok_or_else(|| {
                    let error = Error::msg(format!(
                        "The query returned no rows:\n{}",
                        truncate_long!(sql)
                    ));
                    log::error!("{:#}", error);
                    error
                })
        }
    }
}
