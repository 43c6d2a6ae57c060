use crate::ValueHolder;
use async_stream::try_stream;
use keel_core::{
    Error, QueryResult, Result, Row, RowLabeled, RowNames,
    stream::{Stream, StreamExt},
};
use std::pin::pin;

pub(crate) fn row_to_keel_row(row: tokio_postgres::Row) -> Result<Row> {
    (0..row.len())
        .map(|i| match row.try_get::<_, ValueHolder>(i) {
            Ok(v) => Ok(v.0),
            Err(e) => {
                let col = &row.columns()[i];
                Err(Error::new(e).context(format!(
                    "Could not deserialize column {} `{}`: {}",
                    i,
                    col.name(),
                    col.type_()
                )))
            }
        })
        .collect::<Result<Row>>()
}

/// Labels are read once from the first row and shared by the following ones.
pub(crate) fn stream_postgres_row_to_keel_row(
    stream: impl Stream<Item = std::result::Result<tokio_postgres::Row, tokio_postgres::Error>>,
) -> impl Stream<Item = Result<QueryResult>> {
    try_stream! {
        let mut stream = pin!(stream);
        let mut labels: Option<RowNames> = None;
        while let Some(row) = stream.next().await.transpose()? {
            let labels = labels.get_or_insert_with(|| {
                row.columns().iter().map(|c| c.name().to_string()).collect()
            });
            yield QueryResult::Row(RowLabeled::new(labels.clone(), row_to_keel_row(row)?));
        }
    }
}
