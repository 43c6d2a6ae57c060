use crate::books::{Book, MUTEX};
use keel::{Entity, Executor, Persistable, future::join_all, stream::TryStreamExt};

/// Many requests in flight on the same handle.
pub async fn concurrent<E: Executor>(executor: &E) {
    let _lock = MUTEX.lock().await;

    Book::create_table(executor)
        .await
        .expect("Failed to create Book table");
    executor
        .execute("DELETE FROM Book WHERE Author = 'Anonymous';".into())
        .await
        .expect("Failed to clean up");
    let results = join_all((0..20).map(|i| async move {
        let mut book = Book {
            ID: 0,
            Title: format!("Volume {i}"),
            Author: "Anonymous".into(),
            Year: Some(2000 + i),
            Pages: vec![],
        };
        book.save(executor).await.map(|_| book)
    }))
    .await;
    let books = results
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .expect("Failed to insert concurrently");
    let mut ids = books.iter().map(|v| v.ID).collect::<Vec<_>>();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);

    let found = join_all(
        books
            .iter()
            .map(|v| Book::find_by_id(executor, v.ID as i64)),
    )
    .await;
    for (book, found) in books.iter().zip(found) {
        assert_eq!(found.expect("Failed to find by id").as_ref(), Some(book));
    }
    let anonymous = Book::find_filtered(executor, &["Author", "Anonymous"])
        .try_collect::<Vec<_>>()
        .await
        .expect("Failed to filter by author");
    assert_eq!(anonymous.len(), 20);
}
