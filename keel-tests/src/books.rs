use keel::{Entity, Executor, Persistable, stream::TryStreamExt};
use std::sync::LazyLock;
use tokio::sync::Mutex;

pub(crate) static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

#[derive(Entity, Debug, Clone, PartialEq)]
#[allow(non_snake_case)]
pub struct Book {
    #[keel(type = "SERIAL primary key", skip_on_write, id)]
    pub ID: i32,
    #[keel(type = "varchar(255) not null")]
    pub Title: String,
    #[keel(type = "varchar(255) not null")]
    pub Author: String,
    #[keel(type = "integer")]
    pub Year: Option<i32>,
    /// Filled by the application, never stored
    #[keel(skip)]
    pub Pages: Vec<Page>,
}

#[derive(Entity, Debug, Clone, PartialEq)]
#[allow(non_snake_case)]
pub struct Page {
    #[keel(type = "SERIAL primary key", skip_on_write, order_by, id)]
    pub ID: i32,
    #[keel(type = "integer not null")]
    pub BookID: i32,
    #[keel(type = "text")]
    pub Content: String,
}

fn book(title: &str, author: &str, year: Option<i32>) -> Book {
    Book {
        ID: 0,
        Title: title.into(),
        Author: author.into(),
        Year: year,
        Pages: vec![],
    }
}

pub async fn books<E: Executor>(executor: &E) {
    let _lock = MUTEX.lock().await;

    // Setup
    executor
        .execute("DROP TABLE IF EXISTS Page, Book;".into())
        .await
        .expect("Failed to drop the tables");
    Book::create_table(executor)
        .await
        .expect("Failed to create Book table");
    Page::create_table(executor)
        .await
        .expect("Failed to create Page table");
    // Creating twice is harmless
    Book::create_table(executor)
        .await
        .expect("Failed to create Book table a second time");

    // Insert
    let mut dune = book("Dune", "Frank Herbert", Some(1965));
    let mut emma = book("Emma", "Jane Austen", Some(1815));
    let mut persuasion = book("Persuasion", "Jane Austen", None);
    for book in [&mut dune, &mut emma, &mut persuasion] {
        book.save(executor).await.expect("Failed to insert book");
        assert!(book.ID > 0, "The identifier must be assigned on insert");
    }
    assert_ne!(dune.ID, emma.ID);
    assert_ne!(emma.ID, persuasion.ID);

    // Find by id
    let found = Book::find_by_id(executor, emma.ID as i64)
        .await
        .expect("Failed to find by id");
    assert_eq!(found, Some(emma.clone()));
    let found = Book::find_by_id(executor, 1_000_000)
        .await
        .expect("Failed to find by id");
    assert_eq!(found, None);

    // Find all
    let mut all = Book::find_all(executor)
        .try_collect::<Vec<_>>()
        .await
        .expect("Failed to find all books");
    all.sort_by_key(|v| v.ID);
    assert_eq!(all, [dune.clone(), emma.clone(), persuasion.clone()]);

    // Filters
    let mut austen = Book::find_filtered(executor, &["Author", "Jane Austen"])
        .try_collect::<Vec<_>>()
        .await
        .expect("Failed to filter by author");
    austen.sort_by_key(|v| v.ID);
    assert_eq!(austen, [emma.clone(), persuasion.clone()]);
    let year = Book::find_filtered(
        executor,
        &["Author", "Jane Austen", "AND", "Year", "1815"],
    )
    .try_collect::<Vec<_>>()
    .await
    .expect("Failed to filter by author and year");
    assert_eq!(year, [emma.clone()]);
    let either = Book::find_filtered(executor, &["Title", "Dune", "OR", "Title", "Emma"])
        .try_collect::<Vec<_>>()
        .await
        .expect("Failed to filter on alternatives");
    assert_eq!(either.len(), 2);
    let none = Book::find_filtered(executor, &["Title", "Ulysses"])
        .try_collect::<Vec<_>>()
        .await
        .expect("Failed to filter on a missing title");
    assert!(none.is_empty());
    // Dangling conjunction matches everything
    let unfiltered = Book::find_filtered(executor, &["Title", "Dune", "AND"])
        .try_collect::<Vec<_>>()
        .await
        .expect("A malformed filter falls back to no condition");
    assert_eq!(unfiltered.len(), 3);
    let result = Book::find_filtered(executor, &["Title"])
        .try_collect::<Vec<_>>()
        .await;
    assert!(result.is_err());

    // Pages, ordered by identifier
    for (i, content) in ["Prologue", "Chapter 1", "Chapter 2"].into_iter().enumerate() {
        let mut page = Page {
            ID: 0,
            BookID: if i == 0 { emma.ID } else { dune.ID },
            Content: content.into(),
        };
        page.save(executor).await.expect("Failed to insert page");
    }
    let pages = Page::find_all(executor)
        .try_collect::<Vec<_>>()
        .await
        .expect("Failed to find all pages");
    assert_eq!(pages.len(), 3);
    assert!(pages.windows(2).all(|v| v[0].ID < v[1].ID));
    let dune_id = dune.ID.to_string();
    dune.Pages = Page::find_filtered(executor, &["BookID", dune_id.as_str()])
        .try_collect::<Vec<_>>()
        .await
        .expect("Failed to filter pages by book");
    assert_eq!(
        dune.Pages.iter().map(|v| v.Content.as_str()).collect::<Vec<_>>(),
        ["Chapter 1", "Chapter 2"]
    );

    // Update
    persuasion.Year = Some(1817);
    let id = persuasion.ID;
    persuasion.save(executor).await.expect("Failed to update book");
    assert_eq!(persuasion.ID, id);
    let found = Book::find_by_id(executor, id as i64)
        .await
        .expect("Failed to find the updated book");
    assert_eq!(found.map(|v| v.Year), Some(Some(1817)));

    // Delete
    let result = dune.delete(executor).await.expect("Failed to delete book");
    assert_eq!(result.rows_affected, 1);
    let result = dune.delete(executor).await.expect("Failed to delete book");
    assert_eq!(result.rows_affected, 0);
    let remaining = Book::find_all(executor)
        .try_collect::<Vec<_>>()
        .await
        .expect("Failed to find all books");
    assert_eq!(remaining.len(), 2);
}
