#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use indoc::indoc;
    use keel::{Entity, Filter, GenericSqlWriter, Query, SqlWriter, Value};

    const WRITER: GenericSqlWriter = GenericSqlWriter {};

    #[derive(Entity)]
    struct Book {
        #[keel(type = "SERIAL primary key", skip_on_write, id)]
        ID: i32,
        #[keel(type = "varchar(255)")]
        Title: String,
        #[keel(type = "varchar(255)")]
        Author: String,
        #[keel(skip)]
        Pages: Vec<String>,
    }

    #[derive(Entity)]
    struct Page {
        #[keel(type = "SERIAL primary key", skip_on_write, order_by, id)]
        ID: i32,
        #[keel(type = "integer")]
        BookID: i32,
        #[keel(type = "text")]
        Content: String,
    }

    #[derive(Entity)]
    struct Counter {
        #[keel(type = "BIGSERIAL primary key", skip_on_write, id)]
        ID: i64,
        #[keel(type = "timestamp default now()", skip_on_write)]
        Created: Option<time::PrimitiveDateTime>,
    }

    fn book() -> Book {
        Book {
            ID: 7,
            Title: "Dune".into(),
            Author: "Frank Herbert".into(),
            Pages: vec!["ignored".into()],
        }
    }

    fn text(v: &str) -> Value {
        Value::Unknown(Some(v.into()))
    }

    #[test]
    fn create_table() {
        let mut query = Query::default();
        WRITER.write_create_table::<Book>(&mut query);
        assert_eq!(
            query.sql,
            "CREATE TABLE IF NOT EXISTS Book (ID SERIAL primary key, Title varchar(255), Author varchar(255));"
        );
        assert!(query.params.is_empty());

        let mut query = Query::default();
        WRITER.write_create_table::<Book>(&mut query);
        WRITER.write_create_table::<Page>(&mut query);
        assert_eq!(
            query.sql,
            indoc! {"
                CREATE TABLE IF NOT EXISTS Book (ID SERIAL primary key, Title varchar(255), Author varchar(255));
                CREATE TABLE IF NOT EXISTS Page (ID SERIAL primary key, BookID integer, Content text);
            "}
            .trim()
        );
    }

    #[test]
    fn select_all() {
        let mut query = Query::default();
        WRITER.write_select::<Book>(&mut query, None);
        assert_eq!(query.sql, "SELECT ID,Title,Author FROM Book;");

        let mut query = Query::default();
        WRITER.write_select::<Page>(&mut query, None);
        assert_eq!(query.sql, "SELECT ID,BookID,Content FROM Page ORDER BY ID;");
    }

    #[test]
    fn select_filtered() {
        let filter = Filter::parse(&["Author", "Frank Herbert"]).unwrap();
        let mut query = Query::default();
        WRITER.write_select::<Book>(&mut query, Some(&filter));
        assert_eq!(query.sql, "SELECT ID,Title,Author FROM Book WHERE Author=$1;");
        assert_eq!(query.params, [text("Frank Herbert")]);

        let filter = Filter::parse(&["BookID", "3", "AND", "Content", "Once upon a time"]).unwrap();
        let mut query = Query::default();
        WRITER.write_select::<Page>(&mut query, Some(&filter));
        assert_eq!(
            query.sql,
            "SELECT ID,BookID,Content FROM Page WHERE BookID=$1 AND Content=$2 ORDER BY ID;"
        );
        assert_eq!(query.params, [text("3"), text("Once upon a time")]);
    }

    #[test]
    fn select_with_empty_filter() {
        let filter = Filter::parse(&["BookID", "3", "AND"]).unwrap();
        let mut query = Query::default();
        WRITER.write_select::<Page>(&mut query, Some(&filter));
        assert_eq!(query.sql, "SELECT ID,BookID,Content FROM Page ORDER BY ID;");
        assert!(query.params.is_empty());
    }

    #[test]
    fn insert() {
        let mut query = Query::default();
        WRITER.write_insert(&mut query, &book());
        assert_eq!(
            query.sql,
            "INSERT INTO Book (Title,Author) VALUES ($1,$2) RETURNING ID;"
        );
        assert_eq!(
            query.params,
            [
                Value::Varchar(Some("Dune".into())),
                Value::Varchar(Some("Frank Herbert".into())),
            ]
        );
    }

    #[test]
    fn insert_default_values() {
        let mut query = Query::default();
        WRITER.write_insert(
            &mut query,
            &Counter {
                ID: 0,
                Created: None,
            },
        );
        assert_eq!(query.sql, "INSERT INTO Counter DEFAULT VALUES RETURNING ID;");
        assert!(query.params.is_empty());
    }

    #[test]
    fn update() {
        let mut query = Query::default();
        WRITER.write_update(&mut query, &book());
        assert_eq!(
            query.sql,
            "UPDATE Book SET Title=$1, Author=$2 WHERE ID=$3;"
        );
        assert_eq!(
            query.params,
            [
                Value::Varchar(Some("Dune".into())),
                Value::Varchar(Some("Frank Herbert".into())),
                Value::Int64(Some(7)),
            ]
        );

        let page = Page {
            ID: 2,
            BookID: 7,
            Content: "Chapter 1".into(),
        };
        let mut query = Query::default();
        WRITER.write_update(&mut query, &page);
        let writable = Page::columns().iter().filter(|c| c.is_writable()).count();
        assert!(query.sql.ends_with(&format!("WHERE ID=${};", writable + 1)));
        assert_eq!(query.params.last(), Some(&Value::Int64(Some(2))));
    }

    #[test]
    fn update_without_writable_columns() {
        let mut query = Query::default();
        WRITER.write_update(
            &mut query,
            &Counter {
                ID: 3,
                Created: None,
            },
        );
        assert!(query.is_empty());
        assert!(query.params.is_empty());
    }

    #[test]
    fn delete() {
        let mut query = Query::default();
        WRITER.write_delete(&mut query, &book());
        assert_eq!(query.sql, "DELETE FROM Book WHERE ID=$1;");
        assert_eq!(query.params, [Value::Int64(Some(7))]);
    }

    #[test]
    fn placeholders_continue_across_statements() {
        let mut query = Query::default();
        WRITER.write_delete(&mut query, &book());
        WRITER.write_update(&mut query, &book());
        assert_eq!(
            query.sql,
            indoc! {"
                DELETE FROM Book WHERE ID=$1;
                UPDATE Book SET Title=$2, Author=$3 WHERE ID=$4;
            "}
            .trim()
        );
        assert_eq!(query.params.len(), 4);
    }
}
