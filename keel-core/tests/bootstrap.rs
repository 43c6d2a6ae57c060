use keel_core::{
    Bootstrap, BootstrapState, ColumnDef, Connection, ConnectionConfig, Driver, Error, Executor,
    GenericSqlWriter, Query, QueryResult, Result, RetryPolicy, RowsAffected, TableDef, setup,
    stream::{self, Stream},
};
use std::{
    borrow::Cow,
    cell::{Cell, RefCell},
    future::Future,
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

thread_local! {
    /// Probes (connect or ping) that fail before the server answers.
    static FAILURES: Cell<u32> = const { Cell::new(0) };
    static PROBES: Cell<u32> = const { Cell::new(0) };
    static BROKEN_TABLE: Cell<Option<&'static str>> = const { Cell::new(None) };
    static EXECUTED: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    static URLS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    /// Sessions opened by `DyingConnection`.
    static SESSIONS: Cell<u32> = const { Cell::new(0) };
}

fn reset(failures: u32, broken_table: Option<&'static str>) {
    SESSIONS.set(0);
    FAILURES.set(failures);
    PROBES.set(0);
    BROKEN_TABLE.set(broken_table);
    EXECUTED.with_borrow_mut(Vec::clear);
    URLS.with_borrow_mut(Vec::clear);
}

fn failing_probe() -> bool {
    PROBES.set(PROBES.get() + 1);
    let failures = FAILURES.get();
    if failures > 0 {
        FAILURES.set(failures - 1);
        return true;
    }
    false
}

struct MockDriver;
impl Driver for MockDriver {
    const NAME: &'static str = "mock";
    type SqlWriter = GenericSqlWriter;
    fn sql_writer(&self) -> GenericSqlWriter {
        GenericSqlWriter::new()
    }
}

struct MockConnection {
    driver: MockDriver,
    idle: usize,
}

impl Executor for MockConnection {
    type Driver = MockDriver;

    fn driver(&self) -> &MockDriver {
        &self.driver
    }

    fn run(&self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        let broken = BROKEN_TABLE
            .get()
            .is_some_and(|t| query.sql.contains(&format!("EXISTS {t} (")));
        EXECUTED.with_borrow_mut(|v| v.push(query.sql));
        stream::iter([if broken {
            Err(Error::msg("permission denied for schema public"))
        } else {
            Ok(QueryResult::Affected(RowsAffected::default()))
        }])
    }
}

impl Connection for MockConnection {
    fn connect(url: Cow<'static, str>) -> impl Future<Output = Result<Self>> + Send {
        URLS.with_borrow_mut(|v| v.push(url.into_owned()));
        let refused = FAILURES.get() > 0 && failing_probe();
        async move {
            if refused {
                return Err(Error::msg("connection refused"));
            }
            Ok(MockConnection {
                driver: MockDriver,
                idle: 2,
            })
        }
    }

    fn ping(&self) -> impl Future<Output = Result<()>> + Send {
        let failed = failing_probe();
        async move {
            if failed {
                return Err(Error::msg("server closed the connection unexpectedly"));
            }
            Ok(())
        }
    }

    fn set_max_idle_connections(&mut self, max: usize) {
        self.idle = max;
    }

    fn max_idle_connections(&self) -> usize {
        self.idle
    }
}

/// Session that never recovers once a ping failed, like a closed Postgres client.
struct DyingConnection {
    driver: MockDriver,
    dead: AtomicBool,
    idle: usize,
}

impl Executor for DyingConnection {
    type Driver = MockDriver;

    fn driver(&self) -> &MockDriver {
        &self.driver
    }

    fn run(&self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        EXECUTED.with_borrow_mut(|v| v.push(query.sql));
        stream::iter([Ok(QueryResult::Affected(RowsAffected::default()))])
    }
}

impl Connection for DyingConnection {
    fn connect(_url: Cow<'static, str>) -> impl Future<Output = Result<Self>> + Send {
        SESSIONS.set(SESSIONS.get() + 1);
        async {
            Ok(DyingConnection {
                driver: MockDriver,
                dead: AtomicBool::new(false),
                idle: 2,
            })
        }
    }

    fn ping(&self) -> impl Future<Output = Result<()>> + Send {
        if failing_probe() {
            self.dead.store(true, Ordering::Relaxed);
        }
        let dead = self.dead.load(Ordering::Relaxed);
        async move {
            if dead {
                return Err(Error::msg("connection closed"));
            }
            Ok(())
        }
    }

    fn set_max_idle_connections(&mut self, max: usize) {
        self.idle = max;
    }

    fn max_idle_connections(&self) -> usize {
        self.idle
    }
}

static BOOK: [ColumnDef; 2] = [
    ColumnDef {
        name: "ID",
        column_type: "SERIAL primary key",
        ignored: false,
        passive: true,
        order_by: false,
    },
    ColumnDef {
        name: "Title",
        column_type: "varchar(255)",
        ignored: false,
        passive: false,
        order_by: false,
    },
];

static PAGE: [ColumnDef; 2] = [
    ColumnDef {
        name: "ID",
        column_type: "SERIAL primary key",
        ignored: false,
        passive: true,
        order_by: true,
    },
    ColumnDef {
        name: "Content",
        column_type: "text",
        ignored: false,
        passive: false,
        order_by: false,
    },
];

fn config(attempts: u32, interval: Duration) -> ConnectionConfig {
    ConnectionConfig::new("db:5432", "keel", "secret", "library")
        .with_retry(RetryPolicy { attempts, interval })
}

fn bootstrap(attempts: u32, interval: Duration) -> Bootstrap {
    Bootstrap::new(config(attempts, interval))
        .register_def(TableDef {
            name: "Book",
            columns: &BOOK,
        })
        .register_def(TableDef {
            name: "Page",
            columns: &PAGE,
        })
}

#[tokio::test]
async fn unreachable_database_gives_up() {
    reset(u32::MAX, None);
    let interval = Duration::from_millis(20);
    let mut bootstrap = bootstrap(10, interval);
    assert_eq!(bootstrap.state(), BootstrapState::Disconnected);
    let start = Instant::now();
    let result = bootstrap.setup::<MockConnection>().await;
    let Err(error) = result else {
        panic!("The setup was expected to fail");
    };
    assert_eq!(error.to_string(), "Unable to open database connection");
    assert_eq!(PROBES.get(), 10);
    assert!(start.elapsed() >= interval * 9);
    assert_eq!(bootstrap.state(), BootstrapState::Failed);
    assert!(EXECUTED.with_borrow(Vec::is_empty));
}

#[tokio::test]
async fn recovers_after_failed_probes() {
    reset(3, None);
    let mut bootstrap = bootstrap(10, Duration::from_millis(1));
    let connection = bootstrap
        .setup::<MockConnection>()
        .await
        .expect("The setup should succeed on the fourth probe");
    assert_eq!(PROBES.get(), 4);
    assert_eq!(bootstrap.state(), BootstrapState::Ready);
    assert_eq!(connection.max_idle_connections(), 0);
    EXECUTED.with_borrow(|v| {
        assert_eq!(
            *v,
            [
                "CREATE TABLE IF NOT EXISTS Book (ID SERIAL primary key, Title varchar(255));",
                "CREATE TABLE IF NOT EXISTS Page (ID SERIAL primary key, Content text);",
            ]
        )
    });
    URLS.with_borrow(|v| {
        assert!(
            v.iter()
                .all(|url| url == "mock://keel:secret@db:5432/library?sslmode=disable")
        )
    });
}

#[tokio::test]
async fn table_failure_is_reported_with_the_type() {
    reset(0, Some("Page"));
    let mut bootstrap = bootstrap(10, Duration::from_millis(1));
    let Err(error) = bootstrap.setup::<MockConnection>().await else {
        panic!("The setup was expected to fail");
    };
    assert_eq!(error.to_string(), "Failed to create table for Page");
    assert!(format!("{error:#}").contains("permission denied"));
    assert_eq!(bootstrap.state(), BootstrapState::Failed);
    assert_eq!(EXECUTED.with_borrow(Vec::len), 2);
}

#[tokio::test]
async fn setup_function() {
    reset(0, None);
    let tables = [TableDef {
        name: "Book",
        columns: &BOOK,
    }];
    let connection: MockConnection = setup(
        config(1, Duration::from_millis(1)).with_max_idle_connections(1),
        &tables,
    )
    .await
    .expect("The setup should succeed");
    assert_eq!(connection.max_idle_connections(), 1);
    assert_eq!(PROBES.get(), 1);
    assert_eq!(EXECUTED.with_borrow(Vec::len), 1);
}

#[tokio::test]
async fn failed_ping_reopens_the_session() {
    reset(1, None);
    let mut bootstrap = bootstrap(10, Duration::from_millis(1));
    let connection = bootstrap
        .setup::<DyingConnection>()
        .await
        .expect("The second attempt should open a new session");
    assert_eq!(bootstrap.state(), BootstrapState::Ready);
    assert_eq!(PROBES.get(), 2);
    assert_eq!(SESSIONS.get(), 2);
    assert!(!connection.dead.load(Ordering::Relaxed));
    assert_eq!(EXECUTED.with_borrow(Vec::len), 2);
}
