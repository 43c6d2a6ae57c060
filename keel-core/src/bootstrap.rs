use crate::{
    Connection, ConnectionConfig, Driver, Entity, Error, Executor, Query, Result, SqlWriter,
    TableDef,
};
use log::{error, info, warn};
use std::borrow::Cow;

/// Progress of a [`Bootstrap`].
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    #[default]
    Disconnected,
    /// Liveness probe number `attempt` (starting from 1) in progress.
    Connecting {
        attempt: u32,
    },
    /// Connected and every registered table exists.
    Ready,
    Failed,
}

/// Connects to the database with bounded retry, then creates the tables of
/// the registered record types.
///
/// ```rust,ignore
/// let connection: PostgresConnection = Bootstrap::new(ConnectionConfig::from_env()?)
///     .register::<Book>()
///     .register::<Page>()
///     .setup()
///     .await?;
/// ```
#[derive(Debug)]
pub struct Bootstrap {
    config: ConnectionConfig,
    tables: Vec<TableDef>,
    state: BootstrapState,
}

impl Bootstrap {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            tables: Vec::new(),
            state: BootstrapState::Disconnected,
        }
    }

    pub fn register<E: Entity>(self) -> Self {
        self.register_def(TableDef::of::<E>())
    }

    pub fn register_def(mut self, table: TableDef) -> Self {
        self.tables.push(table);
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    pub fn state(&self) -> BootstrapState {
        self.state
    }

    /// Open the connection and provision the schema.
    ///
    /// The connection is probed up to `retry.attempts` times, pausing
    /// `retry.interval` after every failure. Tables are created in
    /// registration order, the first failure aborts the setup.
    pub async fn setup<C: Connection>(&mut self) -> Result<C> {
        let mut connection = match self.connect::<C>().await {
            Ok(v) => v,
            Err(e) => {
                self.state = BootstrapState::Failed;
                let e = e.context("Unable to open database connection");
                error!("{:#}", e);
                return Err(e);
            }
        };
        connection.set_max_idle_connections(self.config.max_idle_connections);
        for table in &self.tables {
            let mut query = Query::default();
            connection
                .driver()
                .sql_writer()
                .write_create_table_def(&mut query, table);
            if let Err(e) = connection.execute(query).await {
                self.state = BootstrapState::Failed;
                let e = e.context(format!("Failed to create table for {}", table.name));
                error!("{:#}", e);
                return Err(e);
            }
        }
        self.state = BootstrapState::Ready;
        info!("Database configured");
        Ok(connection)
    }

    async fn connect<C: Connection>(&mut self) -> Result<C> {
        let url: Cow<'static, str> = self.config.url(<C::Driver as Driver>::NAME).into();
        let retry = self.config.retry;
        let mut connection: Option<C> = None;
        let mut last_error = Error::msg("No connection attempt was made");
        for attempt in 1..=retry.attempts {
            self.state = BootstrapState::Connecting { attempt };
            match probe(&mut connection, &url).await {
                Ok(()) => {
                    if let Some(connection) = connection {
                        return Ok(connection);
                    }
                }
                Err(e) => {
                    warn!(
                        "Cannot reach database at {}. Waiting {:?} before retrying. Try: {}\n{:#}",
                        self.config.host, retry.interval, attempt, e
                    );
                    last_error = e;
                }
            }
            tokio::time::sleep(retry.interval).await;
        }
        Err(last_error)
    }
}

/// Opens the handle when missing, then pings it.
///
/// A handle that fails the ping is dropped, the next probe reconnects.
async fn probe<C: Connection>(connection: &mut Option<C>, url: &Cow<'static, str>) -> Result<()> {
    let handle = match connection.take() {
        Some(v) => v,
        None => C::connect(url.clone()).await?,
    };
    handle.ping().await?;
    *connection = Some(handle);
    Ok(())
}

/// Connect with `config` and create `tables`, in one call.
pub async fn setup<C: Connection>(config: ConnectionConfig, tables: &[TableDef]) -> Result<C> {
    let mut bootstrap = tables
        .iter()
        .fold(Bootstrap::new(config), |b, t| b.register_def(*t));
    bootstrap.setup().await
}
