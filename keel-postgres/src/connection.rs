use crate::{
    PostgresDriver, ValueHolder, postgres_type_to_value, util::stream_postgres_row_to_keel_row,
};
use async_stream::try_stream;
use keel_core::{
    Connection, Driver, Error, ErrorContext, Executor, Query, QueryResult, Result, RowsAffected,
    SslMode,
    stream::{Stream, StreamExt, TryStreamExt},
};
use openssl::ssl::{SslConnector, SslFiletype, SslMethod, SslVerifyMode};
use postgres_openssl::MakeTlsConnector;
use std::{borrow::Cow, env, path::Path, pin::pin, sync::Arc};
use tokio::spawn;
use tokio_postgres::{NoTls, config::SslMode as WireSslMode};
use url::Url;

/// Handle over a single multiplexed Postgres session.
///
/// Requests issued concurrently through `&self` are pipelined by the client.
pub struct PostgresConnection {
    pub(crate) client: tokio_postgres::Client,
    pub(crate) max_idle_connections: usize,
}

impl Executor for PostgresConnection {
    type Driver = PostgresDriver;

    fn driver(&self) -> &Self::Driver {
        &PostgresDriver {}
    }

    fn run(&self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        let context = Arc::new(format!("While running the query:\n{}", query));
        try_stream! {
            let (sql, params) = query.into_parts();
            let sql = sql.trim_end().trim_end_matches(';');
            let statement = self.client.prepare(sql).await?;
            let types = statement.params();
            if types.len() != params.len() {
                Err::<(), _>(Error::msg(format!(
                    "The query expects {} parameters but {} were bound",
                    types.len(),
                    params.len()
                )))?;
            }
            let params = params
                .into_iter()
                .zip(types)
                .map(|(value, ty)| value.try_as(&postgres_type_to_value(ty)).map(ValueHolder))
                .collect::<Result<Vec<_>>>()?;
            if statement.columns().is_empty() {
                let rows_affected = self.client.execute_raw(&statement, params).await?;
                yield QueryResult::Affected(RowsAffected { rows_affected });
            } else {
                let rows = self.client.query_raw(&statement, params).await?;
                let mut rows = pin!(stream_postgres_row_to_keel_row(rows));
                while let Some(row) = rows.next().await.transpose()? {
                    yield row;
                }
            }
        }
        .map_err(move |e: Error| {
            let e = e.context(context.clone());
            log::error!("{:#}", e);
            e
        })
    }
}

impl Connection for PostgresConnection {
    #[allow(refining_impl_trait)]
    async fn connect(url: Cow<'static, str>) -> Result<PostgresConnection> {
        let context = || format!("While trying to connect to `{}`", url);
        let prefix = format!("{}://", <Self::Driver as Driver>::NAME);
        if !url.starts_with(&prefix) {
            let error = Error::msg(format!(
                "Postgres connection url must start with `{}`",
                &prefix
            ))
            .context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        let mut url = Url::parse(&url).with_context(context)?;
        let mut take_url_param = |key: &str, env_var: &str| {
            let mut value = None;
            let mut pairs: Vec<(String, String)> = url
                .query_pairs()
                .map(|(k, v)| (k.into(), v.into()))
                .collect();
            if let Some(pos) = pairs.iter().position(|(k, _)| k == key) {
                let (_, v) = pairs.remove(pos);
                value = Some(v);
            }
            if pairs.is_empty() {
                url.set_query(None);
            } else {
                url.query_pairs_mut()
                    .clear()
                    .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            }
            value.or_else(|| env::var(env_var).ok())
        };
        let ssl_mode: SslMode = take_url_param("sslmode", "PGSSLMODE")
            .unwrap_or_default()
            .parse()
            .with_context(context)?;
        let root_cert = take_url_param("sslrootcert", "PGSSLROOTCERT");
        let cert = take_url_param("sslcert", "PGSSLCERT");
        let key = take_url_param("sslkey", "PGSSLKEY");
        let mut config: tokio_postgres::Config = url.as_str().parse().with_context(context)?;
        let client = if ssl_mode == SslMode::Disable {
            config.ssl_mode(WireSslMode::Disable);
            let (client, connection) = config.connect(NoTls).await.with_context(context)?;
            spawn(async move {
                if let Err(e) = connection.await
                    && !e.is_closed()
                {
                    log::error!("Postgres connection error: {:#}", e);
                }
            });
            client
        } else {
            let mut builder = SslConnector::builder(SslMethod::tls())?;
            if let Some(path) = root_cert.as_deref().map(Path::new)
                && path.exists()
            {
                builder.set_ca_file(path)?;
            }
            if let Some(path) = cert.as_deref().map(Path::new)
                && path.exists()
            {
                builder.set_certificate_chain_file(path)?;
            }
            if let Some(path) = key.as_deref().map(Path::new)
                && path.exists()
            {
                builder.set_private_key_file(path, SslFiletype::PEM)?;
            }
            match ssl_mode {
                SslMode::Prefer | SslMode::Require => builder.set_verify(SslVerifyMode::NONE),
                _ => builder.set_verify(SslVerifyMode::PEER),
            }
            let mut connector = MakeTlsConnector::new(builder.build());
            if ssl_mode != SslMode::VerifyFull {
                connector.set_callback(|config, _| {
                    config.set_verify_hostname(false);
                    Ok(())
                });
            }
            config.ssl_mode(if ssl_mode == SslMode::Prefer {
                WireSslMode::Prefer
            } else {
                WireSslMode::Require
            });
            let (client, connection) = config.connect(connector).await.with_context(context)?;
            spawn(async move {
                if let Err(e) = connection.await
                    && !e.is_closed()
                {
                    log::error!("Postgres connection error: {:#}", e);
                }
            });
            client
        };
        log::debug!("Connected to Postgres with sslmode={}", ssl_mode);
        Ok(Self {
            client,
            max_idle_connections: 0,
        })
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .batch_execute("SELECT 1")
            .await
            .context("The server did not answer the liveness check")
    }

    /// The session is a single multiplexed connection, the limit is only recorded.
    fn set_max_idle_connections(&mut self, max: usize) {
        self.max_idle_connections = max;
    }

    fn max_idle_connections(&self) -> usize {
        self.max_idle_connections
    }

    async fn disconnect(self) -> Result<()> {
        drop(self.client);
        Ok(())
    }
}
