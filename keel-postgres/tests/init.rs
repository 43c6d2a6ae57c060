use keel_core::ConnectionConfig;
use std::{env, process::Command, time::Duration};
use testcontainers_modules::{
    postgres::Postgres,
    testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner},
};
use url::Url;

/// Configuration of a reachable server, `KEEL_POSTGRES_TEST` (a `postgres://` url)
/// takes precedence over starting a container.
pub async fn init() -> (ConnectionConfig, Option<ContainerAsync<Postgres>>) {
    if let Ok(url) = env::var("KEEL_POSTGRES_TEST") {
        let url = Url::parse(&url).expect("KEEL_POSTGRES_TEST is not a valid url");
        let host = match url.port() {
            Some(port) => format!("{}:{}", url.host_str().unwrap_or("localhost"), port),
            None => url.host_str().unwrap_or("localhost").to_string(),
        };
        let config = ConnectionConfig::new(
            host,
            url.username(),
            url.password().unwrap_or_default(),
            url.path().trim_start_matches('/'),
        );
        return (config, None);
    };
    if !Command::new("docker")
        .arg("ps")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
    {
        log::error!("Cannot access docker");
    }
    let container = Postgres::default()
        .with_user("keel-user")
        .with_password("anchor")
        .with_db_name("harbour")
        .with_startup_timeout(Duration::from_secs(10))
        .start()
        .await
        .expect("Could not start the container");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Cannot get the port of Postgres");
    (
        ConnectionConfig::new(format!("127.0.0.1:{port}"), "keel-user", "anchor", "harbour"),
        Some(container),
    )
}
