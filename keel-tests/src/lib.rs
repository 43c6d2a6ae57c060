mod books;
mod concurrent;

use crate::{books::books, concurrent::concurrent};
use keel::Connection;
use log::LevelFilter;
use std::env;

pub use books::{Book, Page};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Run the driver independent suite against an open connection.
pub async fn execute_tests<C: Connection>(connection: &C) {
    books(connection).await;
    concurrent(connection).await;
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
