mod as_value;
mod bootstrap;
mod column;
mod config;
mod connection;
mod driver;
mod entity;
mod executor;
mod filter;
mod query;
mod util;
mod value;
mod writer;

pub use ::anyhow::Context as ErrorContext;
pub use as_value::*;
pub use bootstrap::*;
pub use column::*;
pub use config::*;
pub use connection::*;
pub use driver::*;
pub use entity::*;
pub use executor::*;
pub use filter::*;
pub use query::*;
pub use util::*;
pub use value::*;
pub use writer::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
