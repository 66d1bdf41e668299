mod as_value;
mod blocking;
mod builder;
mod cache;
mod connection;
mod converter;
mod driver;
mod entity;
mod error;
mod executor;
mod mapper;
mod pool;
mod query;
mod store;
mod transaction;
mod util;
mod value;
mod writer;

pub use ::anyhow::Context as ErrorContext;
pub use as_value::*;
pub use blocking::*;
pub use builder::*;
pub use cache::*;
pub use connection::*;
pub use converter::*;
pub use driver::*;
pub use entity::*;
pub use error::*;
pub use executor::*;
pub use mapper::*;
pub use pool::*;
pub use query::*;
pub use store::*;
pub use transaction::*;
pub use util::*;
pub use value::*;
pub use writer::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
