use crate::{Connection, Driver, Error, Result};
use deadpool::managed::{self, Metrics, Object, PoolError, RecycleError, RecycleResult};
use std::marker::PhantomData;

/// Pool of connections of the driver `D`.
pub type Pool<D> = managed::Pool<ConnectionManager<D>>;
/// Connection checked out of a [`Pool`], returned to it on drop.
pub type PooledConnection<D> = Object<ConnectionManager<D>>;

/// Opens and recycles the connections of a [`Pool`].
pub struct ConnectionManager<D: Driver> {
    url: String,
    _driver: PhantomData<fn() -> D>,
}

impl<D: Driver> ConnectionManager<D> {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            _driver: PhantomData,
        }
    }
}

impl<D: Driver> managed::Manager for ConnectionManager<D> {
    type Type = D::Connection;
    type Error = Error;

    async fn create(&self) -> Result<D::Connection> {
        log::debug!("Opening a new {} connection", D::NAME);
        D::Connection::connect(&self.url).await
    }

    async fn recycle(
        &self,
        connection: &mut D::Connection,
        _metrics: &Metrics,
    ) -> RecycleResult<Error> {
        if connection.in_transaction() {
            log::warn!("A connection came back to the pool inside a transaction, rolling it back");
            connection.rollback().await.map_err(RecycleError::Backend)?;
        }
        connection.ping().await.map_err(RecycleError::Backend)
    }
}

/// Build a pool holding at most `max_size` connections to `url`.
pub fn build_pool<D: Driver>(url: &str, max_size: usize) -> Result<Pool<D>> {
    managed::Pool::builder(ConnectionManager::<D>::new(url))
        .max_size(max_size)
        .build()
        .map_err(|e| Error::msg(format!("Could not build the connection pool: {}", e)))
}

/// Check a connection out of the pool.
pub async fn acquire<D: Driver>(pool: &Pool<D>) -> Result<PooledConnection<D>> {
    pool.get().await.map_err(|e| match e {
        PoolError::Backend(e) => e,
        e => Error::msg(format!("Could not obtain a connection from the pool: {}", e)),
    })
}
