use crate::{Executor, IsolationLevel, Result};
use std::future::Future;

/// A single physical connection, able to run one transaction at a time.
pub trait Connection: Executor + Sized + 'static {
    /// Open a connection to the given URL.
    fn connect(url: &str) -> impl Future<Output = Result<Self>> + Send;

    /// Whether a transaction begun on this connection is still open.
    fn in_transaction(&self) -> bool;

    fn begin(
        &mut self,
        isolation: Option<IsolationLevel>,
    ) -> impl Future<Output = Result<()>> + Send;

    fn commit(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn rollback(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Cheap liveness check used when a pooled connection is recycled.
    fn ping(&mut self) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}
