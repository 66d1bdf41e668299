use crate::{
    CacheAction, CacheLayer, Connection, Driver, EngineError, PooledConnection, Result,
};
use std::fmt::{self, Display};
use tokio::runtime::Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Open,
    Committed,
    RolledBack,
}

impl Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransactionState::Open => "open",
            TransactionState::Committed => "committed",
            TransactionState::RolledBack => "rolled back",
        })
    }
}

enum Inner<'t, D: Driver> {
    /// Opened its own connection and owns commit, rollback and release.
    Owning {
        connection: Option<PooledConnection<D>>,
        cache: CacheLayer,
        pending: Vec<CacheAction>,
        runtime: Option<Handle>,
    },
    /// View over a transaction owned by someone else.
    Borrowed {
        connection: &'t mut D::Connection,
        pending: &'t mut Vec<CacheAction>,
    },
}

/// Handle over a database transaction.
///
/// The state moves from open to committed or rolled back exactly once, further calls to
/// [`Transaction::commit`] or [`Transaction::rollback`] are no-ops. A view created with
/// [`Transaction::view`] tracks its own state but never commits, rolls back or releases the
/// underlying transaction.
///
/// Cache changes caused by writes are queued on the owning handle and applied only after its
/// commit succeeded, a rollback discards them. An owning handle dropped while still open rolls
/// back before its connection goes back to the pool.
pub struct Transaction<'t, D: Driver> {
    inner: Inner<'t, D>,
    state: TransactionState,
}

impl<D: Driver> Transaction<'static, D> {
    pub(crate) fn owning(connection: PooledConnection<D>, cache: CacheLayer) -> Self {
        Self {
            inner: Inner::Owning {
                connection: Some(connection),
                cache,
                pending: Vec::new(),
                runtime: Handle::try_current().ok(),
            },
            state: TransactionState::Open,
        }
    }
}

impl<'t, D: Driver> Transaction<'t, D> {
    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == TransactionState::Open
    }

    pub fn is_owner(&self) -> bool {
        matches!(self.inner, Inner::Owning { .. })
    }

    /// A non owning handle over the same transaction.
    pub fn view(&mut self) -> Result<Transaction<'_, D>> {
        let state = self.state;
        let (connection, pending) = match &mut self.inner {
            Inner::Owning {
                connection: Some(connection),
                pending,
                ..
            } => (&mut **connection, pending),
            Inner::Owning {
                connection: None, ..
            } => return Err(EngineError::TransactionFinalized(state).into()),
            Inner::Borrowed {
                connection,
                pending,
            } => (&mut **connection, &mut **pending),
        };
        Ok(Transaction {
            inner: Inner::Borrowed {
                connection,
                pending,
            },
            state,
        })
    }

    /// The connection the statements of this transaction run on.
    pub fn connection(&mut self) -> Result<&mut D::Connection> {
        if self.state != TransactionState::Open {
            return Err(EngineError::TransactionFinalized(self.state).into());
        }
        match &mut self.inner {
            Inner::Owning { connection, .. } => connection
                .as_deref_mut()
                .ok_or_else(|| EngineError::TransactionFinalized(self.state).into()),
            Inner::Borrowed { connection, .. } => Ok(&mut **connection),
        }
    }

    /// Queue cache changes to apply once the owning transaction commits.
    pub fn defer(&mut self, actions: impl IntoIterator<Item = CacheAction>) {
        match &mut self.inner {
            Inner::Owning { pending, .. } => pending.extend(actions),
            Inner::Borrowed { pending, .. } => pending.extend(actions),
        }
    }

    pub async fn commit(&mut self) -> Result<()> {
        if self.state != TransactionState::Open {
            return Ok(());
        }
        if let Inner::Owning {
            connection: Some(connection),
            cache,
            pending,
            ..
        } = &mut self.inner
        {
            if let Err(e) = connection.commit().await {
                self.state = TransactionState::RolledBack;
                pending.clear();
                return Err(e);
            }
            cache.apply(pending.drain(..));
            log::debug!("Transaction committed");
        }
        self.state = TransactionState::Committed;
        Ok(())
    }

    pub async fn rollback(&mut self) -> Result<()> {
        if self.state != TransactionState::Open {
            return Ok(());
        }
        self.state = TransactionState::RolledBack;
        if let Inner::Owning {
            connection: Some(connection),
            pending,
            ..
        } = &mut self.inner
        {
            pending.clear();
            connection.rollback().await?;
            log::debug!("Transaction rolled back");
        }
        Ok(())
    }
}

impl<'t, D: Driver> Drop for Transaction<'t, D> {
    fn drop(&mut self) {
        if self.state != TransactionState::Open {
            return;
        }
        let Inner::Owning {
            connection,
            runtime,
            ..
        } = &mut self.inner
        else {
            return;
        };
        let Some(mut connection) = connection.take() else {
            return;
        };
        match runtime.take().or_else(|| Handle::try_current().ok()) {
            Some(runtime) => {
                log::debug!("Transaction dropped while open, rolling back");
                runtime.spawn(async move {
                    if let Err(e) = connection.rollback().await {
                        log::error!("{:#}", e.context("While rolling back a dropped transaction"));
                    }
                });
            }
            None => {
                log::warn!(
                    "Transaction dropped while open outside of a runtime, the pool will roll it back"
                );
            }
        }
    }
}
