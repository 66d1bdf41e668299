use crate::SqliteConnection;
use tally_core::{Dialect, Driver};

#[derive(Default, Debug, Clone, Copy)]
pub struct SqliteDriver {}

impl SqliteDriver {
    pub const fn new() -> Self {
        Self {}
    }
}

impl Driver for SqliteDriver {
    type Connection = SqliteConnection;

    const NAME: &'static str = "sqlite";
    const DIALECT: Dialect = Dialect::Sqlite;
}
