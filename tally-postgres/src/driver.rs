use crate::PostgresConnection;
use tally_core::{Dialect, Driver};

#[derive(Default, Debug, Clone, Copy)]
pub struct PostgresDriver {}

impl PostgresDriver {
    pub const fn new() -> Self {
        Self {}
    }
}

impl Driver for PostgresDriver {
    type Connection = PostgresConnection;

    const NAME: &'static str = "postgres";
    const DIALECT: Dialect = Dialect::Postgres;
}
