mod context;
mod mysql;
mod postgres;
mod sql_server;
mod sql_writer;
mod sqlite;

pub use context::*;
pub use mysql::*;
pub use postgres::*;
pub use sql_server::*;
pub use sql_writer::*;
pub use sqlite::*;

use std::{fmt, str::FromStr};

static SQL_SERVER: SqlServerSqlWriter = SqlServerSqlWriter {};
static POSTGRES: PostgresSqlWriter = PostgresSqlWriter {};
static SQLITE: SqliteSqlWriter = SqliteSqlWriter {};
static MYSQL: MySqlSqlWriter = MySqlSqlWriter {};

/// Supported SQL dialects. Resolved once per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    SqlServer,
    Postgres,
    Sqlite,
    MySql,
}

impl Dialect {
    pub fn writer(self) -> &'static dyn SqlWriter {
        match self {
            Dialect::SqlServer => &SQL_SERVER,
            Dialect::Postgres => &POSTGRES,
            Dialect::Sqlite => &SQLITE,
            Dialect::MySql => &MYSQL,
        }
    }
    pub fn name(self) -> &'static str {
        self.writer().name()
    }
}

impl FromStr for Dialect {
    type Err = crate::Error;
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "sqlserver" | "mssql" => Ok(Dialect::SqlServer),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "sqlite" => Ok(Dialect::Sqlite),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            _ => Err(crate::Error::msg(format!("Unknown SQL dialect `{}`", value))),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
