use crate::{
    SqliteDriver,
    extract::{SqliteParam, extract_value},
};
use async_stream::try_stream;
use rusqlite::{OpenFlags, params_from_iter};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tally_core::{
    Connection, Driver, Error, ErrorContext, Executor, IsolationLevel, QueryResult, Result,
    RowLabeled, RowNames, RowsAffected, SqlWriter, Statement, stream::Stream,
};
use tokio::task::spawn_blocking;

/// Name of the in memory database opened by `sqlite://` and `sqlite://:memory:`.
const MEMORY_NAME: &str = "tally-memory";

/// Options decoded from a `sqlite://path?mode=rwc&busy_timeout=5000` url.
///
/// In memory databases are opened in shared cache mode under their name, every connection of a
/// pool sees the same database. It lives as long as one of them stays open.
#[derive(Debug, Clone, PartialEq)]
struct ConnectOptions {
    path: String,
    flags: OpenFlags,
    busy_timeout: Duration,
    memory: bool,
}

fn parse_url(url: &str) -> Result<ConnectOptions> {
    let prefix = format!("{}://", SqliteDriver::NAME);
    let Some(rest) = url.strip_prefix(&prefix) else {
        return Err(Error::msg(format!(
            "Expected sqlite connection url to start with `{}`",
            prefix
        )));
    };
    let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
    let path = urlencoding::decode(path)
        .with_context(|| format!("Error while decoding connection URL: `{}`", url))?
        .into_owned();
    let mut options = ConnectOptions {
        memory: path.is_empty() || path == ":memory:",
        path,
        flags: OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        busy_timeout: Duration::from_secs(5),
    };
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "mode" => {
                let access = match value.as_ref() {
                    "ro" => OpenFlags::SQLITE_OPEN_READ_ONLY,
                    "rw" => OpenFlags::SQLITE_OPEN_READ_WRITE,
                    "rwc" => OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
                    "memory" => {
                        options.memory = true;
                        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
                    }
                    v => {
                        return Err(Error::msg(format!(
                            "Unknown sqlite mode `{}`, expected one of: ro, rw, rwc, memory",
                            v
                        )));
                    }
                };
                options.flags =
                    access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
            }
            "busy_timeout" => {
                let millis = value
                    .parse::<u64>()
                    .with_context(|| format!("Invalid busy_timeout `{}`", value))?;
                options.busy_timeout = Duration::from_millis(millis);
            }
            _ => log::warn!("Ignoring the unknown sqlite url parameter `{}`", key),
        }
    }
    if options.memory {
        let name = if options.path.is_empty() || options.path == ":memory:" {
            MEMORY_NAME
        } else {
            &options.path
        };
        options.path = format!("file:{}?mode=memory&cache=shared", name);
    }
    Ok(options)
}

fn run_blocking(
    connection: &Mutex<rusqlite::Connection>,
    statement: Statement,
) -> Result<Vec<QueryResult>> {
    let connection = connection
        .lock()
        .map_err(|e| Error::msg(format!("The sqlite connection mutex is poisoned: {}", e)))?;
    let mut prepared = connection.prepare(&statement.sql)?;
    let params = params_from_iter(statement.params.iter().map(SqliteParam));
    let count = prepared.column_count();
    if count == 0 {
        let rows_affected = prepared.execute(params)? as u64;
        return Ok(vec![QueryResult::Affected(RowsAffected {
            rows_affected,
            last_affected_id: Some(connection.last_insert_rowid()),
        })]);
    }
    let labels: RowNames = prepared
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    let mut rows = prepared.query(params)?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let values = (0..count)
            .map(|i| extract_value(row.get_ref(i)?))
            .collect::<Result<Box<[_]>>>()?;
        result.push(QueryResult::Row(RowLabeled::new(labels.clone(), values)));
    }
    Ok(result)
}

/// Connection to a SQLite database file.
///
/// The handle lives behind a mutex and every statement runs on the blocking thread pool. Rows are
/// read entirely before being streamed back.
pub struct SqliteConnection {
    connection: Arc<Mutex<rusqlite::Connection>>,
    transaction: bool,
}

impl SqliteConnection {
    async fn run_command(&mut self, sql: String) -> Result<()> {
        self.execute(Statement::raw(sql)).await.map(|_| ())
    }
}

impl Executor for SqliteConnection {
    fn sql_writer(&self) -> &'static dyn SqlWriter {
        SqliteDriver::sql_writer()
    }

    fn run(&mut self, statement: Statement) -> impl Stream<Item = Result<QueryResult>> + Send {
        let connection = self.connection.clone();
        try_stream! {
            let results = spawn_blocking(move || run_blocking(&connection, statement)).await??;
            for result in results {
                yield result;
            }
        }
    }
}

impl Connection for SqliteConnection {
    async fn connect(url: &str) -> Result<SqliteConnection> {
        let options = parse_url(url)?;
        let connection = spawn_blocking(move || -> Result<rusqlite::Connection> {
            let connection = rusqlite::Connection::open_with_flags(&options.path, options.flags)
                .with_context(|| format!("Could not open the sqlite database `{}`", options.path))?;
            connection.busy_timeout(options.busy_timeout)?;
            if !options.memory {
                connection.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
                connection.pragma_update(None, "synchronous", "NORMAL")?;
            }
            connection.pragma_update(None, "foreign_keys", "ON")?;
            Ok(connection)
        })
        .await??;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            transaction: false,
        })
    }

    fn in_transaction(&self) -> bool {
        self.transaction
    }

    async fn begin(&mut self, isolation: Option<IsolationLevel>) -> Result<()> {
        let mut sql = String::new();
        self.sql_writer().write_transaction_begin(&mut sql, isolation);
        self.run_command(sql).await?;
        self.transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let mut sql = String::new();
        self.sql_writer().write_transaction_commit(&mut sql);
        self.run_command(sql).await?;
        self.transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let mut sql = String::new();
        self.sql_writer().write_transaction_rollback(&mut sql);
        self.transaction = false;
        self.run_command(sql).await
    }

    async fn ping(&mut self) -> Result<()> {
        self.run_command("SELECT 1".into()).await
    }
}
