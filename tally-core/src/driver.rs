use crate::{Connection, Dialect, SqlWriter};

pub trait Driver: Send + Sync + 'static {
    type Connection: Connection;

    /// URL scheme accepted by [`Connection::connect`].
    const NAME: &'static str;

    const DIALECT: Dialect;

    fn sql_writer() -> &'static dyn SqlWriter {
        Self::DIALECT.writer()
    }
}
