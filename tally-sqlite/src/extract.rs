use rusqlite::{
    ToSql,
    types::{ToSqlOutput, ValueRef},
};
use std::str;
use tally_core::{Error, Result, Value};
use time::{format_description::well_known::Rfc3339, macros::format_description};

/// Bound parameter. Types without a native SQLite storage class are written as text.
pub(crate) struct SqliteParam<'a>(pub(crate) &'a Value);

fn conversion_failure(error: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(error))
}

impl ToSql for SqliteParam<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as Sql;
        if self.0.is_null() {
            return Ok(ToSqlOutput::Owned(Sql::Null));
        }
        Ok(match self.0 {
            Value::Boolean(Some(v)) => ToSqlOutput::Owned(Sql::Integer(*v as i64)),
            Value::Int32(Some(v)) => ToSqlOutput::Owned(Sql::Integer(*v as i64)),
            Value::Int64(Some(v)) => ToSqlOutput::Owned(Sql::Integer(*v)),
            Value::Float64(Some(v)) => ToSqlOutput::Owned(Sql::Real(*v)),
            Value::Decimal(Some(v)) => ToSqlOutput::Owned(Sql::Text(v.to_string())),
            Value::Varchar(Some(v)) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Value::Blob(Some(v)) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
            Value::Date(Some(v)) => ToSqlOutput::Owned(Sql::Text(
                v.format(format_description!("[year]-[month]-[day]"))
                    .map_err(conversion_failure)?,
            )),
            Value::Timestamp(Some(v)) => ToSqlOutput::Owned(Sql::Text(
                v.format(format_description!(
                    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]"
                ))
                .map_err(conversion_failure)?,
            )),
            Value::TimestampWithTimezone(Some(v)) => ToSqlOutput::Owned(Sql::Text(
                v.format(&Rfc3339).map_err(conversion_failure)?,
            )),
            Value::Uuid(Some(v)) => ToSqlOutput::Owned(Sql::Text(v.to_string())),
            _ => ToSqlOutput::Owned(Sql::Null),
        })
    }
}

/// Cell of a result row. SQLite only knows integers, reals, text and blobs: the other types are
/// recovered by the lenient conversions of `AsValue`.
pub(crate) fn extract_value(value: ValueRef<'_>) -> Result<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Int64(Some(v)),
        ValueRef::Real(v) => Value::Float64(Some(v)),
        ValueRef::Text(v) => Value::Varchar(Some(
            str::from_utf8(v)
                .map_err(|e| Error::new(e).context("A text column is not valid UTF-8"))?
                .to_string(),
        )),
        ValueRef::Blob(v) => Value::Blob(Some(v.into())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{AsValue, UNSET_TIMESTAMP};
    use time::macros::datetime;

    fn text(value: &Value) -> String {
        match SqliteParam(value).to_sql().unwrap() {
            ToSqlOutput::Owned(rusqlite::types::Value::Text(v)) => v,
            ToSqlOutput::Borrowed(ValueRef::Text(v)) => str::from_utf8(v).unwrap().to_string(),
            other => panic!("Unexpected output {:?}", other),
        }
    }

    #[test]
    fn timestamps_round_trip_through_text() {
        let timestamp = datetime!(2024-03-01 12:30:05.25);
        let stored = text(&timestamp.as_value());
        assert_eq!(stored, "2024-03-01 12:30:05.250000");
        let read = extract_value(ValueRef::Text(stored.as_bytes())).unwrap();
        assert_eq!(
            time::PrimitiveDateTime::try_from_value(read).unwrap(),
            timestamp
        );
        assert_ne!(timestamp, UNSET_TIMESTAMP);
    }

    #[test]
    fn booleans_are_integers() {
        assert!(matches!(
            SqliteParam(&Value::Boolean(Some(true))).to_sql().unwrap(),
            ToSqlOutput::Owned(rusqlite::types::Value::Integer(1))
        ));
        assert!(matches!(
            SqliteParam(&Value::Int32(None)).to_sql().unwrap(),
            ToSqlOutput::Owned(rusqlite::types::Value::Null)
        ));
        let read = extract_value(ValueRef::Integer(0)).unwrap();
        assert!(!bool::try_from_value(read).unwrap());
    }
}
