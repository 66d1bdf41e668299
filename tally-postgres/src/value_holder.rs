use bytes::{BufMut, BytesMut};
use postgres_types::{FromSql, IsNull, ToSql, Type, to_sql_checked};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use std::error::Error;
use tally_core::Value;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};
use uuid::Uuid;

type BoxError = Box<dyn Error + Sync + Send>;

/// Carries a [`Value`] across the postgres wire. Parameters are converted to the type the server
/// inferred for their placeholder, so an `i32` can be bound to a `BIGINT` column.
#[derive(Debug)]
pub(crate) struct ValueHolder(pub(crate) Value);

impl From<Value> for ValueHolder {
    fn from(value: Value) -> Self {
        ValueHolder(value)
    }
}

impl<'a> FromSql<'a> for ValueHolder {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Self::from_sql_nullable(ty, Some(raw))
    }
    fn from_sql_null(ty: &Type) -> Result<Self, BoxError> {
        Self::from_sql_nullable(ty, None)
    }
    fn from_sql_nullable(ty: &Type, raw: Option<&'a [u8]>) -> Result<Self, BoxError> {
        macro_rules! to_value {
            ($ty_var:ident, $raw:ident, $($($ty:path)|+ => ($value:path, $source:ty),)+) => {
                match *$ty_var {
                    $($($ty)|+ => $value(match $raw {
                        Some($raw) => Some(<$source>::from_sql($ty_var, $raw)?.into()),
                        None => None,
                    }),)+
                    _ => match $raw {
                        Some(..) => {
                            return Err(format!("Cannot decode the postgres type `{}`", $ty_var).into());
                        }
                        None => Value::Null,
                    },
                }
            };
        }
        let value = match (ty, raw) {
            (&Type::JSONB, Some(raw)) => {
                // Version byte, then the json text
                let text = raw.get(1..).ok_or("Empty jsonb value")?;
                Value::Varchar(Some(std::str::from_utf8(text)?.to_string()))
            }
            (&Type::JSON, Some(raw)) => Value::Varchar(Some(std::str::from_utf8(raw)?.to_string())),
            (&Type::INT2, Some(raw)) => Value::Int32(Some(i16::from_sql(ty, raw)?.into())),
            (&Type::FLOAT4, Some(raw)) => Value::Float64(Some(f32::from_sql(ty, raw)?.into())),
            _ => to_value!(ty, raw,
                Type::BOOL => (Value::Boolean, bool),
                Type::INT2 | Type::INT4 => (Value::Int32, i32),
                Type::INT8 => (Value::Int64, i64),
                Type::FLOAT4 | Type::FLOAT8 => (Value::Float64, f64),
                Type::NUMERIC => (Value::Decimal, Decimal),
                Type::VARCHAR
                | Type::TEXT
                | Type::NAME
                | Type::BPCHAR
                | Type::JSON
                | Type::JSONB
                | Type::UNKNOWN => (Value::Varchar, String),
                Type::BYTEA => (Value::Blob, Vec<u8>),
                Type::DATE => (Value::Date, Date),
                Type::TIMESTAMP => (Value::Timestamp, PrimitiveDateTime),
                Type::TIMESTAMPTZ => (Value::TimestampWithTimezone, OffsetDateTime),
                Type::UUID => (Value::Uuid, Uuid),
            ),
        };
        Ok(value.into())
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn mismatch(value: &Value, ty: &Type) -> BoxError {
    format!("Cannot bind {:?} to a parameter of type `{}`", value, ty).into()
}

fn write_text(text: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::JSON => out.put_slice(text.as_bytes()),
        Type::JSONB => {
            out.put_u8(1);
            out.put_slice(text.as_bytes());
        }
        Type::UUID => return text.parse::<Uuid>()?.to_sql(ty, out),
        Type::NUMERIC => return text.parse::<Decimal>()?.to_sql(ty, out),
        _ => return text.to_sql(ty, out),
    }
    Ok(IsNull::No)
}

fn write_integer(value: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(value)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(value)?.to_sql(ty, out),
        Type::INT8 => value.to_sql(ty, out),
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        Type::FLOAT8 => (value as f64).to_sql(ty, out),
        Type::NUMERIC => Decimal::from(value).to_sql(ty, out),
        Type::BOOL => (value != 0).to_sql(ty, out),
        _ => write_text(&value.to_string(), ty, out),
    }
}

impl ToSql for ValueHolder {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError>
    where
        Self: Sized,
    {
        if self.0.is_null() {
            return Ok(IsNull::Yes);
        }
        match &self.0 {
            Value::Boolean(Some(v)) if *ty == Type::BOOL => v.to_sql(ty, out),
            Value::Boolean(Some(v)) => write_integer(*v as i64, ty, out),
            Value::Int32(Some(v)) => write_integer(*v as i64, ty, out),
            Value::Int64(Some(v)) => write_integer(*v, ty, out),
            Value::Float64(Some(v)) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => v.to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*v)?.to_sql(ty, out),
                _ => write_text(&v.to_string(), ty, out),
            },
            Value::Decimal(Some(v)) => match *ty {
                Type::NUMERIC => v.to_sql(ty, out),
                Type::FLOAT8 => v
                    .to_f64()
                    .ok_or_else(|| mismatch(&self.0, ty))?
                    .to_sql(ty, out),
                Type::INT8 => v
                    .to_i64()
                    .ok_or_else(|| mismatch(&self.0, ty))?
                    .to_sql(ty, out),
                _ => write_text(&v.to_string(), ty, out),
            },
            Value::Varchar(Some(v)) => write_text(v, ty, out),
            Value::Blob(Some(v)) => v.as_ref().to_sql(ty, out),
            Value::Date(Some(v)) => v.to_sql(ty, out),
            Value::Timestamp(Some(v)) => match *ty {
                Type::TIMESTAMPTZ => v.assume_utc().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::TimestampWithTimezone(Some(v)) => match *ty {
                Type::TIMESTAMP => {
                    let utc = v.to_offset(UtcOffset::UTC);
                    PrimitiveDateTime::new(utc.date(), utc.time()).to_sql(ty, out)
                }
                _ => v.to_sql(ty, out),
            },
            Value::Uuid(Some(v)) => match *ty {
                Type::UUID => v.to_sql(ty, out),
                _ => write_text(&v.to_string(), ty, out),
            },
            v => Err(mismatch(v, ty)),
        }
    }

    fn accepts(_ty: &Type) -> bool
    where
        Self: Sized,
    {
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(value: Value, ty: &Type) -> Result<BytesMut, BoxError> {
        let mut out = BytesMut::new();
        ValueHolder(value).to_sql(ty, &mut out)?;
        Ok(out)
    }

    #[test]
    fn integers_follow_the_parameter_type() {
        let out = bind(Value::Int32(Some(5)), &Type::INT8).unwrap();
        assert_eq!(&out[..], &5i64.to_be_bytes());
        let out = bind(Value::Int64(Some(5)), &Type::INT4).unwrap();
        assert_eq!(&out[..], &5i32.to_be_bytes());
        assert!(bind(Value::Int64(Some(i64::MAX)), &Type::INT4).is_err());
        let out = bind(Value::Boolean(Some(true)), &Type::BOOL).unwrap();
        assert_eq!(&out[..], &[1]);
    }

    #[test]
    fn nulls_and_text() {
        let mut out = BytesMut::new();
        let is_null = ValueHolder(Value::Int64(None))
            .to_sql(&Type::TEXT, &mut out)
            .unwrap();
        assert!(matches!(is_null, IsNull::Yes));
        let out = bind(Value::Varchar(Some("{}".into())), &Type::JSONB).unwrap();
        assert_eq!(&out[..], b"\x01{}");
    }

    #[test]
    fn decode() {
        let value = ValueHolder::from_sql(&Type::INT2, &7i16.to_be_bytes()).unwrap();
        assert_eq!(value.0, Value::Int32(Some(7)));
        let value = ValueHolder::from_sql(&Type::TEXT, b"tally").unwrap();
        assert_eq!(value.0, Value::Varchar(Some("tally".into())));
        let value = ValueHolder::from_sql_null(&Type::INT8).unwrap();
        assert_eq!(value.0, Value::Int64(None));
        let value = ValueHolder::from_sql(&Type::JSONB, b"\x01[1]").unwrap();
        assert_eq!(value.0, Value::Varchar(Some("[1]".into())));
        assert!(ValueHolder::from_sql(&Type::POINT, &[0; 16]).is_err());
    }
}
