use crate::{Error, Result, Value, as_value::conversion_error};
use serde::{Serialize, de::DeserializeOwned};
use std::any;

/// Translates a field between its in-memory type and the value stored in the column.
pub trait Converter<T> {
    /// Type prototype of the stored column.
    fn storage_type() -> Value;
    fn to_storage(value: &T) -> Result<Value>;
    fn from_storage(value: Value) -> Result<T>;
}

/// Stores any serde type as JSON text.
pub struct Json;

impl<T: Serialize + DeserializeOwned> Converter<T> for Json {
    fn storage_type() -> Value {
        Value::Varchar(None)
    }
    fn to_storage(value: &T) -> Result<Value> {
        serde_json::to_string(value)
            .map(|v| Value::Varchar(Some(v)))
            .map_err(|e| {
                Error::new(e).context(format!(
                    "Cannot serialize {} as json",
                    any::type_name::<T>()
                ))
            })
    }
    fn from_storage(value: Value) -> Result<T> {
        let result = match &value {
            Value::Varchar(Some(v)) => serde_json::from_str(v),
            Value::Blob(Some(v)) => serde_json::from_slice(v),
            _ => return Err(conversion_error::<T>(&value)),
        };
        result.map_err(|e| {
            Error::new(e).context(format!(
                "Cannot deserialize {} from json",
                any::type_name::<T>()
            ))
        })
    }
}

/// Stores a field-less enum as its integer discriminant.
pub struct Discriminant;

impl<T> Converter<T> for Discriminant
where
    T: Copy + Into<i64> + TryFrom<i64>,
{
    fn storage_type() -> Value {
        Value::Int64(None)
    }
    fn to_storage(value: &T) -> Result<Value> {
        Ok(Value::Int64(Some((*value).into())))
    }
    fn from_storage(value: Value) -> Result<T> {
        let discriminant = <i64 as crate::AsValue>::try_from_value(value)?;
        T::try_from(discriminant).map_err(|_| {
            Error::msg(format!(
                "{} is not a valid discriminant of {}",
                discriminant,
                any::type_name::<T>()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Settings {
        volume: u8,
        tags: Vec<String>,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Role {
        Member = 1,
        Moderator = 2,
    }

    impl From<Role> for i64 {
        fn from(value: Role) -> Self {
            value as i64
        }
    }

    impl TryFrom<i64> for Role {
        type Error = ();
        fn try_from(value: i64) -> std::result::Result<Self, ()> {
            match value {
                1 => Ok(Role::Member),
                2 => Ok(Role::Moderator),
                _ => Err(()),
            }
        }
    }

    #[test]
    fn json() {
        let settings = Settings {
            volume: 3,
            tags: vec!["a".into()],
        };
        let stored = <Json as Converter<Settings>>::to_storage(&settings).unwrap();
        assert_eq!(
            stored,
            Value::Varchar(Some(r#"{"volume":3,"tags":["a"]}"#.into()))
        );
        let back: Settings = <Json as Converter<Settings>>::from_storage(stored).unwrap();
        assert_eq!(back, settings);
        assert!(<Json as Converter<Settings>>::from_storage(Value::Int64(Some(1))).is_err());
    }

    #[test]
    fn discriminant() {
        let stored = <Discriminant as Converter<Role>>::to_storage(&Role::Moderator).unwrap();
        assert_eq!(stored, Value::Int64(Some(2)));
        let role: Role =
            <Discriminant as Converter<Role>>::from_storage(Value::Int32(Some(1))).unwrap();
        assert_eq!(role, Role::Member);
        assert!(<Discriminant as Converter<Role>>::from_storage(Value::Int64(Some(9))).is_err());
    }
}
