use crate::{Result, RowLabeled, Value};

/// How conversion failures are handled while mapping a row.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingMode {
    /// Log the failure and keep the field default.
    #[default]
    Lenient,
    /// Return the failure to the caller.
    Strict,
}

/// Decode `column` from `row` into `target`.
///
/// A column absent from the row leaves `target` untouched, a null that `decode` refuses resets
/// it to its default. Other failures follow `mode`.
pub fn map_column<T: Default>(
    row: &RowLabeled,
    column: &str,
    mode: MappingMode,
    target: &mut T,
    decode: impl FnOnce(Value) -> Result<T>,
) -> Result<()> {
    let Some(value) = row.get_column(column) else {
        return Ok(());
    };
    let is_null = value.is_null();
    match decode(value.clone()) {
        Ok(v) => *target = v,
        Err(..) if is_null => *target = T::default(),
        Err(e) => match mode {
            MappingMode::Lenient => {
                log::warn!(
                    "Column `{}` could not be mapped, keeping the default value: {:#}",
                    column,
                    e
                );
                *target = T::default();
            }
            MappingMode::Strict => {
                return Err(e.context(format!("While mapping the column `{}`", column)));
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AsValue;
    use std::sync::Arc;

    fn row() -> RowLabeled {
        RowLabeled::new(
            Arc::from(vec!["id".to_string(), "credit".to_string(), "name".to_string()]),
            vec![
                Value::Int64(Some(7)),
                Value::Varchar(Some("many".into())),
                Value::Varchar(None),
            ]
            .into_boxed_slice(),
        )
    }

    #[test]
    fn missing_column_keeps_value() {
        let mut value = 13i64;
        map_column(&row(), "absent", MappingMode::Strict, &mut value, i64::try_from_value)
            .unwrap();
        assert_eq!(value, 13);
    }

    #[test]
    fn lenient_failure_defaults() {
        let mut value = 13i64;
        map_column(&row(), "credit", MappingMode::Lenient, &mut value, i64::try_from_value)
            .unwrap();
        assert_eq!(value, 0);
    }

    #[test]
    fn strict_failure_errors() {
        let mut value = 13i64;
        let result = map_column(
            &row(),
            "credit",
            MappingMode::Strict,
            &mut value,
            i64::try_from_value,
        );
        assert!(result.is_err());
    }

    #[test]
    fn null_maps_to_default() {
        let mut name = "previous".to_string();
        map_column(&row(), "name", MappingMode::Strict, &mut name, String::try_from_value)
            .unwrap();
        assert_eq!(name, "");
        let mut name = Some("previous".to_string());
        map_column(
            &row(),
            "name",
            MappingMode::Strict,
            &mut name,
            Option::<String>::try_from_value,
        )
        .unwrap();
        assert_eq!(name, None);
    }
}
