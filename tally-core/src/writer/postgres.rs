use crate::{
    ColumnDef, DateUnit, SqlWriter, Value,
    writer::Context,
};
use std::fmt::Write;

#[derive(Default, Debug, Clone, Copy)]
pub struct PostgresSqlWriter {}

impl SqlWriter for PostgresSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn name(&self) -> &'static str {
        "postgres"
    }

    fn write_placeholder(&self, context: &mut Context, out: &mut String) {
        context.counter += 1;
        let _ = write!(out, "${}", context.counter);
    }

    fn write_now(&self, _context: &mut Context, out: &mut String) {
        out.push_str("NOW()");
    }

    fn write_date_diff(
        &self,
        _context: &mut Context,
        out: &mut String,
        unit: DateUnit,
        from: &str,
        to: &str,
    ) {
        let _ = write!(
            out,
            "FLOOR(EXTRACT(EPOCH FROM ({} - {})) / {})::BIGINT",
            to,
            from,
            unit.seconds()
        );
    }

    fn write_date_add(
        &self,
        _context: &mut Context,
        out: &mut String,
        unit: DateUnit,
        amount: i64,
        expression: &str,
    ) {
        let _ = write!(
            out,
            "({} + INTERVAL '{} {}')",
            expression,
            amount,
            unit.keyword().to_ascii_lowercase()
        );
    }

    fn write_column_type(&self, _context: &mut Context, out: &mut String, column: &ColumnDef) {
        if let Some(sql_type) = column.sql_type {
            out.push_str(sql_type);
            return;
        }
        out.push_str(match column.value {
            Value::Boolean(..) => "BOOLEAN",
            Value::Int32(..) => "INTEGER",
            Value::Int64(..) => "BIGINT",
            Value::Float64(..) => "DOUBLE PRECISION",
            Value::Decimal(..) => "NUMERIC",
            Value::Varchar(..) | Value::Null => "TEXT",
            Value::Blob(..) => "BYTEA",
            Value::Date(..) => "DATE",
            Value::Timestamp(..) => "TIMESTAMP",
            Value::TimestampWithTimezone(..) => "TIMESTAMPTZ",
            Value::Uuid(..) => "UUID",
        });
    }
}
