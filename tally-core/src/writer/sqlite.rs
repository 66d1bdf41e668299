use crate::{
    ColumnDef, DateUnit, IsolationLevel, SqlWriter, Value,
    writer::Context,
};
use std::fmt::Write;

#[derive(Default, Debug, Clone, Copy)]
pub struct SqliteSqlWriter {}

impl SqlWriter for SqliteSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn write_placeholder(&self, context: &mut Context, out: &mut String) {
        context.counter += 1;
        let _ = write!(out, "?{}", context.counter);
    }

    fn write_pagination(
        &self,
        _context: &mut Context,
        out: &mut String,
        limit: Option<u64>,
        offset: Option<u64>,
        _ordered: bool,
    ) {
        match (limit, offset) {
            (Some(limit), _) => {
                let _ = write!(out, " LIMIT {}", limit);
            }
            (None, Some(..)) => out.push_str(" LIMIT -1"),
            (None, None) => {}
        }
        if let Some(offset) = offset {
            let _ = write!(out, " OFFSET {}", offset);
        }
    }

    fn write_lock_clause(&self, _context: &mut Context, _out: &mut String) {
        // The database is locked as a whole by BEGIN IMMEDIATE
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
            "CAST((julianday({}) - julianday({})) * 86400 / {} AS INTEGER)",
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
            "datetime({}, '{:+} {}s')",
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
            Value::Boolean(..) | Value::Int32(..) | Value::Int64(..) => "INTEGER",
            Value::Float64(..) => "REAL",
            Value::Decimal(..) => "NUMERIC",
            Value::Blob(..) => "BLOB",
            _ => "TEXT",
        });
    }

    fn write_generated_key(&self, _context: &mut Context, _out: &mut String) {
        // An INTEGER primary key is an alias of the rowid
    }

    fn write_transaction_begin(&self, out: &mut String, _isolation: Option<IsolationLevel>) {
        out.push_str("BEGIN IMMEDIATE");
    }
}
