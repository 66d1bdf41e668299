use crate::TransactionState;
use thiserror::Error;

/// Failures raised by the engine itself, as opposed to the ones reported by the database.
///
/// They travel inside [`crate::Error`] and can be recovered with `downcast_ref::<EngineError>()`.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A WHERE clause would be empty and the caller did not opt into an unscoped operation.
    #[error("refusing to run an unscoped {operation} on `{table}`: no key column was bound")]
    UnscopedOperation {
        operation: &'static str,
        table: String,
    },

    /// The entity does not declare a key column.
    #[error("entity `{0}` declares no key column")]
    MissingKey(String),

    /// A raw SQL template references an argument that was not supplied.
    #[error("template references parameter {{{index}}} but only {provided} arguments were supplied")]
    MissingParameter { index: usize, provided: usize },

    /// A column name does not belong to the entity.
    #[error("column `{column}` does not exist on `{table}`")]
    UnknownColumn { table: &'static str, column: String },

    /// A value could not be converted to the requested type.
    #[error("cannot convert {value} to {target}")]
    Conversion { value: String, target: &'static str },

    /// The operation requires an open transaction.
    #[error("the transaction is already {0}")]
    TransactionFinalized(TransactionState),

    /// The dialect does not support the requested construct.
    #[error("the {dialect} dialect does not support {feature}")]
    Unsupported {
        dialect: &'static str,
        feature: &'static str,
    },
}
