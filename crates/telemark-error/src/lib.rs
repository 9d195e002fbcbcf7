use thiserror::Error;

/// Primary error type for Telemark operations.
///
/// Structured variants for the conditions that cross an API boundary. Most
/// diagnostic conditions inside the meta-index are *not* errors: unsupported
/// or mistyped predicates are logged and widened to a sound candidate set
/// instead of failing the request. The only lookup failure a caller can
/// observe is [`TelemarkError::InvalidExpression`].
#[derive(Error, Debug)]
pub enum TelemarkError {
    // === Expression errors ===
    /// An empty (nil) expression node reached the meta-index. The upstream
    /// parser normalises expressions, so this indicates a caller bug.
    #[error("invalid expression: empty (nil) node")]
    InvalidExpression,

    // === Value conversion errors ===
    /// A numeric value could not be narrowed without changing it.
    #[error("cannot narrow {value} from {from} to {to} without losing value")]
    NumericNarrowing {
        from: &'static str,
        to: &'static str,
        value: String,
    },

    /// A string could not be parsed as a data value.
    #[error("cannot parse '{input}' as {expected}")]
    ParseData {
        input: String,
        expected: &'static str,
    },

    /// A pattern literal failed to compile.
    #[error("invalid pattern '{pattern}': {detail}")]
    PatternSyntax { pattern: String, detail: String },

    // === Query surface errors ===
    /// The meta-index mailbox has shut down; no further requests can be
    /// delivered.
    #[error("meta-index mailbox is closed")]
    MailboxClosed,

    // === Schema errors ===
    /// Two schemas bind the same name to structurally different types.
    #[error("type clash: cannot accommodate two types with the same name: {name}")]
    SchemaClash { name: String },
}

/// Convenience alias used across the Telemark crates.
pub type Result<T> = std::result::Result<T, TelemarkError>;
