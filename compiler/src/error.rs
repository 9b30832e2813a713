use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error at line {line}, column {column}: {msg}")]
    ParseError {
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("Failed to resolve type reference for {0}")]
    UnresolvedType(String),

    #[error("Unsupported {context} type {type_name}")]
    UnsupportedType {
        context:   String,
        type_name: String,
    },

    #[error("The name {name} is defined twice in {scope}")]
    DuplicateDefinition {
        name:  String,
        scope: String,
    },

    #[error("Writable types depend on each other in a cycle: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),
}
