use crate::error::IdlError;

pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

pub fn error(msg: &str, line: usize, column: usize) -> IdlError {
    IdlError::ParseError {
        msg: msg.to_string(),
        line,
        column,
    }
}

/// Appends `text` followed by a newline.
pub fn emit(out: &mut String, text: &str) {
    out.push_str(text);
    out.push('\n');
}
