use regex::Regex;
use lazy_static::lazy_static;
use crate::utils::{quote, error};
use crate::error::IdlError;

lazy_static! {
    pub static ref TOKEN_REGEX: Regex = Regex::new(concat!(
        r"(/\*[\s\S]*?\*/|//[^\n]*|\s+",
        r"|\[\[[^\]]*\]\]",
        r"|::|-?\.?\d(?:[eEpP][+-]|[\w.])*|\b[A-Za-z_][A-Za-z0-9_]*\b",
        r#"|"(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'"#,
        r"|\S)",
    )).unwrap();
    pub static ref SKIPPED_RX: Regex = Regex::new(r"^(/\*[\s\S]*\*/|//.*|\s+)$").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text:   String,
    pub line:   usize,
    pub column: usize,
    /// Byte offset of the token in the source text.
    pub offset: usize,
}

/// Splits IDL text into tokens, dropping whitespace and comments.
/// The returned vector always ends with an empty end-of-file token.
pub fn tokenize_schema(text: &str) -> Result<Vec<Token>, IdlError> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut column = 1;
    let mut last_end = 0;

    for mat in TOKEN_REGEX.find_iter(text) {
        let start = mat.start();
        let end   = mat.end();
        let part  = mat.as_str();

        if start > last_end {
            let unexpected = &text[last_end..start];
            return Err(error(
                &format!("Syntax error: {}", quote(unexpected)),
                line,
                column,
            ));
        }

        if !SKIPPED_RX.is_match(part) {
            tokens.push(Token {
                text:   part.to_string(),
                line,
                column,
                offset: start,
            });
        }

        let newline_count = part.matches('\n').count();
        if newline_count > 0 {
            line += newline_count;
            if let Some(last_line_part) = part.split('\n').last() {
                column = last_line_part.len() + 1;
            }
        } else {
            column += part.len();
        }

        last_end = end;
    }

    if last_end != text.len() {
        let unexpected = &text[last_end..];
        return Err(error(
            &format!("Syntax error: {}", quote(unexpected)),
            line,
            column,
        ));
    }

    tokens.push(Token {
        text:   "".to_string(),
        line,
        column,
        offset: text.len(),
    });
    Ok(tokens)
}
