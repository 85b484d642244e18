use std::fmt;

use crate::token::Position;

#[derive(Debug)]
pub enum SiftErrorType {
    ScanError,
    SyntaxError,
    TypeError,
}

/// An error raised while compiling or applying a filter. Scan and syntax
/// errors carry the source position they were raised at; type errors are
/// runtime failures and carry none.
#[derive(Debug)]
pub struct SiftError {
    pub error: SiftErrorType,
    pub msg: String,
    pub pos: Option<Position>,
    pub name: Option<String>,
}

impl SiftError {
    pub fn new(error: SiftErrorType, msg: String, pos: Option<Position>) -> Self {
        Self {
            error,
            msg,
            pos,
            name: None,
        }
    }

    pub fn scan(msg: String, pos: Position) -> Self {
        Self::new(SiftErrorType::ScanError, msg, Some(pos))
    }

    pub fn syntax(msg: String, pos: Position) -> Self {
        Self::new(SiftErrorType::SyntaxError, msg, Some(pos))
    }

    pub fn typ(msg: String) -> Self {
        Self::new(SiftErrorType::TypeError, msg, None)
    }

    /// Attaches the file name used when rendering the error position.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

impl std::error::Error for SiftError {}

impl fmt::Display for SiftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.pos) {
            (Some(name), Some(pos)) => write!(f, "{}:{}: {}", name, pos, self.msg),
            (None, Some(pos)) => write!(f, "{}: {}", pos, self.msg),
            _ => write!(f, "{}", self.msg),
        }
    }
}
