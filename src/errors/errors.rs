use std::fmt::Display;

use thiserror::Error;

use crate::Position;

/// How a failure is classified; each kind maps to its own process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Semantic,
    Internal,
    Fatal,
}

impl ErrorKind {
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorKind::Syntax => 1,
            ErrorKind::Semantic => 2,
            ErrorKind::Internal => -1,
            ErrorKind::Fatal => -2,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Syntax => write!(f, "Syntax error"),
            ErrorKind::Semantic => write!(f, "Semantic error"),
            ErrorKind::Internal => write!(f, "Internal error"),
            ErrorKind::Fatal => write!(f, "Fatal error"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    /// Attaches the parser's current position, keeping an already known one.
    pub fn at(mut self, position: &Position) -> Self {
        if self.position.is_null() {
            self.position = position.clone();
        }
        self
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_impl(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn get_kind(&self) -> ErrorKind {
        match &self.internal_error {
            ErrorImpl::Syntax { .. } => ErrorKind::Syntax,
            ErrorImpl::DuplicateIdentifier { .. }
            | ErrorImpl::UnknownIdentifier { .. }
            | ErrorImpl::SignatureMismatch { .. } => ErrorKind::Semantic,
            ErrorImpl::FunctionAlreadyComplete { .. } => ErrorKind::Fatal,
            ErrorImpl::Internal { .. } | ErrorImpl::DoubleBackpatch { .. } => {
                ErrorKind::Internal
            }
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.get_kind().exit_code()
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::Syntax { .. } => "Syntax",
            ErrorImpl::DuplicateIdentifier { .. } => "DuplicateIdentifier",
            ErrorImpl::UnknownIdentifier { .. } => "UnknownIdentifier",
            ErrorImpl::SignatureMismatch { .. } => "SignatureMismatch",
            ErrorImpl::FunctionAlreadyComplete { .. } => "FunctionAlreadyComplete",
            ErrorImpl::DoubleBackpatch { .. } => "DoubleBackpatch",
            ErrorImpl::Internal { .. } => "Internal",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::Syntax { .. } => ErrorTip::None,
            ErrorImpl::DuplicateIdentifier { name } => {
                ErrorTip::Suggestion(format!("`{}` is already declared in this scope", name))
            }
            ErrorImpl::UnknownIdentifier { name } => {
                ErrorTip::Suggestion(format!("`{}` is not declared in any enclosing scope", name))
            }
            ErrorImpl::SignatureMismatch { function, reason } => ErrorTip::Suggestion(format!(
                "definition of `{}` must repeat its forward declaration: {}",
                function, reason
            )),
            ErrorImpl::FunctionAlreadyComplete { .. } => ErrorTip::None,
            ErrorImpl::DoubleBackpatch { .. } => ErrorTip::None,
            ErrorImpl::Internal { .. } => ErrorTip::None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.position.is_null() {
            write!(f, "{}, {}", self.get_kind(), self.internal_error)
        } else {
            write!(f, "{}: {}, {}", self.position, self.get_kind(), self.internal_error)
        }
    }
}

impl std::error::Error for Error {}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    #[error("syntax error: {message}")]
    Syntax { message: String },
    #[error("duplicate identifier: {name}")]
    DuplicateIdentifier { name: String },
    #[error("unknown identifier: {name}")]
    UnknownIdentifier { name: String },
    #[error("{reason} in redeclaration of function {function}")]
    SignatureMismatch { function: String, reason: String },
    #[error("cannot add a parameter to already defined function {function}")]
    FunctionAlreadyComplete { function: String },
    #[error("quad {label} has no pending target to backpatch")]
    DoubleBackpatch { label: u32 },
    #[error("{message}")]
    Internal { message: String },
}
