use std::fmt;

/// User-facing input errors: surfaced to the REPL, the loop continues.
#[derive(Debug)]
pub enum UserError {
    NegativeId,
    StringTooLong,
    SyntaxError,
    UnrecognizedStatement(String),
    DuplicateKey,
    TableFull,
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UserError::NegativeId => write!(f, "ID must be positive."),
            UserError::StringTooLong => write!(f, "String is too long."),
            UserError::SyntaxError => write!(f, "Syntax error. Could not parse statement."),
            UserError::UnrecognizedStatement(input) => {
                write!(f, "Unrecognized keyword at start of '{}'.", input)
            }
            UserError::DuplicateKey => write!(f, "Error: Duplicate key."),
            UserError::TableFull => write!(f, "Error: Table full."),
        }
    }
}

/// Top-level error type for the storage engine and its REPL.
///
/// `User` errors are recoverable: the REPL prints them and keeps looping.
/// Every other variant is fatal and is only ever handled at `main`.
#[derive(Debug)]
pub enum Error {
    User(UserError),
    Io(std::io::Error),
    Corrupt(String),
    Fatal(String),
}

impl Error {
    /// Fatal process-terminating errors carry a diagnostic line and exit
    /// status 1; `User` errors do not terminate the process.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::User(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::User(e) => write!(f, "{}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Corrupt(msg) => write!(f, "corrupt file: {}", msg),
            Error::Fatal(msg) => write!(f, "fatal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<UserError> for Error {
    fn from(err: UserError) -> Error {
        Error::User(err)
    }
}

/// Raises a fatal, process-terminating error with a formatted message,
/// the uniform channel that replaces the source's scattered `exit(1)` calls.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)*) => {
        return Err($crate::errors::Error::Fatal(format!($($arg)*)))
    };
}
