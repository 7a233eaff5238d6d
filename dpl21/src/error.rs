//!
//! # Legalizer Result and Error Types
//!
//! Only unusable input and broken internal invariants are errors here.
//! Cells which fail to place and gaps which fail to fill are recorded and reported instead.
//!

// Local imports
use crate::db::DbError;

/// # [DplError] Result Type
pub type DplResult<T> = Result<T, DplError>;

/// Enumerated contexts in which an error arose
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorContext {
    Row(String),
    Site(String),
    Master(String),
    Inst(String),
    Group(String),
    Layer(usize),
}

///
/// # Legalizer Error Enumeration
///
pub enum DplError {
    /// Unusable rows, sites, masters or instances.
    /// Fatal regardless of which entry point discovers it.
    Config {
        message: String,
        context: Vec<ErrorContext>,
    },
    /// Attempt to paint pixels owned by another cell of the same row height.
    /// Always a legalizer defect.
    PaintConflict {
        cell: String,
        other: String,
        layer: usize,
    },
    /// Errors from the design database
    Db(DbError),
    /// Boxed External Errors
    Boxed(Box<dyn std::error::Error + Send + Sync>),
    /// Uncategorized Error, with String Message
    Str(String),
}
impl DplError {
    /// Create a [DplError::Str] from anything String-convertible
    pub fn msg(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }
    /// Create an error-variant [Result] of our [DplError::Str] variant from anything String-convertible
    pub fn fail<T>(s: impl Into<String>) -> Result<T, Self> {
        Err(Self::msg(s))
    }
    /// Create a [DplError::Config]
    pub fn config(message: impl Into<String>, context: Vec<ErrorContext>) -> Self {
        Self::Config {
            message: message.into(),
            context,
        }
    }
}
impl std::fmt::Debug for DplError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DplError::Config { message, context } => {
                write!(f, "Config Error: \n - {} \n - {:?}", message, context)
            }
            DplError::PaintConflict { cell, other, layer } => write!(
                f,
                "Paint Conflict: cannot paint {} on layer {}, already occupied by {}",
                cell, layer, other
            ),
            DplError::Db(err) => std::fmt::Debug::fmt(err, f),
            DplError::Boxed(err) => std::fmt::Debug::fmt(err, f),
            DplError::Str(err) => std::fmt::Display::fmt(err, f),
        }
    }
}
impl std::fmt::Display for DplError {
    /// Delegates to the [Debug] implementation
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
impl std::error::Error for DplError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Boxed(e) => Some(&**e),
            Self::Db(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DbError> for DplError {
    fn from(e: DbError) -> Self {
        Self::Db(e)
    }
}
impl From<crate::db::ser::Error> for DplError {
    fn from(e: crate::db::ser::Error) -> Self {
        Self::Db(DbError::from(e))
    }
}
impl From<std::io::Error> for DplError {
    fn from(e: std::io::Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl From<String> for DplError {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}
impl From<&str> for DplError {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

///
/// # Error Helper
///
/// Implemented by types with some internal state worth reporting upon failure,
/// such as the importer's current row or instance.
///
pub trait ErrorHelper {
    /// Create a [DplError::Config], decorated with our current context
    fn err(&self, msg: impl Into<String>) -> DplError;
    /// Return failure
    fn fail<T>(&self, msg: impl Into<String>) -> DplResult<T> {
        Err(self.err(msg))
    }
    /// Unwrap the [Option] `opt` if it is [Some], and return our error if not
    fn unwrap<T>(&self, opt: Option<T>, msg: impl Into<String>) -> DplResult<T> {
        match opt {
            Some(val) => Ok(val),
            None => self.fail(msg),
        }
    }
    /// Assert a boolean condition. Returns through `self.fail` if it is not satisfied.
    fn assert(&self, b: bool, msg: impl Into<String>) -> DplResult<()> {
        match b {
            true => Ok(()),
            false => self.fail(msg),
        }
    }
}
