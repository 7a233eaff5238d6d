//!
//! # Database Result and Error Types
//!

/// # [DbError] Result Type
pub type DbResult<T> = Result<T, DbError>;

///
/// # Database Error Enumeration
///
pub enum DbError {
    /// Failed lookup of a named or keyed object
    NotFound { kind: &'static str, name: String },
    /// Serialization and file-IO errors
    Ser(crate::ser::Error),
    /// Boxed External Errors
    Boxed(Box<dyn std::error::Error + Send + Sync>),
    /// Uncategorized Error, with String Message
    Str(String),
}
impl DbError {
    /// Create a [DbError::Str] from anything String-convertible
    pub fn msg(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }
    /// Create an error-variant [Result] of our [DbError::Str] variant from anything String-convertible
    pub fn fail<T>(s: impl Into<String>) -> Result<T, Self> {
        Err(Self::msg(s))
    }
    /// Create a [DbError::NotFound]
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}
impl std::fmt::Debug for DbError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DbError::NotFound { kind, name } => write!(f, "{} Not Found: {}", kind, name),
            DbError::Ser(err) => write!(f, "Serialization Error: {}", err),
            DbError::Boxed(err) => std::fmt::Debug::fmt(err, f),
            DbError::Str(err) => std::fmt::Display::fmt(err, f),
        }
    }
}
impl std::fmt::Display for DbError {
    /// Delegates to the [Debug] implementation
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
impl std::error::Error for DbError {}

impl From<crate::ser::Error> for DbError {
    fn from(e: crate::ser::Error) -> Self {
        Self::Ser(e)
    }
}
impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl From<String> for DbError {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}
impl From<&str> for DbError {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}
