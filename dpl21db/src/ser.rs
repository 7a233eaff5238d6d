//!
//! # Design & Settings Files
//!
//! Designs and legalizer settings are plain [serde] data.
//! Each [SerializationFormat] reads and writes them through any [Read] or [Write] stream,
//! and [SerdeFile] types pick their format from a file's extension when not told one.
//!

// Std-Lib
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

// Crates.io
use serde::de::DeserializeOwned;
use serde::Serialize;
use textwrap::dedent;

/// # Supported File Formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializationFormat {
    Json,
    Yaml,
    Toml,
}
impl SerializationFormat {
    /// Infer a format from the extension of file `fname`
    pub fn from_path(fname: impl AsRef<Path>) -> Option<Self> {
        let ext = fname.as_ref().extension()?.to_str()?;
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
    /// Write `data` to `writer`
    pub fn write(&self, data: &impl Serialize, mut writer: impl Write) -> Result<(), Error> {
        match *self {
            Self::Json => serde_json::to_writer_pretty(&mut writer, data)?,
            Self::Yaml => serde_yaml::to_writer(&mut writer, data)?,
            // TOML serializes only to strings
            Self::Toml => writer.write_all(toml::to_string(data)?.as_bytes())?,
        }
        writer.flush()?;
        Ok(())
    }
    /// Read a `T` from `reader`
    pub fn read<T: DeserializeOwned>(&self, mut reader: impl Read) -> Result<T, Error> {
        match *self {
            Self::Json => Ok(serde_json::from_reader(reader)?),
            Self::Yaml => Ok(serde_yaml::from_reader(reader)?),
            Self::Toml => {
                let mut s = String::new();
                reader.read_to_string(&mut s)?;
                Ok(toml::from_str(&s)?)
            }
        }
    }
    pub fn to_string(&self, data: &impl Serialize) -> Result<String, Error> {
        let mut buf: Vec<u8> = Vec::new();
        self.write(data, &mut buf)?;
        String::from_utf8(buf).map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }
    /// Parse string `s`, after removing the indentation common to all its lines.
    /// Inline test content may be indented along with its code.
    pub fn from_str<T: DeserializeOwned>(&self, s: &str) -> Result<T, Error> {
        self.read(dedent(s).as_bytes())
    }
    pub fn save(&self, data: &impl Serialize, fname: impl AsRef<Path>) -> Result<(), Error> {
        self.write(data, BufWriter::new(File::create(fname)?))
    }
    pub fn open<T: DeserializeOwned>(&self, fname: impl AsRef<Path>) -> Result<T, Error> {
        self.read(BufReader::new(File::open(fname)?))
    }
}

///
/// # File-Backed Data
///
/// Default-implemented for any [serde] type; implementors need only an empty `impl`.
///
pub trait SerdeFile: Serialize + DeserializeOwned {
    /// Save in `fmt`-format to file `fname`
    fn save(&self, fmt: SerializationFormat, fname: impl AsRef<Path>) -> Result<(), Error> {
        fmt.save(self, fname)
    }
    /// Open from `fmt`-format file `fname`
    fn open(fname: impl AsRef<Path>, fmt: SerializationFormat) -> Result<Self, Error> {
        fmt.open(fname)
    }
    /// Save to file `fname`, in the format its extension names
    fn save_to(&self, fname: impl AsRef<Path>) -> Result<(), Error> {
        format_of(fname.as_ref())?.save(self, fname)
    }
    /// Load from file `fname`, in the format its extension names
    fn load(fname: impl AsRef<Path>) -> Result<Self, Error> {
        format_of(fname.as_ref())?.open(fname)
    }
}

fn format_of(fname: &Path) -> Result<SerializationFormat, Error> {
    SerializationFormat::from_path(fname).ok_or_else(|| Error::UnknownFormat(fname.to_path_buf()))
}

/// # File & Format Errors
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
    TomlWrite(toml::ser::Error),
    TomlRead(toml::de::Error),
    /// No format matches the file's extension
    UnknownFormat(PathBuf),
}
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "File error: {}", e),
            Self::Json(e) => write!(f, "JSON error: {}", e),
            Self::Yaml(e) => write!(f, "YAML error: {}", e),
            Self::TomlWrite(e) => write!(f, "TOML error: {}", e),
            Self::TomlRead(e) => write!(f, "TOML error: {}", e),
            Self::UnknownFormat(p) => write!(f, "No file format for extension of {}", p.display()),
        }
    }
}
impl std::error::Error for Error {}
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml(e)
    }
}
impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Self::TomlWrite(e)
    }
}
impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::TomlRead(e)
    }
}
