//! Steamworks SDK header parser in Rust
//!
//! Parses a directory of Steamworks headers into an in-memory semantic
//! model: defines, constants, enums, structs, unions, callback structs,
//! interfaces, and the byte-level layout of every record under the SDK's
//! packing rules.

use std::path::{Path, PathBuf};
use std::{error, fmt, io};

mod diag;
mod functions;
mod parser;
mod preprocessor;
mod scrub;

/// Byte-level layout engine and pack-awareness classification
pub mod layout;
/// The parsed semantic model
pub mod model;
/// Type and constant resolution over the model
pub mod resolve;

/// Closed sets consumed from the SDK headers
pub mod schema {
    /// Marker tokens, skip lists, and attribute names
    pub mod markers;
    /// Primitive type table and special records
    pub mod primitives;
}

pub use self::diag::{Diagnostic, Severity};
pub use self::layout::{FieldOffset, RecordLayout};
pub use self::model::{
    Arg, ArgAttribute, Comment, Constant, Define, Enum, EnumField, Field, Function,
    FunctionAttribute, Interface, Parser, RawComment, Record, RecordId, SourceFile, Typedef,
    TypedefId, Union, UnionId,
};
pub use self::preprocessor::Pack;
pub use self::resolve::TypeInfo;
pub use self::schema::primitives::ByteSize;

bitflags::bitflags! {
    /// Optional parser behaviors, defaulted off.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Settings: u32 {
        /// Warn when a file carries a UTF-8 BOM.
        const WARN_UTF8_BOM = 1;
        /// Warn when an include guard does not match the file name.
        const WARN_INCLUDE_GUARD = 1 << 1;
        /// Warn about missing whitespace in function declarations.
        const WARN_SPACING = 1 << 2;
        /// Report `#define` lines without a value.
        const PRINT_UNUSED_DEFINES = 1 << 3;
        /// Log typedefs the parser cannot model.
        const PRINT_SKIPPED_TYPEDEFS = 1 << 4;
        /// Synthesize game-server flavors of the eligible interfaces.
        const FAKE_GAMESERVER_INTERFACES = 1 << 5;
        /// Emit classifier traces through `log::debug!`.
        const PRINT_DEBUG = 1 << 6;
    }
}

/// Parse failures. Anomalies inside the headers are diagnostics, not
/// errors; only I/O failures abort a parse.
#[derive(Debug)]
pub enum Error {
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
        }
    }
}

/// Parses the Steamworks headers contained in a folder with default
/// settings.
pub fn parse(folder: impl AsRef<Path>) -> Result<Parser, Error> {
    Parser::parse(folder, Settings::empty())
}
