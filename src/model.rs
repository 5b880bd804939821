//! The semantic model produced by a parse.
//!
//! One [`SourceFile`] per header, holding its declarations in source order.
//! Records (structs and callback structs), unions, and typedefs live in flat
//! arenas on the [`Parser`] and are referenced by id, so a nested record can
//! point back at its outer record without owning cycles.

use crate::diag::{Diagnostic, Diagnostics};
use crate::preprocessor::Pack;
use crate::schema::markers;
use crate::schema::primitives::ByteSize;
use crate::Settings;

/// Index of a record in the parser's record arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub(crate) u32);

/// Index of a union in the parser's union arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnionId(pub(crate) u32);

/// Index of a typedef in the parser's typedef arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypedefId(pub(crate) u32);

/// A raw pre-comment line: verbatim text, or a blank separator.
#[derive(Debug, Clone)]
pub enum RawComment {
    Blank,
    Text(String),
}

/// Comments attached to a declaration.
#[derive(Debug, Clone, Default)]
pub struct Comment {
    /// Raw comment lines preceding the declaration, blanks included.
    pub raw_pre: Vec<RawComment>,
    /// Comment text preceding the declaration.
    pub pre: Vec<String>,
    /// The raw trailing `// …` comment, with its on-disk indentation.
    pub raw_line: Option<String>,
    /// Text of the trailing `// …` comment.
    pub line: Option<String>,
}

/// A `#define NAME VALUE` line. The value token is never evaluated.
#[derive(Debug, Clone)]
pub struct Define {
    pub name: String,
    pub value: String,
    /// Whitespace between name and value, for faithful re-emission.
    pub spacing: String,
    pub comment: Comment,
}

/// A named constant from `const`, `static const`, or a single-line
/// anonymous enum.
#[derive(Debug, Clone)]
pub struct Constant {
    pub name: String,
    /// Value text, never evaluated at parse time.
    pub value: String,
    /// Declared type text.
    pub ctype: String,
    pub comment: Comment,
}

#[derive(Debug, Clone)]
pub struct EnumField {
    pub name: String,
    pub value: String,
    pub pre_spacing: String,
    pub post_spacing: String,
    pub comment: Comment,
}

/// A named enum. Anonymous enums are demoted to [`Constant`]s and never
/// stored here.
#[derive(Debug, Clone)]
pub struct Enum {
    pub name: String,
    pub fields: Vec<EnumField>,
    pub comment: Comment,
    pub end_comment: Option<Comment>,
}

impl Enum {
    /// Enums are always int-sized.
    pub const SIZE: u32 = 4;
    pub const ALIGN: u32 = 4;
}

/// A data member of a record or union.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    /// Declared type text.
    pub ctype: String,
    /// Array length text (`[N]` or `[k_cchSome]`), if any.
    pub array_len_text: Option<String>,
    pub comment: Comment,
    /// Element size, populated by the layout pass.
    pub size: Option<ByteSize>,
    /// Natural alignment of the type, populated by the layout pass.
    pub align: Option<ByteSize>,
    /// Resolved array length, populated by the layout pass.
    pub array_len: Option<u64>,
}

impl Field {
    pub(crate) fn new(name: String, ctype: String, array_len_text: Option<String>, comment: Comment) -> Self {
        Self {
            name,
            ctype,
            array_len_text,
            comment,
            size: None,
            align: None,
            array_len: None,
        }
    }
}

/// A struct, class, or callback struct.
#[derive(Debug, Clone)]
pub struct Record {
    pub name: String,
    /// Pack cap in force when the record was declared.
    pub pack: Pack,
    pub comment: Comment,
    pub end_comment: Option<Comment>,
    pub fields: Vec<Field>,
    /// Records declared inside this one.
    pub nested: Vec<RecordId>,
    /// The record this one is declared inside, if any.
    pub outer: Option<RecordId>,
    /// Brace depth at the declaration site.
    pub scope_depth: i32,
    /// Raw `k_iCallback` expression, when the record is a callback.
    pub callback_id: Option<String>,
    /// True for records in the skip table and for records abandoned during
    /// parsing or layout.
    pub skipped: bool,
    /// Byte size under the supported ABI, populated by the layout pass.
    pub size: Option<u32>,
    /// Alignment under the supported ABI, populated by the layout pass.
    pub align: Option<u32>,
    /// True when size or any field offset differs between the 4- and 8-byte
    /// default alignments.
    pub packsize_aware: bool,
}

impl Record {
    pub(crate) fn new(name: String, pack: Pack, comment: Comment, scope_depth: i32) -> Self {
        Self {
            name,
            pack,
            comment,
            end_comment: None,
            fields: Vec::new(),
            nested: Vec::new(),
            outer: None,
            scope_depth,
            callback_id: None,
            skipped: false,
            size: None,
            align: None,
            packsize_aware: false,
        }
    }

    /// A sequential record takes the platform ABI default layout and is
    /// excluded from pack-sensitivity analysis.
    #[must_use]
    pub fn is_sequential(&self) -> bool {
        self.pack == Pack::PlatformAbi
    }

    /// Whether downstream generators should skip this record: it is in the
    /// skip table, was abandoned, or is nested inside another record.
    #[must_use]
    pub fn should_skip_generation(&self) -> bool {
        markers::SKIPPED_RECORDS.contains(&self.name.as_str()) || self.skipped || self.outer.is_some()
    }
}

/// A union. Anonymous unions get a generated name derived from the file and
/// line they appear on.
#[derive(Debug, Clone)]
pub struct Union {
    pub name: String,
    pub unnamed: bool,
    pub pack: Pack,
    pub fields: Vec<Field>,
    pub outer: Option<RecordId>,
    pub end_comment: Option<Comment>,
    pub size: Option<u32>,
    pub align: Option<u32>,
}

impl Union {
    pub(crate) fn new(name: String, unnamed: bool, pack: Pack, outer: Option<RecordId>) -> Self {
        Self {
            name,
            unnamed,
            pack,
            fields: Vec::new(),
            outer,
            end_comment: None,
            size: None,
            align: None,
        }
    }
}

/// A top-level `typedef`. Pointer typedefs collapse to pointer-sized.
#[derive(Debug, Clone)]
pub struct Typedef {
    pub name: String,
    /// Underlying type text.
    pub ctype: String,
    /// Header the typedef came from.
    pub file: String,
    pub comment: Comment,
    pub size: Option<ByteSize>,
    pub align: Option<ByteSize>,
}

#[derive(Debug, Clone, Default)]
pub struct ArgAttribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionAttribute {
    pub name: String,
    pub value: String,
}

/// One parameter of an interface member function.
#[derive(Debug, Clone, Default)]
pub struct Arg {
    pub name: String,
    pub ctype: String,
    /// Default value token following `=`, if any.
    pub default: Option<String>,
    pub attribute: Option<ArgAttribute>,
}

/// A virtual member function of an interface.
#[derive(Debug, Clone, Default)]
pub struct Function {
    pub name: String,
    pub return_type: String,
    pub args: Vec<Arg>,
    /// Innermost `#if*` predicate active at the declaration, context only.
    pub guard: Option<String>,
    /// Declared inside a `STEAM_PRIVATE_API( … )` wrapper.
    pub private: bool,
    pub attributes: Vec<FunctionAttribute>,
    pub comment: Comment,
}

/// An accessor class whose name begins `ISteam`.
#[derive(Debug, Clone)]
pub struct Interface {
    pub name: String,
    pub functions: Vec<Function>,
    pub comment: Comment,
}

/// One parsed header.
#[derive(Debug, Clone, Default)]
pub struct SourceFile {
    pub name: String,
    /// Comment lines before the first declaration.
    pub header: Vec<String>,
    pub includes: Vec<String>,
    pub defines: Vec<Define>,
    pub constants: Vec<Constant>,
    pub enums: Vec<Enum>,
    pub structs: Vec<RecordId>,
    pub callbacks: Vec<RecordId>,
    pub interfaces: Vec<Interface>,
    pub typedefs: Vec<TypedefId>,
    pub unions: Vec<UnionId>,
}

impl SourceFile {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }
}

/// The parsed model of a header directory.
///
/// Built by [`Parser::parse`]; read-only afterwards.
pub struct Parser {
    /// Parsed files, in lexicographic filename order.
    pub files: Vec<SourceFile>,
    /// Names of records whose layout depends on the default alignment.
    pub pack_size_aware: Vec<String>,
    /// Records deliberately abandoned during parsing or layout.
    pub ignored_structs: Vec<RecordId>,
    pub(crate) records: Vec<Record>,
    pub(crate) unions: Vec<Union>,
    pub(crate) typedefs: Vec<Typedef>,
    pub(crate) diags: Diagnostics,
    pub(crate) settings: Settings,
}

impl Parser {
    pub(crate) fn with_settings(settings: Settings) -> Self {
        Self {
            files: Vec::new(),
            pack_size_aware: Vec::new(),
            ignored_structs: Vec::new(),
            records: Vec::new(),
            unions: Vec::new(),
            typedefs: Vec::new(),
            diags: Diagnostics::default(),
            settings,
        }
    }

    #[must_use]
    pub fn record(&self, id: RecordId) -> &Record {
        &self.records[id.0 as usize]
    }

    #[must_use]
    pub fn union(&self, id: UnionId) -> &Union {
        &self.unions[id.0 as usize]
    }

    #[must_use]
    pub fn typedef(&self, id: TypedefId) -> &Typedef {
        &self.typedefs[id.0 as usize]
    }

    /// All records, nested and ignored ones included, in declaration order.
    pub fn records(&self) -> impl Iterator<Item = (RecordId, &Record)> {
        self.records.iter().enumerate().map(|(i, r)| (RecordId(i as u32), r))
    }

    pub fn unions(&self) -> impl Iterator<Item = (UnionId, &Union)> {
        self.unions.iter().enumerate().map(|(i, u)| (UnionId(i as u32), u))
    }

    pub fn typedefs(&self) -> impl Iterator<Item = &Typedef> {
        self.typedefs.iter()
    }

    /// Diagnostics collected during the parse, in emission order.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diags.entries()
    }

    #[must_use]
    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub(crate) fn add_record(&mut self, record: Record) -> RecordId {
        let id = RecordId(self.records.len() as u32);
        self.records.push(record);
        id
    }

    pub(crate) fn add_union(&mut self, union: Union) -> UnionId {
        let id = UnionId(self.unions.len() as u32);
        self.unions.push(union);
        id
    }

    pub(crate) fn add_typedef(&mut self, typedef: Typedef) -> TypedefId {
        let id = TypedefId(self.typedefs.len() as u32);
        self.typedefs.push(typedef);
        id
    }
}
