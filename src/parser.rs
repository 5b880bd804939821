//! The per-file declaration parser.
//!
//! One [`FileState`] per header; each scrubbed line is split into logical
//! statements and run through a chain of recognizers, the first match
//! consuming the statement. Scope is tracked centrally so constructs the
//! recognizers ignore still balance their braces.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::functions::FuncState;
use crate::model::{
    ArgAttribute, Comment, Constant, Define, Enum, EnumField, Field, Function, FunctionAttribute,
    Interface, Parser, Record, RecordId, SourceFile, Typedef, Union, UnionId,
};
use crate::preprocessor::{Pack, Preprocessor};
use crate::schema::markers;
use crate::schema::primitives::{special_record, SpecialRecord};
use crate::scrub::{self, Scrubber};
use crate::{Error, Settings};

static CONST_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*const\s+(.*)\s+(\w+)\s+=\s+(.*);$").unwrap());
static SINGLE_LINE_ENUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^enum\s*\{\s*(\w+)\s*=\s*(.*?)\s*\};$").unwrap());
static ENUM_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+),?([ \t]*)=?([ \t]*)(.*)$").unwrap());
static FIELD_PLAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^=.]*\s\**)(\w+);$").unwrap());
static FIELD_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*\s\*?)(\w+)\[\s*(\w+)?\s*\];$").unwrap());
static FIELD_MULTI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*\w+)\s*([\w,\s\[\]$*]*);$").unwrap());
static AGGREGATE_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\}\s*(\w+)?\s*;$").unwrap());
static CB_BEGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^STEAM_CALLBACK_BEGIN\(\s?(\w+),\s?(.*?)\s*\)").unwrap());
static CB_MEMBER_ARRAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^STEAM_CALLBACK_MEMBER_ARRAY\(.*,\s+(.*?)\s*,\s*(\w*)\s*,\s*(\d*)\s*\)").unwrap()
});
static CB_MEMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^STEAM_CALLBACK_MEMBER\(.*,\s+(.*?)\s*,\s*(\w*)\[?(\d+)?\]?\s*\)").unwrap()
});

/// Aggregate kind currently being parsed; deepest wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Complex {
    Struct,
    Union,
    Enum,
}

/// An enum whose closing `};` has not been seen yet.
pub(crate) struct PendingEnum {
    pub name: Option<String>,
    pub fields: Vec<EnumField>,
    pub comment: Option<Comment>,
}

/// Scope-balanced skip over the body of a special record.
pub(crate) struct SpecialSkip {
    pub special: &'static SpecialRecord,
    pub entry_depth: i32,
    pub entered: bool,
}

/// Target of a field declarator line.
#[derive(Debug, Clone, Copy)]
enum FieldTarget {
    Record(RecordId),
    Union(UnionId),
}

/// Mutable state for one header file.
pub(crate) struct FileState {
    pub file: SourceFile,
    pub line_num: usize,
    pub scrub: Scrubber,
    pub pre: Preprocessor,
    pub in_header: bool,
    pub in_macro_continuation: bool,
    pub in_private: bool,
    pub scope_depth: i32,
    pub complex: Vec<Complex>,
    pub record: Option<RecordId>,
    pub union: Option<UnionId>,
    pub enum_: Option<PendingEnum>,
    pub interface: Option<Interface>,
    pub function: Option<Function>,
    pub func_state: FuncState,
    pub func_args: String,
    pub func_attr: Option<ArgAttribute>,
    pub pending_fn_attrs: Vec<FunctionAttribute>,
    pub callback_macro: Option<RecordId>,
    pub pending_callback_id: Option<String>,
    pub special_skip: Option<SpecialSkip>,
    pub abandon_depth: Option<i32>,
}

impl FileState {
    fn new(name: String) -> Self {
        Self {
            file: SourceFile::new(name),
            line_num: 0,
            scrub: Scrubber::new(),
            pre: Preprocessor::new(),
            in_header: true,
            in_macro_continuation: false,
            in_private: false,
            scope_depth: 0,
            complex: Vec::new(),
            record: None,
            union: None,
            enum_: None,
            interface: None,
            function: None,
            func_state: FuncState::Return,
            func_args: String::new(),
            func_attr: None,
            pending_fn_attrs: Vec::new(),
            callback_macro: None,
            pending_callback_id: None,
            special_skip: None,
            abandon_depth: None,
        }
    }
}

impl Parser {
    /// Parses every eligible `.h` file in `folder`, in lexicographic order.
    pub fn parse(folder: impl AsRef<Path>, settings: Settings) -> Result<Self, Error> {
        let folder = folder.as_ref();
        let entries = fs::read_dir(folder).map_err(|source| Error::Io {
            path: folder.to_path_buf(),
            source,
        })?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| Error::Io {
                path: folder.to_path_buf(),
                source,
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if is_file && name.ends_with(".h") && !markers::SKIPPED_FILES.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names.sort();

        let mut parser = Parser::with_settings(settings);
        for name in names {
            let path = folder.join(&name);
            let bytes = fs::read(&path).map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
            let (text, bom) = scrub::decode(&bytes);
            if bom && settings.contains(Settings::WARN_UTF8_BOM) {
                parser.diags.warn(&name, 0, "", "file contains a UTF-8 BOM");
            }
            parser.parse_file(name, &text);
        }

        parser.populate_typedef_layouts();
        if settings.contains(Settings::FAKE_GAMESERVER_INTERFACES) {
            parser.synthesize_gameserver_files();
        }
        parser.classify_pack_awareness();
        parser.finalize_layouts();
        Ok(parser)
    }

    fn parse_file(&mut self, name: String, text: &str) {
        let mut st = FileState::new(name);
        let mut last_line = 0usize;
        for (line_num, raw) in text.lines().enumerate() {
            st.line_num = line_num;
            last_line = line_num;
            let line = st.scrub.scrub(raw);
            if line.is_empty() {
                continue;
            }
            if st.in_header {
                let header = st.scrub.take_header();
                st.file.header.extend(header);
                st.in_header = false;
            }
            if self.skip_line(&mut st, &line) {
                let _ = st.scrub.consume();
                continue;
            }
            if line.starts_with('#') {
                self.parse_preprocessor(&mut st, &line);
                continue;
            }
            for seg in scrub::split_statements(&line) {
                self.dispatch(&mut st, &seg);
                self.track_scope(&mut st, &seg);
            }
        }
        if !st.pre.pack_balanced() {
            self.diags
                .warn(&st.file.name, last_line, "", "pack stack is not empty at end of file");
        }
        self.files.push(st.file);
    }

    /// Lines dropped before any recognizer runs: everything under an active
    /// `!defined(API_GEN)` frame, macro continuations, the marker blacklist,
    /// and inline helpers outside interfaces.
    fn skip_line(&mut self, st: &mut FileState, line: &str) -> bool {
        if st.pre.in_api_gen_skip() {
            if line.starts_with("#if") {
                st.pre.push_if(line);
            } else if line.starts_with("#endif") {
                st.pre.pop_if();
            }
            return true;
        }
        if line.ends_with('\\') {
            st.in_macro_continuation = true;
            return true;
        }
        if st.in_macro_continuation {
            st.in_macro_continuation = false;
            return true;
        }
        if markers::SKIPPED_LINES.iter().any(|m| line.contains(m)) {
            return true;
        }
        if st.interface.is_none() && line.contains("inline") {
            return true;
        }
        false
    }

    fn parse_preprocessor(&mut self, st: &mut FileState, line: &str) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if line.starts_with("#else") {
            if !st.pre.invert_top() {
                self.diags
                    .warn(&st.file.name, st.line_num, line, "#else without a matching #if");
            }
        } else if line.starts_with("#include") {
            let _ = st.scrub.consume();
            if let Some(inc) = tokens.get(1) {
                // trim the "" or <>
                let inner = inc.get(1..inc.len().saturating_sub(1)).unwrap_or("");
                st.file.includes.push(inner.to_string());
            }
        } else if line.starts_with("#ifdef") {
            if let Some(t) = tokens.get(1) {
                st.pre.push_ifdef(t);
            }
        } else if line.starts_with("#ifndef") {
            if let Some(t) = tokens.get(1) {
                st.pre.push_ifndef(t);
            }
        } else if line.starts_with("#if") {
            st.pre.push_if(line[3..].trim());
        } else if line.starts_with("#endif") {
            if !st.pre.pop_if() {
                self.diags
                    .warn(&st.file.name, st.line_num, line, "#endif without a matching #if");
            }
        } else if line.starts_with("#define") {
            self.parse_define(st, line, &tokens);
        } else if line.starts_with("#pragma pack") {
            if line.contains("push") {
                match line.find(',') {
                    Some(p) => {
                        let arg = line
                            .get(p + 1..line.len().saturating_sub(1))
                            .unwrap_or("")
                            .trim();
                        st.pre.push_pack(arg.parse().ok());
                    }
                    None => st.pre.push_pack(None),
                }
            } else if line.contains("pop") && !st.pre.pop_pack() {
                self.diags.warn(
                    &st.file.name,
                    st.line_num,
                    line,
                    "#pragma pack(pop) without a matching push",
                );
            }
        } else if ["#pragma", "#error", "#warning", "#elif", "#undef"]
            .iter()
            .any(|p| line.starts_with(p))
        {
            // recognized but irrelevant
        } else {
            self.diags.unhandled(&st.file.name, st.line_num, line, "preprocessor");
        }
    }

    fn parse_define(&mut self, st: &mut FileState, line: &str, tokens: &[&str]) {
        let comment = st.scrub.consume();
        if self.settings.contains(Settings::WARN_INCLUDE_GUARD)
            && st.pre.if_depth() == 1
            && st.file.defines.is_empty()
            && st.file.includes.is_empty()
        {
            let expected = st.file.name.to_uppercase().replace('.', "_");
            if tokens.get(1).is_some_and(|t| *t != expected) {
                self.diags.warn(
                    &st.file.name,
                    st.line_num,
                    line,
                    "include guard does not match the file name",
                );
            }
        }
        if tokens.len() > 2 {
            let name = tokens[1];
            let value = tokens[2];
            let spacing = line
                .find(name)
                .and_then(|p| {
                    let after = p + name.len();
                    line[after..]
                        .find(value)
                        .map(|q| line[after..after + q].to_string())
                })
                .unwrap_or_else(|| " ".to_string());
            st.file.defines.push(Define {
                name: name.to_string(),
                value: value.to_string(),
                spacing,
                comment,
            });
        } else if self.settings.contains(Settings::PRINT_UNUSED_DEFINES) {
            self.diags.warn(&st.file.name, st.line_num, line, "unused define");
        }
    }

    fn dispatch(&mut self, st: &mut FileState, line: &str) {
        if st.abandon_depth.is_some() || st.special_skip.is_some() {
            return;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&first) = tokens.first() else { return };
        if first == "typedef" {
            self.parse_typedef(st, line, &tokens);
            return;
        }
        if self.try_constant(st, line, &tokens) {
            return;
        }
        if self.try_enum(st, line, &tokens) {
            return;
        }
        if self.try_union(st, line, &tokens) {
            return;
        }
        if self.try_record(st, line, &tokens) {
            return;
        }
        if self.try_callback_macro(st, line) {
            return;
        }
        self.try_interface(st, line, &tokens);
    }

    /// Central brace accounting, plus the bookkeeping that depends on it:
    /// interface completion, special-record skips, abandoned records.
    fn track_scope(&mut self, st: &mut FileState, seg: &str) {
        let opens = seg.matches('{').count();
        let closes = seg.matches('}').count();
        if opens > 0 {
            st.scope_depth += opens as i32;
            if opens > 1 {
                self.diags
                    .warn(&st.file.name, st.line_num, seg, "multiple occurrences of '{'");
            }
        }
        if closes > 0 {
            st.scope_depth -= closes as i32;
            if st.interface.is_some() && st.scope_depth == 0 {
                if let Some(interface) = st.interface.take() {
                    st.file.interfaces.push(interface);
                }
                st.function = None;
                st.func_state = FuncState::Return;
            }
            if st.scope_depth < 0 {
                self.diags
                    .warn(&st.file.name, st.line_num, seg, "scope depth fell below zero");
            }
            if closes > 1 {
                self.diags
                    .warn(&st.file.name, st.line_num, seg, "multiple occurrences of '}'");
            }
        }

        if let Some(skip) = st.special_skip.as_mut() {
            if opens > 0 {
                skip.entered = true;
            }
            if skip.entered && closes > 0 && st.scope_depth <= skip.entry_depth {
                let special_name = skip.special.name;
                st.special_skip = None;
                // `} name;` inside an outer record declares a member of the
                // special type
                if let Some(caps) = AGGREGATE_CLOSE.captures(seg)
                    && let Some(var) = caps.get(1)
                    && let Some(rid) = st.record
                {
                    self.records[rid.0 as usize].fields.push(Field::new(
                        var.as_str().to_string(),
                        special_name.to_string(),
                        None,
                        Comment::default(),
                    ));
                }
            }
        }

        if let Some(depth) = st.abandon_depth
            && st.scope_depth <= depth
        {
            st.abandon_depth = None;
        }
    }

    fn parse_typedef(&mut self, st: &mut FileState, line: &str, tokens: &[&str]) {
        let comment = st.scrub.consume();
        if st.scope_depth > 0 {
            if self.settings.contains(Settings::PRINT_SKIPPED_TYPEDEFS) {
                log::info!("skipped typedef inside a class or struct: {line}");
            }
            return;
        }
        // function pointers and arrays are not supported
        if line.contains('(') || line.contains('[') {
            if self.settings.contains(Settings::PRINT_SKIPPED_TYPEDEFS) {
                log::info!("skipped typedef containing '(' or '[': {line}");
            }
            return;
        }
        if !line.ends_with(';') {
            if self.settings.contains(Settings::PRINT_SKIPPED_TYPEDEFS) {
                log::info!("skipped typedef not ending with ';': {line}");
            }
            return;
        }
        if tokens.len() < 2 {
            return;
        }
        let mut name = tokens[tokens.len() - 1].trim_end_matches(';').to_string();
        let mut ctype = tokens[1..tokens.len() - 1].join(" ");
        if let Some(rest) = name.strip_prefix('*') {
            ctype.push_str(" *");
            name = rest.to_string();
        }
        let tid = self.add_typedef(Typedef {
            name,
            ctype,
            file: st.file.name.clone(),
            comment,
            size: None,
            align: None,
        });
        st.file.typedefs.push(tid);
    }

    fn try_constant(&mut self, st: &mut FileState, line: &str, tokens: &[&str]) -> bool {
        if tokens[0] != "const" && !line.starts_with("static const") {
            return false;
        }
        if st.scope_depth > 1 {
            return false;
        }
        let comment = st.scrub.consume();
        // a multi-line function whose wrapped argument starts with const
        // has no `=` token and is not a constant
        if !tokens.contains(&"=") {
            return false;
        }
        let Some(caps) = CONST_DECL.captures(line) else {
            return false;
        };
        st.file.constants.push(Constant {
            name: caps[2].to_string(),
            value: caps[3].to_string(),
            ctype: caps[1].to_string(),
            comment,
        });
        true
    }

    fn try_enum(&mut self, st: &mut FileState, line: &str, tokens: &[&str]) -> bool {
        if st.enum_.is_some() {
            if line == "{" {
                return true;
            }
            if line.ends_with("};") {
                let end_comment = st.scrub.consume();
                let pending = st.enum_.take().expect("enum state checked above");
                if let Some(name) = pending.name {
                    st.file.enums.push(Enum {
                        name,
                        fields: pending.fields,
                        comment: pending.comment.unwrap_or_default(),
                        end_comment: Some(end_comment),
                    });
                }
                while let Some(c) = st.complex.pop() {
                    if c == Complex::Enum {
                        break;
                    }
                }
                return true;
            }
            self.parse_enum_field(st, line);
            return true;
        }

        if tokens[0] != "enum" {
            return false;
        }
        let comment = st.scrub.consume();

        if line.contains("};") {
            // single-line form: a constant, or a callback id at struct scope
            if line.contains(',') || markers::ANON_ENUM_SKIP_FILES.contains(&st.file.name.as_str())
            {
                return true;
            }
            if tokens.last() == Some(&"\\") {
                return true;
            }
            let Some(caps) = SINGLE_LINE_ENUM.captures(line) else {
                return true;
            };
            let name = caps[1].to_string();
            let value = caps[2].to_string();
            if st.record.is_some() && name == "k_iCallback" {
                st.pending_callback_id = Some(value);
                return true;
            }
            st.file.constants.push(Constant {
                name,
                value,
                ctype: "int".to_string(),
                comment,
            });
            return true;
        }

        let anonymous = tokens.len() == 1 || tokens.get(1) == Some(&"{");
        let name = if anonymous {
            None
        } else {
            Some(tokens[1].to_string())
        };
        st.enum_ = Some(PendingEnum {
            name,
            fields: Vec::new(),
            comment: Some(comment),
        });
        st.complex.push(Complex::Enum);
        true
    }

    fn parse_enum_field(&mut self, st: &mut FileState, line: &str) {
        let mut comment = st.scrub.consume();
        let Some(caps) = ENUM_FIELD.captures(line) else {
            return;
        };
        // multi-line values leave a bare `=` marker
        let value = if line.ends_with('=') {
            "=".to_string()
        } else {
            caps[4].trim_end_matches(',').to_string()
        };
        let name = caps[1].to_string();
        let Some(pending) = st.enum_.as_mut() else {
            return;
        };
        if pending.name.is_none() {
            // nameless enums are just constants
            if let Some(enum_comment) = pending.comment.take() {
                comment.pre = enum_comment.pre;
            }
            st.file.constants.push(Constant {
                name,
                value,
                ctype: "int".to_string(),
                comment,
            });
            return;
        }
        let (pre_spacing, post_spacing) = if value.is_empty() {
            (" ".to_string(), " ".to_string())
        } else {
            (caps[2].to_string(), caps[3].to_string())
        };
        pending.fields.push(EnumField {
            name,
            value,
            pre_spacing,
            post_spacing,
            comment,
        });
    }

    fn try_union(&mut self, st: &mut FileState, line: &str, tokens: &[&str]) -> bool {
        if let Some(uid) = st.union {
            if tokens[0] == "union" {
                // unions nested in unions are not modeled
                return true;
            }
            if line == "{" {
                return true;
            }
            if let Some(caps) = AGGREGATE_CLOSE.captures(line) {
                let end_comment = st.scrub.consume();
                let declarator = caps.get(1).map(|m| m.as_str().to_string());
                let u = &mut self.unions[uid.0 as usize];
                u.end_comment = Some(end_comment);
                let outer = u.outer;
                let unnamed = u.unnamed;
                let union_name = u.name.clone();
                st.file.unions.push(uid);
                while let Some(c) = st.complex.pop() {
                    if c == Complex::Union {
                        break;
                    }
                }
                st.union = None;
                if let Some(rid) = outer {
                    let field_name = match declarator {
                        Some(v) => Some(v),
                        None if unnamed => Some(format!("unnamed_field_{union_name}")),
                        None => None,
                    };
                    if let Some(fname) = field_name {
                        self.records[rid.0 as usize].fields.push(Field::new(
                            fname,
                            union_name,
                            None,
                            Comment::default(),
                        ));
                    }
                }
                return true;
            }
            self.parse_aggregate_field(st, line, FieldTarget::Union(uid));
            return true;
        }

        if tokens[0] != "union" {
            return false;
        }
        if tokens.len() >= 2 && tokens[1].ends_with(';') {
            return true; // forward declaration
        }
        let named = tokens.len() >= 2 && tokens[1] != "{";
        let (name, unnamed) = if named {
            (tokens[1].trim_end_matches('{').to_string(), false)
        } else {
            let stem = st.file.name.strip_suffix(".h").unwrap_or(&st.file.name);
            (format!("union__{}_{}", stem, st.line_num + 1), true)
        };
        let uid = self.add_union(Union::new(name, unnamed, st.pre.current_pack(), st.record));
        st.union = Some(uid);
        st.complex.push(Complex::Union);
        true
    }

    fn try_record(&mut self, st: &mut FileState, line: &str, tokens: &[&str]) -> bool {
        let opener_kw = tokens[0] == "struct" || tokens[0] == "class";
        if let Some(rid) = st.record
            && !opener_kw
        {
            if line == "};" {
                let name = self.records[rid.0 as usize].name.clone();
                if let Some(policy) = markers::brace_continuation(&name)
                    && policy.line == st.line_num
                {
                    // the designated closer keeps the body open
                    return true;
                }
                self.close_record(st, rid);
                return true;
            }
            self.parse_aggregate_field(st, line, FieldTarget::Record(rid));
            return true;
        }
        if !opener_kw {
            return false;
        }
        let Some(name_tok) = tokens.get(1).map(|t| t.trim_end_matches('{')) else {
            return true;
        };
        if name_tok.starts_with("ISteam") {
            // `class ISteam…` belongs to the interface recognizer
            return tokens[0] == "struct";
        }
        if name_tok.ends_with(';') {
            return true; // forward declaration
        }
        if markers::HELPER_RECORDS.contains(&name_tok) {
            let mut rec = Record::new(
                name_tok.to_string(),
                Pack::Explicit(8),
                Comment::default(),
                st.scope_depth,
            );
            // recorded as ignored only; never laid out
            rec.skipped = true;
            let id = self.add_record(rec);
            self.ignored_structs.push(id);
            return true;
        }
        if let Some(special) = special_record(name_tok) {
            st.special_skip = Some(SpecialSkip {
                special,
                entry_depth: st.scope_depth,
                entered: false,
            });
            return true;
        }

        let comment = st.scrub.consume();
        let mut rec = Record::new(
            name_tok.to_string(),
            st.pre.current_pack(),
            comment,
            st.scope_depth,
        );
        rec.outer = st.record;
        rec.skipped = markers::SKIPPED_RECORDS.contains(&name_tok);
        let id = self.add_record(rec);
        st.record = Some(id);
        st.complex.push(Complex::Struct);
        true
    }

    fn close_record(&mut self, st: &mut FileState, rid: RecordId) {
        let end_comment = st.scrub.consume();
        let rec = &mut self.records[rid.0 as usize];
        rec.end_comment = Some(end_comment);
        if let Some(id_expr) = st.pending_callback_id.take() {
            rec.callback_id = Some(id_expr);
        }
        let outer = rec.outer;
        let is_callback = rec.callback_id.is_some();
        while let Some(c) = st.complex.pop() {
            if c == Complex::Struct {
                break;
            }
        }
        match outer {
            Some(outer_id) => self.records[outer_id.0 as usize].nested.push(rid),
            None => {
                if is_callback {
                    st.file.callbacks.push(rid);
                } else {
                    st.file.structs.push(rid);
                }
            }
        }
        st.record = outer;
    }

    fn parse_aggregate_field(&mut self, st: &mut FileState, line: &str, target: FieldTarget) {
        let comment = st.scrub.consume();
        if line.starts_with("enum") || line.starts_with("friend ") || line == "{" {
            return;
        }
        if line.contains(':') {
            self.abandon_record(st, line);
            return;
        }
        if line.contains(',') {
            let Some(caps) = FIELD_MULTI.captures(line) else {
                return;
            };
            let main_type = caps[1].trim().to_string();
            let declarators = caps[2].to_string();
            for var in declarators.split(',') {
                let stmt = format!("{} {};", main_type, var.trim());
                self.push_field(&stmt, target, comment.clone());
            }
        } else {
            self.push_field(line, target, comment);
        }
    }

    fn push_field(&mut self, line: &str, target: FieldTarget, comment: Comment) {
        let (ctype, name, array_len_text);
        if let Some(caps) = FIELD_PLAIN.captures(line) {
            ctype = caps[1].trim_end().to_string();
            name = caps[2].to_string();
            array_len_text = None;
        } else if let Some(caps) = FIELD_ARRAY.captures(line) {
            ctype = caps[1].trim_end().to_string();
            name = caps[2].to_string();
            array_len_text = caps
                .get(3)
                .map(|m| m.as_str().to_string())
                .filter(|s| !s.is_empty());
        } else {
            return;
        }
        // discard mis-parses such as {type: "void", name: "(int a0, int a1)"}
        if name.contains(['(', ')', '*', '{', '}']) || ctype.contains(['(', ')', '{', '}']) {
            return;
        }
        let field = Field::new(name, ctype, array_len_text, comment);
        match target {
            FieldTarget::Record(rid) => self.records[rid.0 as usize].fields.push(field),
            FieldTarget::Union(uid) => self.unions[uid.0 as usize].fields.push(field),
        }
    }

    /// A bitfield makes the whole enclosing record unrepresentable; the
    /// record is dropped and its remaining body is balanced out.
    fn abandon_record(&mut self, st: &mut FileState, line: &str) {
        if st.union.take().is_some() {
            while let Some(c) = st.complex.pop() {
                if c == Complex::Union {
                    break;
                }
            }
        }
        match st.record {
            Some(rid) => {
                let rec = &mut self.records[rid.0 as usize];
                rec.skipped = true;
                let name = rec.name.clone();
                let depth = rec.scope_depth;
                let outer = rec.outer;
                self.diags.warn(
                    &st.file.name,
                    st.line_num,
                    line,
                    format!("{name} contains bitfield, skipping"),
                );
                if !self.ignored_structs.contains(&rid) {
                    self.ignored_structs.push(rid);
                }
                while let Some(c) = st.complex.pop() {
                    if c == Complex::Struct {
                        break;
                    }
                }
                st.record = outer;
                st.abandon_depth = Some(depth);
            }
            None => {
                self.diags
                    .warn(&st.file.name, st.line_num, line, "union contains bitfield, skipping");
                st.abandon_depth = Some(st.scope_depth - 1);
            }
        }
    }

    fn try_callback_macro(&mut self, st: &mut FileState, line: &str) -> bool {
        if let Some(rid) = st.callback_macro {
            let comment = st.scrub.consume();
            if line.starts_with("STEAM_CALLBACK_END(") {
                st.file.callbacks.push(rid);
                st.callback_macro = None;
            } else if line.starts_with("STEAM_CALLBACK_MEMBER_ARRAY") {
                if let Some(caps) = CB_MEMBER_ARRAY.captures(line) {
                    self.records[rid.0 as usize].fields.push(Field::new(
                        caps[2].to_string(),
                        caps[1].to_string(),
                        Some(caps[3].to_string()),
                        comment,
                    ));
                }
            } else if line.starts_with("STEAM_CALLBACK_MEMBER") {
                if let Some(caps) = CB_MEMBER.captures(line) {
                    let array_len_text = caps.get(3).map(|m| m.as_str().to_string());
                    self.records[rid.0 as usize].fields.push(Field::new(
                        caps[2].to_string(),
                        caps[1].to_string(),
                        array_len_text,
                        comment,
                    ));
                }
            } else {
                self.diags
                    .warn(&st.file.name, st.line_num, line, "unexpected line in callback macro");
            }
            return true;
        }

        if !line.starts_with("STEAM_CALLBACK_BEGIN") {
            return false;
        }
        let comment = st.scrub.consume();
        let Some(caps) = CB_BEGIN.captures(line) else {
            return true;
        };
        let mut rec = Record::new(
            caps[1].to_string(),
            st.pre.current_pack(),
            comment,
            st.scope_depth,
        );
        rec.callback_id = Some(caps[2].to_string());
        let rid = self.add_record(rec);
        st.callback_macro = Some(rid);
        true
    }

    fn try_interface(&mut self, st: &mut FileState, line: &str, tokens: &[&str]) {
        if line.starts_with("class ISteam") {
            let comment = st.scrub.consume();
            match tokens.get(1) {
                // forward declarations and matchmaking response helpers
                Some(name) if name.ends_with(';') || name.ends_with("Response") => return,
                Some(name) => {
                    st.interface = Some(Interface {
                        name: name.to_string(),
                        functions: Vec::new(),
                        comment,
                    });
                }
                None => return,
            }
        }
        if st.interface.is_some() {
            self.parse_interface_functions(st, line);
        }
    }

    fn synthesize_gameserver_files(&mut self) {
        let mut derived = Vec::new();
        for f in &self.files {
            if markers::GAMESERVER_FILES.contains(&f.name.as_str()) {
                let mut gs = SourceFile::new(f.name.replacen("isteam", "isteamgameserver", 1));
                gs.interfaces = f.interfaces.clone();
                for i in &mut gs.interfaces {
                    i.name = i.name.replacen("ISteam", "ISteamGameServer", 1);
                }
                derived.push(gs);
            }
        }
        self.files.extend(derived);
    }
}
