//! Name resolution over the parsed model.
//!
//! `resolve_type_info` searches primitives, special records, typedefs,
//! enums, then structs and callbacks, in that order; pointer-typed names
//! short-circuit to pointer-sized. Constants resolve by scanning files in
//! parse order, and a small expression evaluator handles the arithmetic the
//! headers use in array lengths and callback ids.

use crate::model::{Constant, Enum, Parser, Record, RecordId, Typedef, Union, UnionId};
use crate::schema::primitives::{primitive, special_record, ByteSize, Primitive, SpecialRecord};

/// A resolved type descriptor.
#[derive(Debug, Clone, Copy)]
pub enum TypeInfo<'a> {
    Primitive(&'static Primitive),
    /// A pointer spelling; pointer-sized regardless of the pointee.
    Pointer,
    /// A record with a pre-declared layout.
    Special(&'static SpecialRecord),
    Typedef(&'a Typedef),
    Enum(&'a Enum),
    /// A struct or callback struct.
    Record(&'a Record),
    Union(&'a Union),
}

impl TypeInfo<'_> {
    /// Element size, when known.
    #[must_use]
    pub fn size(&self) -> Option<ByteSize> {
        match self {
            Self::Primitive(p) => Some(p.size),
            Self::Pointer => Some(ByteSize::Ptr),
            Self::Special(s) => Some(ByteSize::Fixed(s.size)),
            Self::Typedef(t) => t.size,
            Self::Enum(_) => Some(ByteSize::Fixed(Enum::SIZE)),
            Self::Record(r) => r.size.map(ByteSize::Fixed),
            Self::Union(u) => u.size.map(ByteSize::Fixed),
        }
    }

    /// Natural alignment, when known.
    #[must_use]
    pub fn align(&self) -> Option<ByteSize> {
        match self {
            Self::Primitive(p) => Some(p.align),
            Self::Pointer => Some(ByteSize::Ptr),
            Self::Special(s) => Some(ByteSize::Fixed(s.align)),
            Self::Typedef(t) => t.align,
            Self::Enum(_) => Some(ByteSize::Fixed(Enum::ALIGN)),
            Self::Record(r) => r.align.map(ByteSize::Fixed),
            Self::Union(u) => u.align.map(ByteSize::Fixed),
        }
    }
}

impl Parser {
    /// Resolves a type name to its descriptor.
    ///
    /// Returns `None` for names the model does not know; that usually means
    /// a type nested somewhere the parser does not track.
    #[must_use]
    pub fn resolve_type_info(&self, name: &str) -> Option<TypeInfo<'_>> {
        if let Some(p) = primitive(name) {
            return Some(TypeInfo::Primitive(p));
        }
        if name.contains('*') {
            return Some(TypeInfo::Pointer);
        }
        if let Some(s) = special_record(name) {
            return Some(TypeInfo::Special(s));
        }
        if let Some(t) = self.typedef_by_name(name) {
            return Some(TypeInfo::Typedef(t));
        }
        if let Some(e) = self.enum_by_name(name) {
            return Some(TypeInfo::Enum(e));
        }
        if let Some(id) = self.record_id_by_name(name) {
            return Some(TypeInfo::Record(self.record(id)));
        }
        if let Some(id) = self.union_id_by_name(name) {
            return Some(TypeInfo::Union(self.union(id)));
        }
        None
    }

    /// Resolves a constant by name across all files, in parse order.
    #[must_use]
    pub fn resolve_const_value(&self, name: &str) -> Option<&Constant> {
        self.files
            .iter()
            .flat_map(|f| f.constants.iter())
            .find(|c| c.name == name)
    }

    /// Resolves a callback id expression (`CONST`, `CONST + N`, or a
    /// literal) to its numeric identity.
    #[must_use]
    pub fn resolve_callback_id(&self, expr: &str) -> Option<i64> {
        self.eval_const_expr(expr)
    }

    /// Evaluates an integer constant expression against the constant
    /// registry. Identifiers resolve through [`Self::resolve_const_value`]
    /// and may themselves be expressions.
    #[must_use]
    pub fn eval_const_expr(&self, text: &str) -> Option<i64> {
        let tokens = tokenize(text)?;
        let mut cursor = ExprCursor { tokens: &tokens, pos: 0 };
        let value = self.eval_sum(&mut cursor, 0)?;
        cursor.at_end().then_some(value)
    }

    fn eval_sum(&self, c: &mut ExprCursor<'_>, depth: usize) -> Option<i64> {
        let mut acc = self.eval_product(c, depth)?;
        loop {
            match c.peek() {
                Some(ExprToken::Plus) => {
                    c.bump();
                    acc = acc.wrapping_add(self.eval_product(c, depth)?);
                }
                Some(ExprToken::Minus) => {
                    c.bump();
                    acc = acc.wrapping_sub(self.eval_product(c, depth)?);
                }
                _ => return Some(acc),
            }
        }
    }

    fn eval_product(&self, c: &mut ExprCursor<'_>, depth: usize) -> Option<i64> {
        let mut acc = self.eval_term(c, depth)?;
        loop {
            match c.peek() {
                Some(ExprToken::Star) => {
                    c.bump();
                    acc = acc.wrapping_mul(self.eval_term(c, depth)?);
                }
                Some(ExprToken::Slash) => {
                    c.bump();
                    let rhs = self.eval_term(c, depth)?;
                    if rhs == 0 {
                        return None;
                    }
                    acc /= rhs;
                }
                _ => return Some(acc),
            }
        }
    }

    fn eval_term(&self, c: &mut ExprCursor<'_>, depth: usize) -> Option<i64> {
        if depth > 8 {
            return None;
        }
        match c.next()? {
            ExprToken::Number(n) => Some(n),
            ExprToken::Minus => Some(self.eval_term(c, depth)?.wrapping_neg()),
            ExprToken::Open => {
                let inner = self.eval_sum(c, depth)?;
                matches!(c.next(), Some(ExprToken::Close)).then_some(inner)
            }
            ExprToken::Ident(name) => {
                let constant = self.resolve_const_value(&name)?;
                let value = constant.value.clone();
                let tokens = tokenize(&value)?;
                let mut inner = ExprCursor { tokens: &tokens, pos: 0 };
                let v = self.eval_sum(&mut inner, depth + 1)?;
                inner.at_end().then_some(v)
            }
            _ => None,
        }
    }

    /// Fills in the size and alignment of every typedef by chasing chains
    /// through primitives, pointers, special records, other typedefs, and
    /// enums. Unresolvable typedefs are reported and left without a layout.
    pub(crate) fn populate_typedef_layouts(&mut self) {
        let mut resolved = Vec::with_capacity(self.typedefs.len());
        for td in &self.typedefs {
            resolved.push(self.typedef_chain_layout(&td.ctype));
        }
        for (i, layout) in resolved.into_iter().enumerate() {
            match layout {
                Some((size, align)) => {
                    self.typedefs[i].size = Some(size);
                    self.typedefs[i].align = Some(align);
                }
                None => {
                    let name = self.typedefs[i].name.clone();
                    let ctype = self.typedefs[i].ctype.clone();
                    self.diags.warn_global(format!(
                        "typedef \"{name}\": underlying type \"{ctype}\" is not a known primitive"
                    ));
                }
            }
        }
    }

    fn typedef_chain_layout(&self, ctype: &str) -> Option<(ByteSize, ByteSize)> {
        let mut name = ctype;
        let mut seen: Vec<&str> = Vec::new();
        loop {
            if let Some(p) = primitive(name) {
                return Some((p.size, p.align));
            }
            if name.contains('*') {
                return Some((ByteSize::Ptr, ByteSize::Ptr));
            }
            if let Some(s) = special_record(name) {
                return Some((ByteSize::Fixed(s.size), ByteSize::Fixed(s.align)));
            }
            if let Some(td) = self.typedef_by_name(name) {
                if seen.contains(&name) {
                    return None;
                }
                seen.push(name);
                name = &td.ctype;
                continue;
            }
            if self.enum_by_name(name).is_some() {
                return Some((ByteSize::Fixed(Enum::SIZE), ByteSize::Fixed(Enum::ALIGN)));
            }
            return None;
        }
    }

    pub(crate) fn typedef_by_name(&self, name: &str) -> Option<&Typedef> {
        self.typedefs.iter().find(|t| t.name == name)
    }

    pub(crate) fn enum_by_name(&self, name: &str) -> Option<&Enum> {
        self.files
            .iter()
            .flat_map(|f| f.enums.iter())
            .find(|e| e.name == name)
    }

    pub(crate) fn record_id_by_name(&self, name: &str) -> Option<RecordId> {
        self.records
            .iter()
            .position(|r| r.name == name)
            .map(|i| RecordId(i as u32))
    }

    pub(crate) fn union_id_by_name(&self, name: &str) -> Option<UnionId> {
        self.unions
            .iter()
            .position(|u| u.name == name)
            .map(|i| UnionId(i as u32))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ExprToken {
    Number(i64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Open,
    Close,
}

struct ExprCursor<'a> {
    tokens: &'a [ExprToken],
    pos: usize,
}

impl ExprCursor<'_> {
    fn peek(&self) -> Option<&ExprToken> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn next(&mut self) -> Option<ExprToken> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

fn tokenize(text: &str) -> Option<Vec<ExprToken>> {
    let mut out = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' => i += 1,
            '+' => {
                out.push(ExprToken::Plus);
                i += 1;
            }
            '-' => {
                out.push(ExprToken::Minus);
                i += 1;
            }
            '*' => {
                out.push(ExprToken::Star);
                i += 1;
            }
            '/' => {
                out.push(ExprToken::Slash);
                i += 1;
            }
            '(' => {
                out.push(ExprToken::Open);
                i += 1;
            }
            ')' => {
                out.push(ExprToken::Close);
                i += 1;
            }
            '0'..='9' => {
                let start = i;
                let hex = text[i..].starts_with("0x") || text[i..].starts_with("0X");
                if hex {
                    i += 2;
                }
                while i < bytes.len() && (bytes[i] as char).is_ascii_hexdigit() {
                    i += 1;
                }
                let digits = &text[start..i];
                // integer suffixes (u, l, ull, …) carry no value
                while i < bytes.len() && matches!(bytes[i] as char, 'u' | 'U' | 'l' | 'L') {
                    i += 1;
                }
                let value = if hex {
                    u64::from_str_radix(&digits[2..], 16).ok()? as i64
                } else {
                    digits.parse::<i64>().ok()?
                };
                out.push(ExprToken::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < bytes.len() && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                out.push(ExprToken::Ident(text[start..i].to_string()));
            }
            _ => return None,
        }
    }
    (!out.is_empty()).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Comment;
    use crate::Settings;

    fn parser_with_constants(consts: &[(&str, &str)]) -> Parser {
        let mut p = Parser::with_settings(Settings::empty());
        let mut f = crate::model::SourceFile::new("test.h".to_string());
        for (name, value) in consts {
            f.constants.push(Constant {
                name: name.to_string(),
                value: value.to_string(),
                ctype: "int".to_string(),
                comment: Comment::default(),
            });
        }
        p.files.push(f);
        p
    }

    #[test]
    fn literals_and_arithmetic() {
        let p = parser_with_constants(&[]);
        assert_eq!(p.eval_const_expr("300"), Some(300));
        assert_eq!(p.eval_const_expr("0x10"), Some(16));
        assert_eq!(p.eval_const_expr("0xffull"), Some(255));
        assert_eq!(p.eval_const_expr("2 + 3 * 4"), Some(14));
        assert_eq!(p.eval_const_expr("( 2 + 3 ) * 4"), Some(20));
        assert_eq!(p.eval_const_expr("-5"), Some(-5));
        assert_eq!(p.eval_const_expr("1 /"), None);
        assert_eq!(p.eval_const_expr("\"text\""), None);
    }

    #[test]
    fn identifiers_resolve_through_constants() {
        let p = parser_with_constants(&[
            ("k_iSteamUserCallbacks", "300"),
            ("k_cchChained", "k_iSteamUserCallbacks + 4"),
        ]);
        assert_eq!(p.eval_const_expr("k_iSteamUserCallbacks"), Some(300));
        assert_eq!(p.eval_const_expr("k_iSteamUserCallbacks + 4"), Some(304));
        assert_eq!(p.eval_const_expr("k_cchChained"), Some(304));
        assert_eq!(p.eval_const_expr("k_unknown + 1"), None);
        assert_eq!(p.resolve_callback_id("k_iSteamUserCallbacks + 4"), Some(304));
    }
}
