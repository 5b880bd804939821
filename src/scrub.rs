//! Line-level scrubbing of header text.
//!
//! The parser is line oriented; this module owns everything that happens to a
//! line before the declaration recognizers see it: encoding, comment
//! extraction, and splitting brace-bearing one-liners into logical
//! statements. Comments are not discarded, they accumulate in a FIFO until
//! the next declaration claims them.

use crate::model::{Comment, RawComment};

/// Decodes raw header bytes.
///
/// Returns the text and whether a UTF-8 BOM was present. Files without a BOM
/// are Latin-1; every byte maps to the code point of the same value.
pub(crate) fn decode(bytes: &[u8]) -> (String, bool) {
    if let Some(rest) = bytes.strip_prefix(b"\xef\xbb\xbf") {
        (String::from_utf8_lossy(rest).into_owned(), true)
    } else {
        (bytes.iter().map(|&b| b as char).collect(), false)
    }
}

/// Comment scrubber for one file.
///
/// Tracks the multi-line `/* … */` state across lines and buffers extracted
/// comments until [`Scrubber::consume`] drains them into a [`Comment`]
/// bundle for the declaration being parsed.
#[derive(Debug, Default)]
pub(crate) struct Scrubber {
    in_block_comment: bool,
    raw: Vec<RawComment>,
    pre: Vec<String>,
    raw_line_comment: Option<String>,
    line_comment: Option<String>,
}

impl Scrubber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strips comments from `original` and returns the trimmed remainder.
    pub fn scrub(&mut self, original: &str) -> String {
        let mut line = original.trim_end().to_string();
        self.strip_block_comments(&mut line);
        self.strip_line_comment(&mut line, original);
        line.trim().to_string()
    }

    fn strip_block_comments(&mut self, line: &mut String) {
        loop {
            if self.in_block_comment {
                match line.find("*/") {
                    Some(close) => {
                        self.pre.push(line[..close].trim_end().to_string());
                        *line = line[close + 2..].to_string();
                        self.in_block_comment = false;
                    }
                    None => {
                        self.pre.push(line.trim_end().to_string());
                        line.clear();
                        return;
                    }
                }
            } else {
                let Some(open) = line.find("/*") else { return };
                match line[open + 2..].find("*/") {
                    Some(rel) => {
                        let close = open + 2 + rel;
                        self.pre.push(line[open + 2..close].trim_end().to_string());
                        let rest = line[close + 2..].to_string();
                        line.truncate(open);
                        line.push_str(&rest);
                    }
                    None => {
                        self.pre.push(line[open + 2..].trim_end().to_string());
                        line.truncate(open);
                        self.in_block_comment = true;
                        return;
                    }
                }
            }
        }
    }

    fn strip_line_comment(&mut self, line: &mut String, original: &str) {
        // A trailing comment belongs to its own line; once the next line
        // arrives it becomes a leading comment for whatever follows.
        if let Some(pending) = self.line_comment.take() {
            self.pre.push(pending);
            if let Some(raw) = self.raw_line_comment.take() {
                self.raw.push(RawComment::Text(raw));
            }
        }

        if line.is_empty() {
            self.raw.push(RawComment::Blank);
            return;
        }

        if let Some(pos) = line.find("//") {
            self.line_comment = Some(line[pos + 2..].to_string());
            line.truncate(pos);

            // Recover the leading whitespace run from the original text so
            // the raw comment keeps its on-disk column.
            if let Some(opos) = original.find("//") {
                let head = &original[..opos];
                let indent = head.len() - head.trim_end().len();
                self.raw_line_comment = Some(original[opos - indent..].trim_end().to_string());
            }
        }
    }

    /// Drains all pending comments into one bundle.
    pub fn consume(&mut self) -> Comment {
        Comment {
            raw_pre: std::mem::take(&mut self.raw),
            pre: std::mem::take(&mut self.pre),
            raw_line: self.raw_line_comment.take(),
            line: self.line_comment.take(),
        }
    }

    /// Drains only the semantic pre-comments; used for file header capture.
    pub fn take_header(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pre)
    }
}

/// Splits a line holding several statements (`struct A_t { uint32 a; };`)
/// into logical statements.
///
/// Lines led by `enum` stay whole because the single-line enum forms are
/// recognized as a unit, as do callback macro invocations.
pub(crate) fn split_statements(line: &str) -> Vec<String> {
    if !(line.contains('{') && line.contains(';'))
        || line.trim_start().starts_with("enum")
        || line.contains("STEAM_CALLBACK")
    {
        return vec![line.to_string()];
    }

    let mut out = Vec::new();
    let mut cur = String::new();
    let flush = |cur: &mut String, out: &mut Vec<String>| {
        let trimmed = cur.trim();
        if !trimmed.is_empty() {
            out.push(trimmed.to_string());
        }
        cur.clear();
    };
    for ch in line.chars() {
        match ch {
            '{' | ';' => {
                cur.push(ch);
                flush(&mut cur, &mut out);
            }
            '}' => {
                flush(&mut cur, &mut out);
                cur.push(ch);
            }
            _ => cur.push(ch),
        }
    }
    flush(&mut cur, &mut out);
    out
}

#[test]
fn test_decode() {
    let (text, bom) = decode(b"\xef\xbb\xbfint x;");
    assert!(bom);
    assert_eq!(text, "int x;");

    // Latin-1 high bytes survive as-is
    let (text, bom) = decode(b"// caf\xe9");
    assert!(!bom);
    assert_eq!(text, "// café");
}

#[test]
fn test_block_comments() {
    let mut s = Scrubber::new();
    assert_eq!(s.scrub("int a; /* one */ int b;"), "int a;  int b;");
    assert_eq!(s.scrub("/* open"), "");
    assert!(s.in_block_comment);
    assert_eq!(s.scrub("still inside"), "");
    assert_eq!(s.scrub("closing */ int c;"), "int c;");
    assert!(!s.in_block_comment);
    let c = s.consume();
    assert_eq!(c.pre, vec![" one", " open", "still inside", "closing"]);
}

#[test]
fn test_line_comments() {
    let mut s = Scrubber::new();
    assert_eq!(s.scrub("int a; // trailing"), "int a;");
    // The trailing comment is pending until the next line arrives.
    let c = s.consume();
    assert_eq!(c.line.as_deref(), Some(" trailing"));
    assert!(c.pre.is_empty());

    assert_eq!(s.scrub("int b; // first"), "int b;");
    assert_eq!(s.scrub("int c;"), "int c;");
    let c = s.consume();
    assert_eq!(c.pre, vec![" first"]);
    assert_eq!(c.line, None);
}

#[test]
fn test_blank_lines_recorded() {
    let mut s = Scrubber::new();
    assert_eq!(s.scrub(""), "");
    assert_eq!(s.scrub("// note"), "");
    assert_eq!(s.scrub("int a;"), "int a;");
    let c = s.consume();
    assert_eq!(c.pre, vec![" note"]);
    assert!(matches!(c.raw_pre[0], RawComment::Blank));
}

#[test]
fn test_split_statements() {
    assert_eq!(
        split_statements("struct A_t { uint32 a; uint64 b; };"),
        vec!["struct A_t {", "uint32 a;", "uint64 b;", "};"]
    );
    assert_eq!(
        split_statements("struct X { int tag; union { int i; float f; } u; };"),
        vec![
            "struct X {",
            "int tag;",
            "union {",
            "int i;",
            "float f;",
            "} u;",
            "};"
        ]
    );
    // single-line enums are matched whole by the enum recognizer
    assert_eq!(
        split_statements("enum { k_iCallback = 300 };"),
        vec!["enum { k_iCallback = 300 };"]
    );
    assert_eq!(
        split_statements("virtual void Run( int a ) = 0;"),
        vec!["virtual void Run( int a ) = 0;"]
    );
}
