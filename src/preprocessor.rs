//! Conditional and pack state tracking.
//!
//! Preprocessor conditions are never evaluated; predicates are recorded as
//! opaque strings so declarations can carry their guarding context. The pack
//! stack records `#pragma pack(push, N)` / `pop` pairs and reports the pack
//! in force through a heuristic that compensates for `#if`-gated pushes.

/// Pack setting reported to a record at declaration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pack {
    /// No pack in force; the compiler default applies.
    Default,
    /// The platform ABI default was restored by a pop the tracker cannot
    /// model precisely; such records are laid out sequentially.
    PlatformAbi,
    /// An explicit `#pragma pack(push, N)` cap.
    Explicit(u32),
}

#[derive(Debug, Default)]
pub(crate) struct Preprocessor {
    conditionals: Vec<String>,
    packs: Vec<Option<u32>>,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_if(&mut self, predicate: impl Into<String>) {
        self.conditionals.push(predicate.into());
    }

    pub fn push_ifdef(&mut self, token: &str) {
        self.conditionals.push(format!("defined({token})"));
    }

    pub fn push_ifndef(&mut self, token: &str) {
        self.conditionals.push(format!("!defined({token})"));
    }

    /// `#else`: rewrites the innermost predicate as its negation. Returns
    /// false when there is no frame to rewrite.
    pub fn invert_top(&mut self) -> bool {
        match self.conditionals.pop() {
            Some(prev) => {
                self.conditionals.push(format!("!({prev}) // #else"));
                true
            }
            None => false,
        }
    }

    /// `#endif`; returns false on underflow.
    pub fn pop_if(&mut self) -> bool {
        self.conditionals.pop().is_some()
    }

    pub fn top_if(&self) -> Option<&str> {
        self.conditionals.last().map(String::as_str)
    }

    pub fn if_depth(&self) -> usize {
        self.conditionals.len()
    }

    /// Everything below an active `!defined(API_GEN)` frame is invisible to
    /// the generator toolchain and is skipped wholesale.
    pub fn in_api_gen_skip(&self) -> bool {
        self.conditionals.iter().any(|c| c == "!defined(API_GEN)")
    }

    /// `#pragma pack(push, N)`; `size` is `None` when the push argument is
    /// not a decimal integer.
    pub fn push_pack(&mut self, size: Option<u32>) {
        self.packs.push(size);
    }

    /// `#pragma pack(pop)`; returns false on underflow.
    pub fn pop_pack(&mut self) -> bool {
        self.packs.pop().is_some()
    }

    pub fn pack_balanced(&self) -> bool {
        self.packs.is_empty()
    }

    /// The pack reported to records declared right now.
    ///
    /// The headers push both the 4- and the 8-byte pack behind `#ifdef`
    /// guards this tracker cannot evaluate, so both pushes land on the
    /// stack. `[4, 8]` is therefore what an untouched compiler default
    /// looks like, and a lone `[4]` is what remains once the matched pop
    /// restores the platform ABI default. This heuristic is a documented
    /// contract, not an approximation to be improved.
    pub fn current_pack(&self) -> Pack {
        if self.packs == [Some(4), Some(8)] {
            Pack::Default
        } else if self.packs == [Some(4)] {
            Pack::PlatformAbi
        } else {
            match self.packs.last() {
                Some(&Some(n)) => Pack::Explicit(n),
                _ => Pack::Default,
            }
        }
    }
}

#[test]
fn test_conditional_stack() {
    let mut p = Preprocessor::new();
    p.push_ifndef("STEAMCLIENTPUBLIC_H");
    assert_eq!(p.top_if(), Some("!defined(STEAMCLIENTPUBLIC_H)"));
    p.push_ifdef("API_GEN");
    assert_eq!(p.top_if(), Some("defined(API_GEN)"));
    assert!(p.invert_top());
    assert_eq!(p.top_if(), Some("!(defined(API_GEN)) // #else"));
    assert!(p.pop_if());
    assert!(p.pop_if());
    assert!(!p.pop_if());
}

#[test]
fn test_api_gen_skip() {
    let mut p = Preprocessor::new();
    p.push_ifndef("API_GEN");
    assert!(p.in_api_gen_skip());
    p.push_if("STEAM_API_EXPORTS");
    assert!(p.in_api_gen_skip());
    p.pop_if();
    p.pop_if();
    assert!(!p.in_api_gen_skip());
}

#[test]
fn test_pack_heuristic() {
    let mut p = Preprocessor::new();
    assert_eq!(p.current_pack(), Pack::Default);

    // both #ifdef branches pushed: compiler default
    p.push_pack(Some(4));
    assert_eq!(p.current_pack(), Pack::PlatformAbi);
    p.push_pack(Some(8));
    assert_eq!(p.current_pack(), Pack::Default);

    // an explicit push on top wins
    p.push_pack(Some(1));
    assert_eq!(p.current_pack(), Pack::Explicit(1));
    assert!(p.pop_pack());

    p.pop_pack();
    p.pop_pack();
    assert!(p.pack_balanced());

    // a lone explicit push reports itself
    p.push_pack(Some(8));
    assert_eq!(p.current_pack(), Pack::Explicit(8));
    p.pop_pack();

    // non-integer push argument
    p.push_pack(None);
    assert_eq!(p.current_pack(), Pack::Default);
}
