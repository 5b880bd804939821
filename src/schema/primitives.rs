//! The primitive type table and the special record table.
//!
//! Every C-style primitive spelling used by the headers maps to a canonical
//! name plus a size and natural alignment. Pointer-sized quantities carry
//! the `intptr` sentinel instead of a byte count.

/// Word size of the supported ABI (64-bit LP64/LLP64-style target).
pub const WORD_SIZE: u32 = 8;

/// A size or alignment quantity: a fixed byte count, or pointer-sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ByteSize {
    Fixed(u32),
    /// The `intptr` sentinel; resolves to [`WORD_SIZE`].
    Ptr,
}

impl ByteSize {
    /// Concrete byte count under the supported ABI.
    #[must_use]
    pub fn bytes(self) -> u32 {
        match self {
            Self::Fixed(n) => n,
            Self::Ptr => WORD_SIZE,
        }
    }
}

impl std::fmt::Display for ByteSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{n}"),
            Self::Ptr => f.write_str("intptr"),
        }
    }
}

/// One spelling of a primitive type.
#[derive(Debug, Clone, Copy)]
pub struct Primitive {
    /// Spelling as it appears in a declaration.
    pub name: &'static str,
    /// Canonical C name.
    pub canonical: &'static str,
    pub size: ByteSize,
    pub align: ByteSize,
}

const fn prim(name: &'static str, canonical: &'static str, size: u32) -> Primitive {
    Primitive {
        name,
        canonical,
        size: ByteSize::Fixed(size),
        align: ByteSize::Fixed(size),
    }
}

const fn ptr(name: &'static str) -> Primitive {
    Primitive {
        name,
        canonical: name,
        size: ByteSize::Ptr,
        align: ByteSize::Ptr,
    }
}

/// Every primitive spelling the headers use. The `uint32`-style aliases are
/// listed here directly because steamtypes.h is not consulted for them.
pub static PRIMITIVES: &[Primitive] = &[
    prim("char", "char", 1),
    prim("bool", "bool", 1),
    prim("unsigned char", "unsigned char", 1),
    prim("signed char", "signed char", 1),
    prim("short", "short", 2),
    prim("unsigned short", "unsigned short", 2),
    prim("int", "int", 4),
    prim("unsigned int", "unsigned int", 4),
    prim("long long", "long long", 8),
    prim("unsigned long long", "unsigned long long", 8),
    prim("float", "float", 4),
    prim("double", "double", 8),
    prim("uint8", "unsigned char", 1),
    prim("int8", "signed char", 1),
    prim("int16", "short", 2),
    prim("uint16", "unsigned short", 2),
    prim("int32", "int", 4),
    prim("uint32", "unsigned int", 4),
    prim("int64", "long long", 8),
    prim("uint64", "unsigned long long", 8),
    prim("unsigned __int8", "unsigned char", 1),
    prim("__sint8", "signed char", 1),
    prim("__int16", "short", 2),
    prim("unsigned __int16", "unsigned short", 2),
    prim("__int32", "int", 4),
    prim("unsigned __int32", "unsigned int", 4),
    prim("__int64", "long long", 8),
    prim("unsigned __int64", "unsigned long long", 8),
    prim("uint8_t", "unsigned char", 1),
    prim("sint8_t", "signed char", 1),
    prim("int16_t", "short", 2),
    prim("uint16_t", "unsigned short", 2),
    prim("int32_t", "int", 4),
    prim("uint32_t", "unsigned int", 4),
    prim("int64_t", "long long", 8),
    prim("uint64_t", "unsigned long long", 8),
    ptr("intptr"),
    ptr("intp"),
    ptr("uintp"),
    ptr("void*"),
    prim("long int", "long int", 8),
    prim("unsigned long int", "unsigned long int", 8),
];

/// Looks up a primitive by spelling.
#[must_use]
pub fn primitive(name: &str) -> Option<&'static Primitive> {
    PRIMITIVES.iter().find(|p| p.name == name)
}

/// A record whose layout is never computed structurally; the headers define
/// it with operators, bitfields, or unions the layout engine does not model,
/// so it carries a pre-declared size and alignment instead.
#[derive(Debug, Clone, Copy)]
pub struct SpecialRecord {
    pub name: &'static str,
    pub size: u32,
    pub align: u32,
}

pub static SPECIAL_RECORDS: &[SpecialRecord] = &[
    SpecialRecord { name: "CSteamID", size: 8, align: 8 },
    SpecialRecord { name: "CGameID", size: 8, align: 8 },
    // 16-byte address union plus the 4-byte type tag, packed
    SpecialRecord { name: "SteamIPAddress_t", size: 16 + 4, align: 1 },
    SpecialRecord { name: "SteamNetworkingIdentity", size: 4 + 128, align: 1 },
    // Bitfields; byte size fixed by the containing union
    SpecialRecord { name: "SteamIDComponent_t", size: 8, align: 8 },
];

/// Looks up a special record by name.
#[must_use]
pub fn special_record(name: &str) -> Option<&'static SpecialRecord> {
    SPECIAL_RECORDS.iter().find(|s| s.name == name)
}

#[test]
fn primitive_table_resolves() {
    for p in PRIMITIVES {
        let found = primitive(p.name).unwrap();
        assert_eq!(found.size, p.size);
        assert_eq!(found.align, found.size, "{}", p.name);
    }
    assert_eq!(primitive("uint64").unwrap().size.bytes(), 8);
    assert_eq!(primitive("void*").unwrap().size, ByteSize::Ptr);
    assert_eq!(ByteSize::Ptr.bytes(), WORD_SIZE);
}
