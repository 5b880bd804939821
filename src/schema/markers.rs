//! Closed sets of SDK marker tokens the parser consumes.
//!
//! These mirror the macro and helper vocabulary of the Steamworks headers;
//! none of them are configurable because the headers themselves are the
//! contract.

/// Headers that are never parsed: the flat C API, PS3-only headers, and
/// files superseded by other headers.
pub static SKIPPED_FILES: &[&str] = &[
    "steam_api_flat.h",
    "isteamps3overlayrenderer.h",
    "steamps3params.h",
    "isteamcontroller.h",
    "isteamdualsense.h",
];

/// Any line containing one of these markers is dropped before parsing.
pub static SKIPPED_LINES: &[&str] = &[
    "STEAM_CLANG_ATTR",
    "#define VALVE_BIG_ENDIAN",
    "public:",
    "private:",
    "protected:",
    "_STEAM_CALLBACK_",
    "#define STEAM_CALLBACK_BEGIN",
    "#define STEAM_CALLBACK_END",
    "#define STEAM_CALLBACK_MEMBER",
    "STEAM_DEFINE_INTERFACE_ACCESSOR",
];

/// Records whose layout cannot be represented (bitfields, unions of
/// platform-dependent members). They are parsed but flagged as skipped.
pub static SKIPPED_RECORDS: &[&str] = &[
    "SteamNetworkingIPAddr",
    "SteamNetworkingIdentity",
    "SteamNetworkingMessage_t",
    "SteamNetworkingConfigValue_t",
    "SteamDatagramHostedAddress",
    "SteamDatagramRelayAuthTicket",
    "SteamIDComponent_t",
    "GameID_t",
];

/// Callback plumbing templates; recorded as ignored, never modeled.
pub static HELPER_RECORDS: &[&str] = &[
    "CCallResult",
    "CCallback",
    "CCallbackBase",
    "CCallbackImpl",
    "CCallbackManual",
];

/// Attribute macros that may precede an interface member function.
pub static FUNC_ATTRIBUTES: &[&str] = &[
    "STEAM_METHOD_DESC",
    "STEAM_IGNOREATTR",
    "STEAM_CALL_RESULT",
    "STEAM_CALL_BACK",
    "STEAM_FLAT_NAME",
];

/// Attribute macros that may precede an argument inside a parameter list.
pub static ARG_ATTRIBUTES: &[&str] = &[
    "STEAM_ARRAY_COUNT",
    "STEAM_ARRAY_COUNT_D",
    "STEAM_BUFFER_COUNT",
    "STEAM_DESC",
    "STEAM_OUT_ARRAY_CALL",
    "STEAM_OUT_ARRAY_COUNT",
    "STEAM_OUT_BUFFER_COUNT",
    "STEAM_OUT_STRING",
    "STEAM_OUT_STRING_COUNT",
    "STEAM_OUT_STRUCT",
];

/// Headers whose interfaces also exist in a game-server flavor; used by the
/// `FAKE_GAMESERVER_INTERFACES` setting to synthesize derived files.
pub static GAMESERVER_FILES: &[&str] = &[
    "isteamclient.h",
    "isteamhttp.h",
    "isteaminventory.h",
    "isteamnetworking.h",
    "isteamnetworkingmessages.h",
    "isteamnetworkingsockets.h",
    "isteamnetworkingutils.h",
    "isteamugc.h",
    "isteamutils.h",
];

/// Files whose single-line anonymous enums collide (duplicate field names
/// across two enums) and are therefore not demoted to constants.
pub static ANON_ENUM_SKIP_FILES: &[&str] = &["steamnetworkingtypes.h"];

/// A closing brace the parser must ignore to keep a record's body open.
///
/// `CSteamID` nests a union-like fragment whose closer would otherwise end
/// the class early; the affected brace is identified by its 0-based line.
#[derive(Debug, Clone, Copy)]
pub struct BraceContinuation {
    pub record: &'static str,
    pub line: usize,
}

pub static BRACE_CONTINUATIONS: &[BraceContinuation] = &[BraceContinuation {
    record: "CSteamID",
    line: 850,
}];

/// Returns the continuation policy for `record`, if any.
#[must_use]
pub fn brace_continuation(record: &str) -> Option<&'static BraceContinuation> {
    BRACE_CONTINUATIONS.iter().find(|c| c.record == record)
}
