use steamworks_parser::schema::primitives::{ByteSize, PRIMITIVES};
use steamworks_parser::{parse, Pack, Parser, Record, RecordId, Settings, Severity, TypeInfo};

const FIXTURES: &str = "tests/fixtures/sdk";

fn parse_fixtures() -> Parser {
    parse(FIXTURES).unwrap()
}

fn record_id(p: &Parser, name: &str) -> RecordId {
    p.records()
        .find(|(_, r)| r.name == name)
        .unwrap_or_else(|| panic!("no record named {name}"))
        .0
}

fn record<'a>(p: &'a Parser, name: &str) -> &'a Record {
    p.record(record_id(p, name))
}

fn file<'a>(p: &'a Parser, name: &str) -> &'a steamworks_parser::SourceFile {
    p.files
        .iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("no file named {name}"))
}

#[test]
fn test_pack_sensitive_record() {
    let p = parse_fixtures();
    let id = record_id(&p, "A_t");

    let small = p.record_layout(id, 4).unwrap();
    assert_eq!(small.size, 12);
    assert_eq!(small.offsets[0].offset, 0);
    assert_eq!(small.offsets[1].offset, 4);

    let large = p.record_layout(id, 8).unwrap();
    assert_eq!(large.size, 16);
    assert_eq!(large.offsets[0].offset, 0);
    assert_eq!(large.offsets[1].offset, 8);

    let a = p.record(id);
    assert_eq!(a.pack, Pack::Explicit(8));
    assert!(a.packsize_aware);
    assert!(p.pack_size_aware.iter().any(|n| n == "A_t"));

    // published layout is the supported ABI's (default alignment 8)
    assert_eq!(a.size, Some(16));
    assert_eq!(a.align, Some(8));
}

#[test]
fn test_pack_sensitivity_suppressed() {
    let p = parse_fixtures();
    let id = record_id(&p, "B_t");
    let b = p.record(id);
    // a lone [4] on the pack stack means the platform ABI default was
    // restored; the record is sequential and never classified
    assert_eq!(b.pack, Pack::PlatformAbi);
    assert!(b.is_sequential());
    assert!(!b.packsize_aware);
    assert!(!p.pack_size_aware.iter().any(|n| n == "B_t"));

    // the platform default caps fields at 4 under either default alignment
    assert_eq!(p.record_layout(id, 4).unwrap().size, 12);
    assert_eq!(p.record_layout(id, 8).unwrap().size, 12);
    assert_eq!(b.size, Some(12));
}

#[test]
fn test_callback_id_arithmetic() {
    let p = parse_fixtures();
    let f = file(&p, "callbacks.h");
    let msg = p.record(f.callbacks[0]);
    assert_eq!(msg.name, "FriendChatMsg_t");
    assert_eq!(msg.callback_id.as_deref(), Some("k_iSteamUserCallbacks + 4"));
    assert_eq!(
        p.resolve_const_value("k_iSteamUserCallbacks").unwrap().value,
        "300"
    );
    assert_eq!(p.resolve_callback_id("k_iSteamUserCallbacks + 4"), Some(304));
}

#[test]
fn test_callback_macro() {
    let p = parse_fixtures();
    let f = file(&p, "callbacks.h");
    let cb = p.record(f.callbacks[1]);
    assert_eq!(cb.name, "LowBatteryPower_t");
    assert_eq!(cb.callback_id.as_deref(), Some("k_iSteamUserCallbacks + 2"));
    assert_eq!(p.resolve_callback_id(cb.callback_id.as_ref().unwrap()), Some(302));
    assert_eq!(cb.fields.len(), 1);
    assert_eq!(cb.fields[0].name, "m_nMinutesBatteryLeft");
    assert_eq!(cb.fields[0].ctype, "uint8");
}

#[test]
fn test_multi_declarator_fields() {
    let p = parse_fixtures();
    let rec = record(&p, "GameConnect_t");
    let names: Vec<&str> = rec.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        ["a", "b", "c", "m_rgchGameDir", "m_steamID", "m_eResult"]
    );

    assert_eq!(rec.fields[0].ctype, "int");
    assert_eq!(rec.fields[0].array_len_text, None);
    assert_eq!(rec.fields[1].ctype, "int");
    assert_eq!(rec.fields[1].array_len_text.as_deref(), Some("3"));
    assert_eq!(rec.fields[1].array_len, Some(3));
    assert_eq!(rec.fields[2].ctype, "int *");
    assert_eq!(rec.fields[2].size, Some(ByteSize::Ptr));

    // symbolic array length resolved through the constant registry
    assert_eq!(rec.fields[3].array_len_text.as_deref(), Some("k_cchGameDir"));
    assert_eq!(rec.fields[3].array_len, Some(32));

    // CSteamID carries its pre-declared layout
    assert_eq!(rec.fields[4].size, Some(ByteSize::Fixed(8)));
    // enums are int-sized
    assert_eq!(rec.fields[5].size, Some(ByteSize::Fixed(4)));

    assert_eq!(rec.size, Some(68));
    assert_eq!(rec.align, Some(8));
}

#[test]
fn test_anonymous_nested_union() {
    let p = parse_fixtures();
    let f = file(&p, "unions.h");
    let x = record(&p, "X");

    assert_eq!(x.fields.len(), 2);
    assert_eq!(x.fields[0].name, "tag");
    assert_eq!(x.fields[0].ctype, "int");
    assert_eq!(x.fields[1].name, "u");

    let inner = p.union(f.unions[0]);
    assert!(inner.unnamed);
    assert_eq!(x.fields[1].ctype, inner.name);
    let names: Vec<&str> = inner.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["i", "f"]);
    assert_eq!(inner.size, Some(4));
    assert_eq!(inner.align, Some(4));

    assert_eq!(x.size, Some(8));
    assert_eq!(x.align, Some(4));
}

#[test]
fn test_named_union() {
    let p = parse_fixtures();
    let f = file(&p, "unions.h");
    let blob = p.union(f.unions[1]);
    assert_eq!(blob.name, "Blob_t");
    assert!(!blob.unnamed);
    assert_eq!(blob.size, Some(8));
    assert_eq!(blob.align, Some(8));

    // the union is at least as large as its largest member, and a multiple
    // of that member's alignment
    let max = blob
        .fields
        .iter()
        .map(|f| f.size.unwrap().bytes() * f.array_len.unwrap_or(1) as u32)
        .max()
        .unwrap();
    assert!(blob.size.unwrap() >= max);
    assert_eq!(blob.size.unwrap() % blob.align.unwrap(), 0);
}

#[test]
fn test_bitfield_abandons_record() {
    let p = parse_fixtures();
    let f = file(&p, "fields.h");
    let names: Vec<&str> = f
        .structs
        .iter()
        .map(|&id| p.record(id).name.as_str())
        .collect();
    assert_eq!(names, ["GameConnect_t", "Outer_t"]);

    let ignored: Vec<&str> = p
        .ignored_structs
        .iter()
        .map(|&id| p.record(id).name.as_str())
        .collect();
    assert!(ignored.contains(&"Bits_t"));
    let bits = record(&p, "Bits_t");
    assert!(bits.skipped);
    assert_eq!(bits.size, None);
}

#[test]
fn test_helper_records_ignored() {
    let p = parse_fixtures();
    let base = record(&p, "CCallbackBase");
    assert!(base.skipped);
    // recorded as ignored only; no layout is ever fabricated for it
    assert_eq!(base.size, None);
    assert_eq!(base.align, None);
    assert!(p
        .ignored_structs
        .iter()
        .any(|&id| p.record(id).name == "CCallbackBase"));
    assert!(!p.pack_size_aware.iter().any(|n| n == "CCallbackBase"));
    let f = file(&p, "callbacks.h");
    assert!(f.structs.iter().all(|&id| p.record(id).name != "CCallbackBase"));
}

#[test]
fn test_nested_record() {
    let p = parse_fixtures();
    let outer = record(&p, "Outer_t");
    let inner_id = record_id(&p, "Inner_t");
    assert_eq!(outer.nested, [inner_id]);

    let inner = p.record(inner_id);
    assert_eq!(inner.outer, Some(record_id(&p, "Outer_t")));
    assert!(inner.should_skip_generation());
    assert!(!outer.should_skip_generation());

    // nested records never appear in the file's top-level list
    let f = file(&p, "fields.h");
    assert!(!f.structs.contains(&inner_id));

    // uint64 after a 4-byte struct member moves with the default alignment
    assert_eq!(p.record_layout(record_id(&p, "Outer_t"), 8).unwrap().size, 16);
    assert_eq!(p.record_layout(record_id(&p, "Outer_t"), 4).unwrap().size, 12);
    assert!(outer.packsize_aware);
}

#[test]
fn test_enums() {
    let p = parse_fixtures();
    let f = file(&p, "enums.h");
    assert_eq!(f.enums.len(), 1);
    let e = &f.enums[0];
    assert_eq!(e.name, "EResult");
    let fields: Vec<(&str, &str)> = e
        .fields
        .iter()
        .map(|f| (f.name.as_str(), f.value.as_str()))
        .collect();
    assert_eq!(
        fields,
        [("k_EResultNone", "0"), ("k_EResultOK", "1"), ("k_EResultFail", "2")]
    );
    assert_eq!(e.fields[0].comment.line.as_deref(), Some(" no result"));

    // the anonymous enum was demoted to constants
    assert_eq!(p.resolve_const_value("k_unMaxPlayers").unwrap().value, "16");
    assert_eq!(p.resolve_const_value("k_unMaxServers").unwrap().value, "4");
    assert!(matches!(p.resolve_type_info("EResult"), Some(TypeInfo::Enum(_))));
}

#[test]
fn test_interface_functions() {
    let p = parse_fixtures();
    let f = file(&p, "isteamutils.h");
    assert_eq!(f.interfaces.len(), 1);
    let i = &f.interfaces[0];
    assert_eq!(i.name, "ISteamUtils");

    let names: Vec<&str> = i.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "GetSecondsSinceAppActive",
            "GetIPCountry",
            "CheckFileSignature",
            "GetImageSize",
            "SetOverlayNotificationInset",
            "RunFrame",
            "PostPS3SysutilCallback",
        ]
    );

    let country = &i.functions[1];
    assert_eq!(country.return_type, "const char *");
    assert!(country.args.is_empty());

    let check = &i.functions[2];
    assert_eq!(check.return_type, "SteamAPICall_t");
    assert_eq!(check.attributes.len(), 1);
    assert_eq!(check.attributes[0].name, "STEAM_CALL_RESULT");
    assert_eq!(check.attributes[0].value, "CheckFileSignature_t");
    assert_eq!(check.args.len(), 1);
    assert_eq!(check.args[0].name, "szFileName");
    assert_eq!(check.args[0].ctype, "const char *");

    let image = &i.functions[3];
    let args: Vec<(&str, &str)> = image
        .args
        .iter()
        .map(|a| (a.ctype.as_str(), a.name.as_str()))
        .collect();
    assert_eq!(
        args,
        [("int", "iImage"), ("uint32 *", "pnWidth"), ("uint32 *", "pnHeight")]
    );

    let inset = &i.functions[4];
    assert_eq!(inset.args.len(), 2);
    assert_eq!(inset.args[0].default.as_deref(), Some("0"));
    assert_eq!(inset.args[1].default.as_deref(), Some("0"));

    assert!(i.functions[5].private);
    assert_eq!(i.functions[6].guard.as_deref(), Some("defined(_PS3)"));

    let version = f
        .defines
        .iter()
        .find(|d| d.name == "STEAM_UTILS_INTERFACE_VERSION")
        .unwrap();
    assert_eq!(version.value, "\"SteamUtils010\"");
}

#[test]
fn test_typedefs() {
    let p = parse_fixtures();
    let app = p.typedefs().find(|t| t.name == "AppId_t").unwrap();
    assert_eq!(app.ctype, "uint32");
    assert_eq!(app.size, Some(ByteSize::Fixed(4)));

    // chains resolve through other typedefs
    let depot = p.typedefs().find(|t| t.name == "DepotId_t").unwrap();
    assert_eq!(depot.ctype, "AppId_t");
    assert_eq!(depot.size, Some(ByteSize::Fixed(4)));
    assert_eq!(depot.align, Some(ByteSize::Fixed(4)));

    // pointer typedefs collapse to pointer-sized
    let req = p.typedefs().find(|t| t.name == "HServerListRequest").unwrap();
    assert_eq!(req.ctype, "void *");
    assert_eq!(req.size, Some(ByteSize::Ptr));

    // function pointer typedefs are not modeled
    assert!(p.typedefs().all(|t| t.name != "PFNPreMinidumpCallback"));
}

#[test]
fn test_resolver() {
    let p = parse_fixtures();

    // every primitive spelling resolves to its tabulated size
    for prim in PRIMITIVES {
        let info = p.resolve_type_info(prim.name).unwrap();
        assert_eq!(info.size(), Some(prim.size), "{}", prim.name);
    }

    assert!(matches!(p.resolve_type_info("A_t"), Some(TypeInfo::Record(_))));
    assert!(matches!(p.resolve_type_info("AppId_t"), Some(TypeInfo::Typedef(_))));
    assert!(matches!(p.resolve_type_info("CSteamID"), Some(TypeInfo::Special(_))));
    // unknown pointer spellings short-circuit to pointer-sized
    let ptr = p.resolve_type_info("ISteamMatchmaking *").unwrap();
    assert!(matches!(ptr, TypeInfo::Pointer));
    assert_eq!(ptr.size(), Some(ByteSize::Ptr));
    assert!(p.resolve_type_info("NoSuchType_t").is_none());
}

#[test]
fn test_layout_properties() {
    let p = parse_fixtures();
    for (id, rec) in p.records() {
        if rec.skipped {
            continue;
        }
        // determinism
        let once = p.record_layout(id, 8);
        let twice = p.record_layout(id, 8);
        assert_eq!(once, twice);
        let Some(layout) = once else { continue };

        // every non-skipped record has a published layout
        assert!(rec.size.is_some(), "{} has no size", rec.name);
        assert!(rec.align.is_some(), "{} has no alignment", rec.name);

        // offsets increase in declaration order, and the size covers the
        // last field
        for pair in layout.offsets.windows(2) {
            assert!(pair[0].offset <= pair[1].offset, "{}", rec.name);
        }
        if let (Some(last), Some(field)) = (layout.offsets.last(), rec.fields.last()) {
            let count = field.array_len.unwrap_or(1).max(1) as u32;
            let elem = field.size.map_or(0, ByteSize::bytes);
            assert!(layout.size >= last.offset + elem * count, "{}", rec.name);
        }
    }

    // classifier soundness: an aware record has a field whose effective
    // alignment differs between the two defaults
    for name in &p.pack_size_aware {
        let rec = record(&p, name);
        assert!(!rec.is_sequential());
        assert!(rec.packsize_aware);
        let widened = rec
            .fields
            .iter()
            .any(|f| f.align.map_or(false, |a| a.bytes() > 4));
        assert!(widened, "{name} has no field wider than 4-byte alignment");
    }
}

#[test]
fn test_diagnostics() {
    let p = parse_fixtures();
    assert!(p.diagnostics().iter().any(|d| {
        d.severity == Severity::Warning
            && d.file == "unbalanced.h"
            && d.message.contains("pack stack is not empty")
    }));
    assert!(p.diagnostics().iter().any(|d| {
        d.severity == Severity::Unhandled && d.file == "unbalanced.h" && d.text.contains("#banana")
    }));
    // the bitfield abandonment is surfaced too
    assert!(p
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("Bits_t contains bitfield")));
}

#[test]
fn test_header_capture() {
    let p = parse_fixtures();
    let f = file(&p, "callbacks.h");
    assert!(!f.header.is_empty());
    assert!(f.header[0].contains("Copyright Valve Corporation"));
}

#[test]
fn test_gameserver_synthesis() {
    let p = Parser::parse(FIXTURES, Settings::FAKE_GAMESERVER_INTERFACES).unwrap();
    let gs = file(&p, "isteamgameserverutils.h");
    assert_eq!(gs.interfaces.len(), 1);
    assert_eq!(gs.interfaces[0].name, "ISteamGameServerUtils");
    assert_eq!(
        gs.interfaces[0].functions.len(),
        file(&p, "isteamutils.h").interfaces[0].functions.len()
    );
    // the derived file carries interfaces only
    assert!(gs.structs.is_empty());
    assert!(gs.typedefs.is_empty());

    // and it is absent without the setting
    let plain = parse_fixtures();
    assert!(plain.files.iter().all(|f| f.name != "isteamgameserverutils.h"));
}

#[test]
fn test_file_order_and_skips() {
    let p = parse_fixtures();
    let names: Vec<&str> = p.files.iter().map(|f| f.name.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    assert!(names.contains(&"packtest.h"));
}
