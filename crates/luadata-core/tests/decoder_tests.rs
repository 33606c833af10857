use luadata_core::runtime::Environment;
use luadata_core::{decode, Decoder, ErrorKind, Key, LuaDataError, Table, Value};

/// Helper: execute `source` and decode global `T`.
fn decode_global(source: &str) -> Table {
    let env = Environment::new();
    env.exec(source, "test").unwrap();
    decode(&env.global("T").unwrap()).unwrap()
}

fn field(table: &Table, name: &str) -> Value {
    table
        .field(name)
        .unwrap_or_else(|| panic!("missing field {name}"))
}

fn field_table(table: &Table, name: &str) -> Table {
    field(table, name)
        .as_table()
        .cloned()
        .unwrap_or_else(|| panic!("field {name} is not a table"))
}

// ============================================================================
// Scalars
// ============================================================================

#[test]
fn integral_numbers_become_integers() {
    let t = decode_global("T = { a = 3, b = -7, c = 2.0, d = 1e3 }");
    assert!(matches!(field(&t, "a"), Value::Integer(3)));
    assert!(matches!(field(&t, "b"), Value::Integer(-7)));
    assert!(matches!(field(&t, "c"), Value::Integer(2)));
    assert!(matches!(field(&t, "d"), Value::Integer(1000)));
}

#[test]
fn fractional_numbers_become_floats() {
    let t = decode_global("T = { a = 1.5, b = -0.25 }");
    assert!(matches!(field(&t, "a"), Value::Float(f) if f == 1.5));
    assert!(matches!(field(&t, "b"), Value::Float(f) if f == -0.25));
}

#[test]
fn integral_numbers_beyond_i64_stay_floats() {
    let t = decode_global("T = { big = 1e20, inf = 1/0 }");
    assert!(matches!(field(&t, "big"), Value::Float(f) if f == 1e20));
    assert!(matches!(field(&t, "inf"), Value::Float(f) if f.is_infinite()));
}

#[test]
fn booleans_and_strings() {
    let t = decode_global("T = { yes = true, no = false, name = \"Lobby\" }");
    assert!(matches!(field(&t, "yes"), Value::Bool(true)));
    assert!(matches!(field(&t, "no"), Value::Bool(false)));
    assert_eq!(field(&t, "name").as_str(), Some("Lobby"));
}

// ============================================================================
// Keys
// ============================================================================

#[test]
fn key_variants() {
    let t = decode_global("T = { [1] = \"a\", [2.0] = \"b\", s = \"c\", [true] = \"d\" }");
    assert_eq!(t.len(), 4);
    let text = |key: Key| t.get(&key).and_then(|v| v.as_str().map(str::to_string));
    assert_eq!(text(Key::Integer(1)).as_deref(), Some("a"));
    assert_eq!(text(Key::Integer(2)).as_deref(), Some("b"));
    assert_eq!(text(Key::from("s")).as_deref(), Some("c"));
    assert_eq!(text(Key::Bool(true)).as_deref(), Some("d"));
}

#[test]
fn fractional_numeric_keys_are_omitted() {
    let t = decode_global("T = { [1.5] = \"dropped\", [2] = \"kept\" }");
    assert_eq!(t.len(), 1);
    assert!(t.get(&Key::Integer(2)).is_some());
}

#[test]
fn table_keys_decode_to_tables() {
    let t = decode_global("T = { [{ id = 1 }] = \"first\" }");
    let entries = t.entries();
    let (key, value) = entries.iter().next().unwrap();
    let Key::Table(key) = key else {
        panic!("expected a table key, got {key:?}");
    };
    assert!(matches!(key.field("id"), Some(Value::Integer(1))));
    assert_eq!(value.as_str(), Some("first"));
}

#[test]
fn functions_are_omitted() {
    let t = decode_global("T = { m = print, f = function() end, n = 1 }");
    assert_eq!(t.len(), 1);
    assert!(t.field("m").is_none());
}

// ============================================================================
// Structure
// ============================================================================

#[test]
fn nested_tables() {
    let t = decode_global("T = { room = { seats = { 4, 8 } } }");
    let room = field_table(&t, "room");
    let seats = field_table(&room, "seats");
    assert_eq!(seats.len(), 2);
    assert!(matches!(seats.get(&Key::Integer(2)), Some(Value::Integer(8))));
}

#[test]
fn shared_tables_stay_shared() {
    let t = decode_global("local s = { 1 }\nT = { a = s, b = s, c = { 1 } }");
    let a = field_table(&t, "a");
    let b = field_table(&t, "b");
    let c = field_table(&t, "c");
    assert!(Table::ptr_eq(&a, &b));
    assert!(!Table::ptr_eq(&a, &c));
    assert!(!b.is_back_reference());
}

#[test]
fn empty_table() {
    let t = decode_global("T = {}");
    assert!(t.is_empty());
}

#[test]
fn numbers_built_by_code() {
    let t = decode_global(
        "T = {}\nfor i = 1, 3 do T[i] = i * 10 end\nT.label = string.format(\"%s-%d\", \"room\", 7)",
    );
    assert_eq!(t.len(), 4);
    assert!(matches!(t.get(&Key::Integer(3)), Some(Value::Integer(30))));
    assert_eq!(field(&t, "label").as_str(), Some("room-7"));
}

// ============================================================================
// Cycles
// ============================================================================

#[test]
fn self_reference_decodes_as_back_reference() {
    let t = decode_global("T = { a = 1 }\nT.me = T");
    let me = field_table(&t, "me");
    assert!(me.is_back_reference());
    assert!(Table::ptr_eq(&me, &t));
    assert!(matches!(me.field("a"), Some(Value::Integer(1))));
}

#[test]
fn cycle_through_nested_table() {
    let t = decode_global("T = { inner = {} }\nT.inner.back = T");
    let inner = field_table(&t, "inner");
    assert!(!inner.is_back_reference());
    let back = field_table(&inner, "back");
    assert!(back.is_back_reference());
    assert!(Table::ptr_eq(&back, &t));
    assert!(Table::ptr_eq(&field_table(&back, "inner"), &inner));
}

#[test]
fn cycle_through_table_key() {
    let t = decode_global("T = {}\nT[T] = 1");
    assert_eq!(t.len(), 1);
    let entries = t.entries();
    let (key, value) = entries.iter().next().unwrap();
    let Key::Table(key) = key else {
        panic!("expected a table key, got {key:?}");
    };
    assert!(key.is_back_reference());
    assert!(Table::ptr_eq(key, &t));
    assert!(matches!(value, Value::Integer(1)));
}

#[test]
fn back_reference_outlived_by_nothing_reads_empty() {
    let me = {
        let t = decode_global("T = { a = 1 }\nT.me = T");
        field_table(&t, "me")
    };
    assert!(me.is_empty());
    assert!(me.field("a").is_none());
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn root_must_be_a_table() {
    let err = decode(&mlua::Value::Number(1.5)).unwrap_err();
    assert!(matches!(err, LuaDataError::NotATable { found: "number", .. }));
    assert_eq!(err.kind(), ErrorKind::Load);
}

#[test]
fn nil_root_is_not_a_table() {
    let err = decode(&mlua::Value::Nil).unwrap_err();
    assert!(matches!(err, LuaDataError::NotATable { found: "nil", .. }));
}

#[test]
fn decode_named_uses_name_in_paths() {
    let env = Environment::new();
    env.exec("T = { [1] = { [\"odd key\"] = { x = {} } } }", "test")
        .unwrap();
    let err = Decoder::new()
        .with_max_depth(3)
        .decode_named("RoomData", &env.global("T").unwrap())
        .unwrap_err();
    match err {
        LuaDataError::TooDeep { path, .. } => {
            assert_eq!(path, "RoomData[1][\"odd key\"].x");
        }
        other => panic!("expected TooDeep, got {other:?}"),
    }
}

#[test]
fn depth_limit() {
    let env = Environment::new();
    env.exec("T = { a = { b = { c = { d = 1 } } } }", "test").unwrap();
    let raw = env.global("T").unwrap();

    // Four levels of tables: T, a, b, c.
    assert!(Decoder::new().with_max_depth(4).decode_named("T", &raw).is_ok());
    let err = Decoder::new()
        .with_max_depth(3)
        .decode_named("T", &raw)
        .unwrap_err();
    match &err {
        LuaDataError::TooDeep { path, limit } => {
            assert_eq!(path, "T.a.b.c");
            assert_eq!(*limit, 3);
        }
        other => panic!("expected TooDeep, got {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::Load);
}
