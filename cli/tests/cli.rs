use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const IDLC: &str = env!("CARGO_BIN_EXE_idlc");

const SCHEMA: &str = "namespace ser {
struct point final [[writable]] {
    int32_t x;
    int32_t y;
};
}
";

fn idlc(dir: &Path, args: &[&str]) -> Output {
    Command::new(IDLC)
        .current_dir(dir)
        .args(args)
        .output()
        .expect("failed to run idlc")
}

#[test]
fn test_compiles_to_default_output_names() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("point.idl.hh"), SCHEMA).unwrap();

    let out = idlc(dir.path(), &["-f", "point.idl.hh"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let declarations = fs::read_to_string(dir.path().join("point.dist.hh")).unwrap();
    let implementation = fs::read_to_string(dir.path().join("point.dist.impl.hh")).unwrap();
    assert!(declarations.contains("struct serializer<ser::point> {"));
    assert!(implementation.contains("struct writer_of_point {"));
    assert!(implementation.contains("struct point_view {"));
}

#[test]
fn test_explicit_output_and_namespace() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("point.idl.hh"), SCHEMA).unwrap();

    let out = idlc(dir.path(), &["-f", "point.idl.hh", "-o", "gen.hh", "--ns", "wire"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let declarations = fs::read_to_string(dir.path().join("gen.hh")).unwrap();
    let implementation = fs::read_to_string(dir.path().join("gen.impl.hh")).unwrap();
    assert!(declarations.contains("namespace wire {"));
    assert!(implementation.trim_end().ends_with("} // wire"));
}

#[test]
fn test_general_include() {
    let dir = tempfile::tempdir().unwrap();

    let out = idlc(dir.path(), &["idl/a.dist.hh", "idl/b.dist.hh"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let declarations = fs::read_to_string(dir.path().join("serializer.dist.hh")).unwrap();
    let implementation = fs::read_to_string(dir.path().join("serializer.dist.impl.hh")).unwrap();
    assert!(declarations.contains("#include \"idl/a.dist.hh\"\n#include \"idl/b.dist.hh\""));
    assert!(implementation.contains("#include \"idl/b.dist.impl.hh\""));
}

#[test]
fn test_dump_ast_prints_json() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("point.idl.hh"), SCHEMA).unwrap();

    let out = idlc(dir.path(), &["-f", "point.idl.hh", "--dump-ast"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let ast: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(ast[0]["kind"], "Namespace");
    assert_eq!(ast[0]["members"][0]["name"], "point");
    assert_eq!(ast[0]["members"][0]["is_final"], true);
    assert!(!dir.path().join("point.dist.hh").exists());
}

#[test]
fn test_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("bad.idl.hh"),
        "class a [[writable]] { std::optional<std::optional<int>> o; };",
    )
    .unwrap();

    let out = idlc(dir.path(), &["-f", "bad.idl.hh"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("UnsupportedType"));
    assert!(!dir.path().join("bad.dist.hh").exists());
    assert!(!dir.path().join("bad.dist.impl.hh").exists());
}

#[test]
fn test_failed_implementation_write_leaves_no_declarations() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("point.idl.hh"), SCHEMA).unwrap();
    fs::create_dir(dir.path().join("gen.impl.hh")).unwrap();

    let out = idlc(dir.path(), &["-f", "point.idl.hh", "-o", "gen.hh"]);
    assert!(!out.status.success());
    assert!(!dir.path().join("gen.hh").exists());
    assert!(dir.path().join("gen.impl.hh").is_dir());

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .filter(|name| name.starts_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temporary files left behind: {:?}", leftovers);
}
