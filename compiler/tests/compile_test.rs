#![cfg(test)]

use std::collections::BTreeMap;
use idlc_compiler::{
    compile_idl,
    parse_idl,
    types::Declaration,
    CompileOptions,
    GeneratedHeaders,
    IdlError,
};

const MESSAGES: &str = include_str!("fixtures/messages.idl.hh");
const WRITERS: &str = include_str!("fixtures/writers.idl.hh");
const CYCLE: &str = include_str!("fixtures/cycle.idl.hh");

fn compile(text: &str) -> GeneratedHeaders {
    compile_idl(text, &CompileOptions::default()).expect("compile_idl failed")
}

/// Struct name to body, for every struct in a generated header.
fn structs(out: &str) -> BTreeMap<String, String> {
    let mut found = BTreeMap::new();
    let mut rest = out;
    while let Some(start) = rest.find("\nstruct ") {
        let after = &rest[start + "\nstruct ".len()..];
        let name_end = after.find(' ').unwrap();
        let body_end = after.find("\n};").unwrap();
        found.insert(after[..name_end].to_string(), after[name_end..body_end].to_string());
        rest = &after[body_end..];
    }
    found
}

#[test]
fn test_parse_fixture() {
    let declarations = parse_idl(MESSAGES).expect("parse_idl failed");
    assert_eq!(declarations.len(), 1);

    let Declaration::Namespace(gossip) = &declarations[0] else {
        panic!("expected a namespace");
    };
    assert_eq!(gossip.name, "gossip");
    assert_eq!(gossip.members.len(), 6);

    let Declaration::Enum(state) = &gossip.members[0] else {
        panic!("expected an enum");
    };
    assert_eq!(state.qualified_name(), "gossip::node_state");
    assert_eq!(state.underlying_type, "uint8_t");
    assert_eq!(state.members.len(), 3);
    assert_eq!(state.members[2].initializer.as_deref(), Some("5"));

    let Declaration::Class(endpoint) = &gossip.members[1] else {
        panic!("expected a class");
    };
    assert!(!endpoint.is_final);
    let names: Vec<_> = endpoint.fields().map(|m| m.access_expr()).collect();
    assert_eq!(names, vec!["host_id", "state", "application_state", "generation()"]);
}

#[test]
fn test_final_vs_non_final_envelope() {
    let headers = compile(MESSAGES);
    let cout = &headers.implementation;

    let write_final = cout
        .split("void serializer<gossip::heartbeat>::write")
        .nth(1)
        .unwrap();
    let write_final = &write_final[..write_final.find("\n}").unwrap()];
    assert!(!write_final.contains("set_size"));
    assert!(cout.contains("void serializer<gossip::heartbeat>::skip(Input& buf) {\n seastar::with_serialized_stream(buf, [] (auto& buf) {\n  ser::skip(buf, boost::type<int32_t>());\n  ser::skip(buf, boost::type<int32_t>());"));

    assert!(cout.contains("void serializer<gossip::endpoint_state>::write(Output& buf, const gossip::endpoint_state& obj) {\n  set_size(buf, obj);"));
    assert!(cout.contains("void serializer<gossip::endpoint_state>::skip(Input& buf) {\n seastar::with_serialized_stream(buf, [] (auto& buf) {\n  size_type size = deserialize(buf, boost::type<size_type>());"));
}

#[test]
fn test_read_reconstructs_in_declaration_order() {
    let cout = compile(MESSAGES).implementation;

    assert!(cout.contains("serialize(buf, obj.generation());"));
    assert!(cout.contains("  auto __local_3 = (in.size()>0) ?\n    deserialize(in, boost::type<int64_t>()) : int64_t();"));
    assert!(cout.contains(
        "gossip::endpoint_state res {std::move(__local_0), std::move(__local_1), std::move(__local_2), std::move(__local_3)};"
    ));

    // An attributed default naming an earlier member reads that member's value.
    assert!(cout.contains("  auto __local_2 = (in.size()>0) ?\n    deserialize(in, boost::type<int32_t>()) : 0;"));
    assert!(cout.contains("  auto __local_3 = (in.size()>0) ?\n    deserialize(in, boost::type<int32_t>()) : __local_2;"));
}

#[test]
fn test_declarations_header() {
    let hout = compile(MESSAGES).declarations;

    assert!(hout.contains("#pragma once"));
    assert!(hout.contains("#include \"serializer.hh\""));
    assert!(hout.contains("template <>\nstruct serializer<gossip::node_state> {"));
    assert!(hout.contains("template <typename Tag>\nstruct serializer<gossip::tagged_id<Tag>> {"));
    assert!(hout.contains("struct serializer<const gossip::endpoint_state> : public serializer<gossip::endpoint_state>"));
    assert!(!hout.contains("serializer<const gossip::heartbeat>"));

    let nested = hout.find("struct serializer<gossip::envelope::header>").unwrap();
    let parent = hout.find("struct serializer<gossip::envelope> {").unwrap();
    assert!(nested < parent);
}

#[test]
fn test_enum_serializer() {
    let cout = compile(MESSAGES).implementation;
    assert!(cout.contains("serialize(buf, static_cast<uint8_t>(v));"));
    assert!(cout.contains("return static_cast<gossip::node_state>(deserialize(buf, boost::type<uint8_t>()));"));
    assert!(cout.contains("void serializer<gossip::node_state>::skip(Input& buf) {\n  buf.skip(sizeof(uint8_t));"));
}

#[test]
fn test_no_views_or_writers_without_writable_types() {
    let cout = compile(MESSAGES).implementation;
    assert!(!cout.contains("_view {"));
    assert!(!cout.contains("////// Nodes"));
}

#[test]
fn test_final_writable_has_view_and_two_node_chain() {
    let cout = compile(WRITERS).implementation;
    let s = structs(&cout);

    assert!(s["point_view"].contains("operator ser::point() const {"));
    assert!(s["point_view"].contains("auto x() const {"));
    assert!(s["state_of_point"].contains("empty_frame<Output> f;"));

    let point_nodes: Vec<_> = s
        .keys()
        .filter(|name| name.ends_with("_point") || name.contains("_point__"))
        .collect();
    assert_eq!(point_nodes, vec!["after_point__x", "state_of_point", "writer_of_point"]);
    assert!(s["writer_of_point"].contains("after_point__x<Output> write_x(const int32_t& t) &&"));
    assert!(s["after_point__x"].contains("void end_point() &&"));
}

#[test]
fn test_writer_chain_is_linear() {
    let cout = compile(WRITERS).implementation;
    let s = structs(&cout);

    // writer_of_batch(out).write_id(v).start_values().add(x).add(y).end_values().write_limit(z).end_batch()
    assert!(s["writer_of_batch"].contains("after_batch__id<Output> write_id("));
    assert!(s["after_batch__id"].contains("batch__values<Output> start_values() &&"));
    assert!(s["after_batch__id"].contains("after_batch__values<Output> skip_values() &&"));
    assert!(s["batch__values"].contains("batch__values&& add(int32_t t) &&"));
    assert!(s["batch__values"].contains("after_batch__values<Output> end_values() &&"));
    assert!(s["after_batch__values"].contains("after_batch__limit<Output> write_limit(const int32_t& t) &&"));
    assert!(s["after_batch__values"].contains("after_batch__limit<Output> skip_limit() &&"));
    assert!(s["after_batch__limit"].contains("void end_batch() &&"));
}

#[test]
fn test_variant_member_tags_and_unknown_fallback() {
    let cout = compile(WRITERS).implementation;
    let s = structs(&cout);

    let entry = &s["writer_of_cell"];
    let int_writer = entry.find("write_value_int32_t(").unwrap();
    let tombstone_writer = entry.find("start_value_tombstone()").unwrap();
    assert!(entry[int_writer..tombstone_writer].contains("serialize(_out, uint32_t(0));"));
    assert!(entry[tombstone_writer..].contains("serialize(_out, uint32_t(1));"));
    assert!(s["after_cell__value__tombstone__key"].contains("after_cell__value<Output> end_tombstone() &&"));

    let signature = "std::variant<int32_t, tombstone_view, unknown_variant_type>";
    assert!(cout.contains(&format!("inline void skip(Input& v, boost::type<{}>) {{", signature)));
    assert!(cout.contains(&format!("return {}(deserialize(v, boost::type<tombstone_view>()));", signature)));
    assert!(cout.contains(&format!("return {}(deserialize(v, boost::type<unknown_variant_type>()));", signature)));
    assert!(s["cell_view"].contains("auto value() const {"));
}

#[test]
fn test_nested_writable_members() {
    let cout = compile(WRITERS).implementation;
    let s = structs(&cout);

    assert!(s["cell__history"].contains("writer_of_tombstone<Output> add()"));
    assert!(s["cell__history"].contains("void add(const tombstone_view& v)"));
    assert!(s["after_cell__history"].contains("cell__shadow<Output> write_shadow() &&"));
    assert!(s["after_cell__shadow__key"].contains("after_cell__shadow<Output> end_shadow() &&"));
    assert!(!s["writer_of_tombstone"].contains("write_key("));
    assert!(s["after_tombstone__timestamp"].contains("write_key(bytes_view t) &&"));
    assert!(s["after_tombstone__timestamp"].contains("write_fragmented_key(FragmentedBuffer&& fragments) &&"));
}

#[test]
fn test_stub_and_optional_elements() {
    let cout = compile(WRITERS).implementation;
    let s = structs(&cout);

    assert!(!s["opaque_view"].contains("operator"));
    assert!(s["writer_of_wrapper"].contains("after_wrapper__payload<Output> payload(Serializer&& f) &&"));
    assert!(s["writer_of_std__optional__int32_t"].contains("void skip()"));
    assert!(s["wrapper__slots"].contains("writer_of_std__optional__int32_t<Output> add()"));
}

#[test]
fn test_namespace_option() {
    let options = CompileOptions { namespace: Some("idl".to_string()) };
    let headers = compile_idl(WRITERS, &options).unwrap();
    assert!(headers.declarations.contains("namespace idl {"));
    assert!(headers.implementation.trim_end().ends_with("} // idl"));
}

#[test]
fn test_compilation_is_idempotent() {
    assert_eq!(compile(WRITERS), compile(WRITERS));
    assert_eq!(compile(MESSAGES), compile(MESSAGES));
}

#[test]
fn test_dependency_cycle_is_reported() {
    let err = compile_idl(CYCLE, &CompileOptions::default()).unwrap_err();
    assert!(matches!(err, IdlError::DependencyCycle(_)));
    assert_eq!(
        err.to_string(),
        "Writable types depend on each other in a cycle: left -> right -> left"
    );
}

#[test]
fn test_syntax_error_reports_position() {
    let err = compile_idl("class a {\n    int x\n};", &CompileOptions::default()).unwrap_err();
    match err {
        IdlError::ParseError { line, .. } => assert_eq!(line, 3),
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn test_unsupported_optional_payload() {
    let err = compile_idl(
        "class a [[writable]] { std::optional<std::vector<int>> v; };",
        &CompileOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Unsupported optional type std::vector<int>");
}

#[test]
fn test_literal_defaults_reach_read_body() {
    let cout = compile(concat!(
        "struct limits final {\n",
        "    uint32_t mask [[version 2]] = 0x10;\n",
        "    float ratio [[version 2]] = 1.5f;\n",
        "    sstring label [[version 2]] = \"a#b\";\n",
        "};\n",
    ))
    .implementation;
    assert!(cout.contains("deserialize(in, boost::type<uint32_t>()) : 0x10;"));
    assert!(cout.contains("deserialize(in, boost::type<float>()) : 1.5f;"));
    assert!(cout.contains("deserialize(in, boost::type<sstring>()) : \"a#b\";"));
}
