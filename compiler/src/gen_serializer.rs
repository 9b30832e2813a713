//! `serializer<T>::write/read/skip` bodies for every class and enum.

use std::collections::HashMap;
use tracing::debug;
use crate::{
    context::CompilerContext,
    gen_declarations::declare_methods,
    gen_view::view_type,
    types::{template_params_str, ClassDef, ClassItem, Declaration, EnumDef},
    utils::emit,
};

/// Walks `declarations` depth first. Declarations go to `hout`, bodies to
/// `cout`; nested types are handled before the class that holds them.
pub fn generate(ctx: &CompilerContext, declarations: &[Declaration], hout: &mut String, cout: &mut String) {
    for declaration in declarations {
        match declaration {
            Declaration::Class(cls) => handle_class(ctx, cls, hout, cout),
            Declaration::Enum(enum_def) => handle_enum(ctx, enum_def, hout, cout),
            Declaration::Namespace(namespace) => generate(ctx, &namespace.members, hout, cout),
        }
    }
}

fn handle_enum(ctx: &CompilerContext, enum_def: &EnumDef, hout: &mut String, cout: &mut String) {
    let name = enum_def.qualified_name();
    debug!(name = %name, "emitting enum serializer");
    declare_methods(ctx, hout, &name, &template_params_str(&enum_def.parent_template_params));

    let template_decl = template_line(&enum_def.template_declaration());
    let underlying = &enum_def.underlying_type;
    emit(cout, &format!(
        "
{template_decl}template <typename Output>
void serializer<{name}>::write(Output& buf, const {name}& v) {{
  serialize(buf, static_cast<{underlying}>(v));
}}

{template_decl}template<typename Input>
{name} serializer<{name}>::read(Input& buf) {{
  return static_cast<{name}>(deserialize(buf, boost::type<{underlying}>()));
}}

{template_decl}template <typename Input>
void serializer<{name}>::skip(Input& buf) {{
  buf.skip(sizeof({underlying}));
}}"
    ));
}

fn handle_class(ctx: &CompilerContext, cls: &ClassDef, hout: &mut String, cout: &mut String) {
    if cls.is_stub {
        return;
    }
    for item in &cls.members {
        match item {
            ClassItem::Class(nested) => handle_class(ctx, nested, hout, cout),
            ClassItem::Enum(nested) => handle_enum(ctx, nested, hout, cout),
            ClassItem::Member(_) => {}
        }
    }

    let full_name = cls.full_name();
    debug!(name = %full_name, is_final = cls.is_final, "emitting class serializer");
    declare_methods(ctx, hout, &full_name, &template_params_str(&cls.all_template_params()));

    let template_decl = template_line(&cls.template_declaration());
    write_body(cls, &full_name, &template_decl, cout);
    read_body(cls, &full_name, &template_decl, cout);
    skip_body(ctx, cls, &full_name, &template_decl, cout);
}

fn write_body(cls: &ClassDef, full_name: &str, template_decl: &str, cout: &mut String) {
    let mut body: Vec<String> = Vec::new();
    if !cls.is_final {
        body.push("  set_size(buf, obj);".to_string());
    }
    for member in cls.fields() {
        let access = member.access_expr();
        body.push(format!(
            "  static_assert(is_equivalent<decltype(obj.{}), {}>::value, \"member value has a wrong type\");",
            access,
            member.type_.param_type()
        ));
        body.push(format!("  serialize(buf, obj.{});", access));
    }

    emit(cout, &format!(
        "
{template_decl}template <typename Output>
void serializer<{full_name}>::write(Output& buf, const {full_name}& obj) {{
{body}
}}",
        body = body.join("\n"),
    ));
}

fn read_body(cls: &ClassDef, full_name: &str, template_decl: &str, cout: &mut String) {
    let mut body: Vec<String> = Vec::new();
    let fields: Vec<_> = cls.fields().collect();

    if fields.is_empty() {
        if !cls.is_final {
            body.push("  size_type size = deserialize(buf, boost::type<size_type>());".to_string());
            body.push("  buf.skip(size - sizeof(size_type));".to_string());
        }
    } else if cls.is_final {
        body.push("  auto& in = buf;".to_string());
    } else {
        body.push("  size_type size = deserialize(buf, boost::type<size_type>());".to_string());
        body.push("  auto in = buf.read_substream(size - sizeof(size_type));".to_string());
    }

    let mut locals: HashMap<&str, String> = HashMap::new();
    for (index, member) in fields.iter().enumerate() {
        let local = format!("__local_{}", index);
        let param_type = member.type_.param_type();
        let read = format!("deserialize(in, boost::type<{}>())", param_type);

        match &member.attribute {
            Some(_) => {
                let default = member
                    .default_value
                    .clone()
                    .unwrap_or_else(|| format!("{}()", param_type));
                let default = locals.get(default.as_str()).cloned().unwrap_or(default);
                body.push(format!("  auto {} = (in.size()>0) ?\n    {} : {};", local, read, default));
            }
            None => body.push(format!("  auto {} = {};", local, read)),
        }
        locals.insert(&member.name, local);
    }

    let args = (0..fields.len())
        .map(|index| format!("std::move(__local_{})", index))
        .collect::<Vec<_>>()
        .join(", ");
    body.push(String::new());
    body.push(format!("  {} res {{{}}};", full_name, args));
    body.push("  return res;".to_string());

    emit(cout, &format!(
        "
{template_decl}template <typename Input>
{full_name} serializer<{full_name}>::read(Input& buf) {{
 return seastar::with_serialized_stream(buf, [] (auto& buf) {{
{body}
 }});
}}",
        body = body.join("\n"),
    ));
}

fn skip_body(ctx: &CompilerContext, cls: &ClassDef, full_name: &str, template_decl: &str, cout: &mut String) {
    let body = if cls.is_final {
        cls.fields()
            .map(|member| format!("  ser::skip(buf, boost::type<{}>());", view_type(&ctx.registry, &member.type_)))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        "  size_type size = deserialize(buf, boost::type<size_type>());\n  buf.skip(size - sizeof(size_type));"
            .to_string()
    };

    emit(cout, &format!(
        "
{template_decl}template <typename Input>
void serializer<{full_name}>::skip(Input& buf) {{
 seastar::with_serialized_stream(buf, [] (auto& buf) {{
{body}
 }});
}}"
    ));
}

/// `template <...>` followed by a newline, or nothing for plain types.
fn template_line(template_declaration: &str) -> String {
    if template_declaration.is_empty() {
        String::new()
    } else {
        format!("{}\n", template_declaration)
    }
}
