//! Lazy read-only views over serialized writable types.

use std::collections::{BTreeSet, HashMap};
use tracing::debug;
use crate::{
    context::CompilerContext,
    registry::{TypeRegistry, TypeShape},
    types::{ClassDef, Type},
    utils::emit,
    error::IdlError,
};

/// The type a view reads for `t`: writable classes become `T_view` and every
/// variant gains a trailing `unknown_variant_type` alternative.
pub fn view_type(registry: &TypeRegistry, t: &Type) -> String {
    match t {
        Type::Basic(b) if registry.is_local_writable_type(&b.name) => format!("{}_view", b.name),
        Type::Basic(b) => b.name.clone(),
        Type::Template(tmpl) => {
            let mut params: Vec<String> = tmpl
                .template_parameters
                .iter()
                .map(|p| view_type(registry, p))
                .collect();
            if registry.is_variant(t) {
                params.push("unknown_variant_type".to_string());
            }
            format!("{}<{}>", tmpl.name, params.join(", "))
        }
    }
}

/// Emits a view per writable type in `order`.
pub fn generate(ctx: &mut CompilerContext, order: &[String], out: &mut String) -> Result<(), IdlError> {
    let registry = &ctx.registry;
    let mut views = ViewGen {
        registry,
        variant_helpers: &mut ctx.variant_helpers,
    };
    for name in order {
        let cls = registry.writable(name)?;
        views.add_view(cls, out);
    }
    Ok(())
}

struct ViewGen<'c> {
    registry:        &'c TypeRegistry,
    variant_helpers: &'c mut BTreeSet<String>,
}

impl<'c> ViewGen<'c> {
    fn add_view(&mut self, cls: &ClassDef, out: &mut String) {
        debug!(class = %cls.name, "emitting view");
        for member in cls.fields() {
            self.variant_helpers_for(&member.type_, out);
        }

        let name = &cls.name;
        emit(out, &format!("struct {}_view {{\n    utils::input_stream v;\n", name));

        if !cls.is_stub {
            let full_type = cls.qualified_name();
            emit(out, &format!(
                "
    operator {full_type}() const {{
       auto in = v;
       return deserialize(in, boost::type<{full_type}>());
    }}
"
            ));
        }

        let mut skips: Vec<String> = Vec::new();
        if !cls.is_final {
            skips.push("ser::skip(in, boost::type<size_type>());".to_string());
        }
        let mut accessors: HashMap<&str, String> = HashMap::new();

        for member in cls.fields() {
            let member_type = view_type(self.registry, &member.type_);
            let read = format!("deserialize(in, boost::type<{}>())", member_type);
            let value = match &member.attribute {
                Some(_) => {
                    let default = member
                        .default_value
                        .clone()
                        .unwrap_or_else(|| format!("{}()", member.type_.param_type()));
                    let default = accessors.get(default.as_str()).cloned().unwrap_or(default);
                    format!("(in.size()>0) ?\n        {} : {}", read, default)
                }
                None => read,
            };

            emit(out, &format!(
                "
    auto {name}() const {{
      return seastar::with_serialized_stream(v, [this] (auto& v) -> decltype(deserialize(std::declval<utils::input_stream&>(), boost::type<{member_type}>())) {{
       auto in = v;
       {skips}
       return {value};
      }});
    }}
",
                name = member.name,
                skips = skips.join("\n       "),
            ));

            accessors.insert(&member.name, format!("this->{}()", member.name));
            skips.push(format!("ser::skip(in, boost::type<{}>());", member_type));
        }
        emit(out, "};");

        let skip_impl = if cls.is_final {
            if skips.is_empty() {
                String::new()
            } else {
                format!("auto& in = v;\n       {}", skips.join("\n       "))
            }
        } else {
            "v.skip(read_frame_size(v));".to_string()
        };

        emit(out, &format!(
            "
template<>
struct serializer<{name}_view> {{
    template<typename Input>
    static {name}_view read(Input& v) {{
      return seastar::with_serialized_stream(v, [] (auto& v) {{
        auto v_start = v;
        auto start_size = v.size();
        skip(v);
        return {name}_view{{v_start.read_substream(start_size - v.size())}};
      }});
    }}
    template<typename Output>
    static void write(Output& out, {name}_view v) {{
        v.v.copy_to(out);
    }}
    template<typename Input>
    static void skip(Input& v) {{
      return seastar::with_serialized_stream(v, [] (auto& v) {{
       {skip_impl}
      }});
    }}
}};
"
        ));
    }

    /// Emits skip/deserialize helpers for every variant view reachable from
    /// `t`, innermost first, each signature once.
    fn variant_helpers_for(&mut self, t: &Type, out: &mut String) {
        for param in t.template_parameters() {
            self.variant_helpers_for(param, out);
        }
        let TypeShape::Variant(alternatives) = self.registry.shape(t) else {
            return;
        };

        let signature = view_type(self.registry, t);
        if !self.variant_helpers.insert(signature.clone()) {
            return;
        }
        debug!(variant = %signature, "emitting variant view helpers");

        emit(out, &format!(
            "
template<typename Input>
inline void skip(Input& v, boost::type<{signature}>) {{
  return seastar::with_serialized_stream(v, [] (auto& v) {{
    size_type ln = deserialize(v, boost::type<size_type>());
    v.skip(ln - sizeof(size_type));
  }});
}}
"
        ));

        let mut dispatch = String::new();
        for (index, alternative) in alternatives.iter().enumerate() {
            dispatch.push_str(&format!(
                "
    if (o == {index}) {{
        v.skip(sizeof(size_type)*2);
        return {signature}(deserialize(v, boost::type<{alt}>()));
    }}",
                alt = view_type(self.registry, alternative),
            ));
        }

        emit(out, &format!(
            "
template<typename Input>
{signature} deserialize(Input& v, boost::type<{signature}>) {{
  return seastar::with_serialized_stream(v, [] (auto& v) {{
    auto in = v;
    deserialize(in, boost::type<size_type>());
    size_type o = deserialize(in, boost::type<size_type>());{dispatch}
    return {signature}(deserialize(v, boost::type<unknown_variant_type>()));
  }});
}}
"
        ));
    }
}
