//! Text of the declaration header: the `serializer<T>` specializations that
//! other headers see, plus the boilerplate shared by both outputs.

use crate::{
    context::CompilerContext,
    utils::emit,
};

pub const BOILERPLATE: &str = "
/*
 * This is an auto-generated code, do not modify directly.
 */
#pragma once
";

const NOTICE: &str = "
/*
 * The generated code should be included in a header file after
 * the object definition
 */
";

/// Opening of the declaration header, up to and including the namespace.
pub fn declarations_prologue(ctx: &CompilerContext, out: &mut String) {
    emit(out, BOILERPLATE);
    emit(out, NOTICE);
    emit(out, "#include \"serializer.hh\"\n");
    open_namespace(ctx, out);
}

/// Opening of the implementation header, up to and including the namespace.
pub fn implementation_prologue(ctx: &CompilerContext, out: &mut String) {
    emit(out, BOILERPLATE);
    open_namespace(ctx, out);
}

pub fn open_namespace(ctx: &CompilerContext, out: &mut String) {
    if let Some(ns) = &ctx.options.namespace {
        emit(out, &format!("namespace {} {{", ns));
    }
}

pub fn close_namespace(ctx: &CompilerContext, out: &mut String) {
    if let Some(ns) = &ctx.options.namespace {
        emit(out, &format!("}} // {}", ns));
    }
}

/// Declares `serializer<name>` with its write/read/skip members. When the
/// file spells `const name` somewhere, `serializer<const name>` inherits it.
pub fn declare_methods(ctx: &CompilerContext, out: &mut String, name: &str, template_params: &str) {
    emit(out, &format!(
        "
template <{template_params}>
struct serializer<{name}> {{
  template <typename Output>
  static void write(Output& buf, const {name}& v);

  template <typename Input>
  static {name} read(Input& buf);

  template <typename Input>
  static void skip(Input& buf);
}};
"
    ));

    if ctx.registry.has_const_usage(name) {
        emit(out, &format!(
            "
template <{template_params}>
struct serializer<const {name}> : public serializer<{name}>
{{}};
"
        ));
    }
}
