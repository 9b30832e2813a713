//! Attaches scope information to every class and enum of a parsed file.
//!
//! After [`annotate`] each declaration knows the namespace path it lives in
//! (enclosing class scopes included, as `name<T,U>` for class templates) and
//! the template parameters of all enclosing classes, outermost first.

use crate::types::{ClassDef, ClassItem, ClassTemplateParam, Declaration, EnumDef};

pub fn annotate(declarations: &mut [Declaration]) {
    annotate_declarations(declarations, &[]);
}

fn annotate_declarations(declarations: &mut [Declaration], namespace_path: &[String]) {
    for declaration in declarations {
        match declaration {
            Declaration::Namespace(namespace) => {
                let mut path = namespace_path.to_vec();
                path.push(namespace.name.clone());
                annotate_declarations(&mut namespace.members, &path);
            }
            Declaration::Class(cls) => annotate_class(cls, namespace_path, &[]),
            Declaration::Enum(enum_def) => annotate_enum(enum_def, namespace_path, &[]),
        }
    }
}

fn annotate_enum(
    enum_def: &mut EnumDef,
    namespace_path: &[String],
    parent_template_params: &[ClassTemplateParam],
) {
    enum_def.namespace_path = namespace_path.to_vec();
    enum_def.parent_template_params = parent_template_params.to_vec();
}

fn annotate_class(
    cls: &mut ClassDef,
    namespace_path: &[String],
    parent_template_params: &[ClassTemplateParam],
) {
    cls.namespace_path = namespace_path.to_vec();
    cls.parent_template_params = parent_template_params.to_vec();

    let mut scope = namespace_path.to_vec();
    scope.push(cls.scope_name());

    let mut nested_template_params = parent_template_params.to_vec();
    nested_template_params.extend(cls.own_template_params().iter().cloned());

    for item in &mut cls.members {
        match item {
            ClassItem::Class(nested) => annotate_class(nested, &scope, &nested_template_params),
            ClassItem::Enum(nested) => annotate_enum(nested, &scope, &nested_template_params),
            ClassItem::Member(_) => {}
        }
    }
}
