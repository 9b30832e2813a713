use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use crate::{
    types::{ClassDef, ClassItem, Declaration, Type},
    utils::quote,
    error::IdlError,
};

pub const VECTOR_TEMPLATES:   [&str; 2] = ["std::vector", "utils::chunked_vector"];
pub const OPTIONAL_TEMPLATES: [&str; 1] = ["std::optional"];
pub const VARIANT_TEMPLATES:  [&str; 2] = ["boost::variant", "std::variant"];

/// How the generators treat a type reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeShape<'t> {
    /// Anything serialized as a single opaque value: foreign types, numbers,
    /// and templates that are not one of the recognized containers.
    Scalar,
    /// A class of this file carrying `[[writable]]`.
    Writable(&'t str),
    Optional(&'t Type),
    Vector(&'t Type),
    Variant(&'t [Type]),
}

/// Types declared by the file being compiled.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    writable_types: BTreeMap<String, ClassDef>,
    stubs:          BTreeSet<String>,
    const_usages:   BTreeSet<String>,
}

impl TypeRegistry {
    /// Records every writable class declared at file or namespace level, and
    /// every type name used with a `const` qualifier anywhere in the file.
    pub fn build(declarations: &[Declaration]) -> TypeRegistry {
        let mut registry = TypeRegistry::default();
        registry.register_declarations(declarations);
        debug!(
            writable = registry.writable_types.len(),
            stubs = registry.stubs.len(),
            "type registry built"
        );
        registry
    }

    fn register_declarations(&mut self, declarations: &[Declaration]) {
        for declaration in declarations {
            match declaration {
                Declaration::Class(cls) => {
                    self.register_class(cls);
                    self.record_const_usages(cls);
                }
                Declaration::Namespace(namespace) => self.register_declarations(&namespace.members),
                Declaration::Enum(_) => {}
            }
        }
    }

    fn register_class(&mut self, cls: &ClassDef) {
        if !cls.is_writable() {
            return;
        }
        self.writable_types.insert(cls.name.clone(), cls.clone());
        if cls.is_stub {
            self.stubs.insert(cls.name.clone());
        }
    }

    fn record_const_usages(&mut self, cls: &ClassDef) {
        fn walk(t: &Type, usages: &mut BTreeSet<String>) {
            match t {
                Type::Basic(b) if b.is_const => {
                    usages.insert(b.name.clone());
                }
                Type::Basic(_) => {}
                Type::Template(t) => t.template_parameters.iter().for_each(|p| walk(p, usages)),
            }
        }

        for item in &cls.members {
            match item {
                ClassItem::Member(member) => walk(&member.type_, &mut self.const_usages),
                ClassItem::Class(nested) => self.record_const_usages(nested),
                ClassItem::Enum(_) => {}
            }
        }
    }

    pub fn writable(&self, name: &str) -> Result<&ClassDef, IdlError> {
        self.writable_types
            .get(name)
            .ok_or_else(|| IdlError::UnresolvedType(quote(name)))
    }

    pub fn has_writable_types(&self) -> bool {
        !self.writable_types.is_empty()
    }

    pub fn is_local_writable_type(&self, name: &str) -> bool {
        self.writable_types.contains_key(name)
    }

    pub fn is_stub(&self, name: &str) -> bool {
        self.stubs.contains(name)
    }

    /// Whether some member spelled `const <name>` somewhere in the file.
    pub fn has_const_usage(&self, name: &str) -> bool {
        self.const_usages.contains(name)
    }

    pub fn shape<'t>(&self, t: &'t Type) -> TypeShape<'t> {
        match t {
            Type::Basic(b) if self.is_local_writable_type(&b.name) => TypeShape::Writable(&b.name),
            Type::Basic(_) => TypeShape::Scalar,
            Type::Template(tmpl) => {
                let head = tmpl.name.as_str();
                match tmpl.template_parameters.as_slice() {
                    [payload, ..] if OPTIONAL_TEMPLATES.contains(&head) => TypeShape::Optional(payload),
                    [element, ..] if VECTOR_TEMPLATES.contains(&head) => TypeShape::Vector(element),
                    alternatives if VARIANT_TEMPLATES.contains(&head) => TypeShape::Variant(alternatives),
                    _ => TypeShape::Scalar,
                }
            }
        }
    }

    pub fn is_variant(&self, t: &Type) -> bool {
        matches!(self.shape(t), TypeShape::Variant(_))
    }

    pub fn list_local_writable_types(&self, t: &Type) -> BTreeSet<String> {
        t.list_types()
            .into_iter()
            .filter(|name| self.is_local_writable_type(name))
            .map(str::to_string)
            .collect()
    }

    /// Writable types whose generated code must exist before `cls`'s.
    pub fn dependencies(&self, cls: &ClassDef) -> BTreeSet<String> {
        cls.fields()
            .flat_map(|member| self.list_local_writable_types(&member.type_))
            .collect()
    }

    /// Orders the writable types so each comes after everything it depends
    /// on. Types that become ready in the same round are ordered by name.
    pub fn sort_dependencies(&self) -> Result<Vec<String>, IdlError> {
        let mut dep_tree: BTreeMap<String, BTreeSet<String>> = self
            .writable_types
            .iter()
            .map(|(name, cls)| (name.clone(), self.dependencies(cls)))
            .collect();
        let mut sorted = Vec::with_capacity(dep_tree.len());

        while !dep_tree.is_empty() {
            let found: Vec<String> = dep_tree
                .iter()
                .filter(|(_, deps)| deps.is_empty())
                .map(|(name, _)| name.clone())
                .collect();
            if found.is_empty() {
                return Err(IdlError::DependencyCycle(find_cycle(&dep_tree)));
            }

            for name in &found {
                dep_tree.remove(name);
            }
            for deps in dep_tree.values_mut() {
                for name in &found {
                    deps.remove(name);
                }
            }
            sorted.extend(found);
        }

        Ok(sorted)
    }
}

/// Every node left in `dep_tree` has an unresolved dependency, so following
/// first dependencies must revisit a node. Returns that loop, closed.
fn find_cycle(dep_tree: &BTreeMap<String, BTreeSet<String>>) -> Vec<String> {
    let mut path: Vec<String> = Vec::new();
    let mut current = dep_tree.keys().next().cloned();

    while let Some(name) = current {
        if let Some(start) = path.iter().position(|seen| *seen == name) {
            let mut cycle = path.split_off(start);
            cycle.push(name);
            return cycle;
        }
        current = dep_tree.get(&name).and_then(|deps| deps.iter().next().cloned());
        path.push(name);
    }
    path
}
