//! Writer state machines.
//!
//! Every writable type `T` gets a chain of node structs, `writer_of_T` then
//! `after_T__<member>` per member, where each node only offers the methods
//! that write the next member. The methods are `&&`-qualified and hand the
//! output plus the frame state on to the next node, so members can only be
//! written once, in declaration order, and the last node closes the frame.
//!
//! Members that need more than one call (vectors, nested writable types,
//! variant alternatives) open a sub-chain whose terminal returns to the
//! continuation of the member. Sub-chains are named by the `__`-joined path
//! of the members leading to them, and so is the `state_of_<path>` struct
//! holding their frame and the state of the region they were opened from.

use std::collections::BTreeSet;
use tracing::{debug, error};
use crate::{
    context::CompilerContext,
    gen_view::view_type,
    registry::{TypeRegistry, TypeShape},
    types::{ClassDef, ClassMember, Type},
    utils::emit,
    error::IdlError,
};

/// Serialized from a view, and additionally from a range of fragments.
const FRAGMENTED_TYPES: [&str; 2] = ["bytes", "sstring"];

const CONTINUE: &str = "return { _out, std::move(_state) };";

/// Emits state holders, then writer nodes, for the writable types in `order`.
pub fn generate(ctx: &mut CompilerContext, order: &[String], out: &mut String) -> Result<(), IdlError> {
    let registry = &ctx.registry;
    let mut writers = WriterGen {
        registry,
        structs: &mut ctx.writer_structs,
        roots:   &mut ctx.root_writers,
    };

    emit(out, "\n////// State holders");
    for name in order {
        let cls = registry.writable(name)?;
        writers.class_states(cls, &[flat(&cls.name)], out)?;
    }

    emit(out, "\n////// Nodes");
    for name in order {
        writers.root_writer(registry.writable(name)?, out)?;
    }
    Ok(())
}

/// How the first node of a chain is constructed.
#[derive(Debug, Clone, Copy)]
enum Entry {
    /// `writer_of_T`, built from the output alone.
    Root,
    /// Built from the state of the region the chain was opened from.
    Nested,
}

struct WriterGen<'c> {
    registry: &'c TypeRegistry,
    structs:  &'c mut BTreeSet<String>,
    roots:    &'c mut BTreeSet<String>,
}

impl<'c> WriterGen<'c> {
    // State holders

    fn class_states(&mut self, cls: &ClassDef, path: &[String], out: &mut String) -> Result<(), IdlError> {
        self.state(path, !cls.is_final, out);
        for member in cls.fields() {
            self.member_states(&member.type_, &member.name, path, out)?;
        }
        Ok(())
    }

    fn member_states(&mut self, t: &Type, name: &str, path: &[String], out: &mut String) -> Result<(), IdlError> {
        let payload = match self.registry.shape(t) {
            TypeShape::Writable(n) => Some(n),
            TypeShape::Optional(p) => match self.registry.shape(p) {
                TypeShape::Writable(n) => Some(n),
                _ => None,
            },
            TypeShape::Variant(alternatives) => return self.variant_states(alternatives, name, path, out),
            TypeShape::Scalar | TypeShape::Vector(_) => None,
        };
        match payload {
            Some(n) if !self.registry.is_stub(n) => {
                let cls = self.registry.writable(n)?;
                self.class_states(cls, &child(path, name), out)
            }
            _ => Ok(()),
        }
    }

    fn variant_states(
        &mut self,
        alternatives: &[Type],
        name: &str,
        path: &[String],
        out: &mut String,
    ) -> Result<(), IdlError> {
        let vpath = child(path, name);
        // Alternatives are always framed, whatever the enclosing class is.
        self.state(&vpath, true, out);
        for alternative in alternatives {
            match self.registry.shape(alternative) {
                TypeShape::Writable(n) if !self.registry.is_stub(n) => {
                    let cls = self.registry.writable(n)?;
                    self.class_states(cls, &child(&vpath, &alternative.flat_type()), out)?;
                }
                TypeShape::Variant(inner) => self.variant_states(inner, "variant", &vpath, out)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn state(&mut self, path: &[String], framed: bool, out: &mut String) {
        let name = format!("state_of_{}", join(path));
        if !self.structs.insert(name.clone()) {
            return;
        }
        let frame = if framed { "frame" } else { "empty_frame" };
        let parent = match path.split_last() {
            Some((_, parent)) if !parent.is_empty() => {
                format!("\n    state_of_{}<Output> _parent;", join(parent))
            }
            _ => String::new(),
        };
        emit(out, &format!(
            "\ntemplate<typename Output>\nstruct {name} {{\n    {frame}<Output> f;{parent}\n}};"
        ));
    }

    // Nodes

    fn root_writer(&mut self, cls: &ClassDef, out: &mut String) -> Result<(), IdlError> {
        let name = flat(&cls.name);
        if !self.roots.insert(name.clone()) {
            return Ok(());
        }
        debug!(class = %cls.name, "emitting writer");
        let terminal = method(&[&format!("void end_{}() &&", name)], &["_state.f.end(_out);"]);
        self.chain(cls, &[name.clone()], &format!("writer_of_{}", name), Entry::Root, &terminal, out)
    }

    /// Emits the nodes writing the fields of `cls` in the region at `path`,
    /// last node first. The last node carries `terminal`.
    fn chain(
        &mut self,
        cls: &ClassDef,
        path: &[String],
        entry_name: &str,
        entry: Entry,
        terminal: &str,
        out: &mut String,
    ) -> Result<(), IdlError> {
        if self.structs.contains(entry_name) {
            return Ok(());
        }
        let base = join(path);
        let ctor = entry_ctor(entry_name, path, entry, cls.is_final);
        let fields: Vec<&ClassMember> = cls.fields().collect();

        let Some(last) = fields.last() else {
            self.node(out, entry_name, &base, &[], Some(&ctor), terminal);
            return Ok(());
        };
        self.node(out, &format!("after_{}__{}", base, last.name), &base, &[], None, terminal);

        for index in (0..fields.len()).rev() {
            let methods = self.member(fields[index], path, out)?;
            if index == 0 {
                self.node(out, entry_name, &base, &[], Some(&ctor), &methods);
            } else {
                let name = format!("after_{}__{}", base, fields[index - 1].name);
                self.node(out, &name, &base, &[], None, &methods);
            }
        }
        Ok(())
    }

    /// Methods writing `member`. Sub-chains they open are emitted first.
    fn member(&mut self, member: &ClassMember, path: &[String], out: &mut String) -> Result<String, IdlError> {
        let name = &member.name;
        let next = format!("after_{}__{}", join(path), name);
        match self.registry.shape(&member.type_) {
            TypeShape::Scalar => Ok(value_writers(name, &next, &member.type_, &[], &[])),
            TypeShape::Writable(n) => self.nested_member(n, name, path, &next, out),
            TypeShape::Optional(payload) => self.optional_member(payload, name, path, &next, out),
            TypeShape::Vector(element) => self.vector_member(element, name, path, &next, out),
            TypeShape::Variant(alternatives) => self.variant_member(alternatives, name, path, out),
        }
    }

    /// Opens the payload chain of a nested writable type at `path__name`,
    /// closed by `end_<name>()`.
    fn nested_chain(&mut self, n: &str, name: &str, path: &[String], next: &str, out: &mut String) -> Result<String, IdlError> {
        let cls = self.registry.writable(n)?;
        let sub = child(path, name);
        let entry_name = join(&sub);
        let terminal = method(
            &[&format!("{}<Output> end_{}() &&", next, name)],
            &["_state.f.end(_out);", "return { _out, std::move(_state._parent) };"],
        );
        self.chain(cls, &sub, &entry_name, Entry::Nested, &terminal, out)?;
        Ok(entry_name)
    }

    fn nested_member(&mut self, n: &str, name: &str, path: &[String], next: &str, out: &mut String) -> Result<String, IdlError> {
        if self.registry.is_stub(n) {
            return Ok(callback(name, next, n, &[], &[]));
        }
        let entry_name = self.nested_chain(n, name, path, next, out)?;

        let mut text = method(&[&format!("{}<Output> start_{}() &&", entry_name, name)], &[CONTINUE]);
        text.push_str(&method(
            &[&format!("{}<Output> write_{}(const {}& t) &&", next, name, n)],
            &["serialize(_out, t);", CONTINUE],
        ));
        Ok(text)
    }

    fn optional_member(&mut self, payload: &Type, name: &str, path: &[String], next: &str, out: &mut String) -> Result<String, IdlError> {
        let present = ["serialize(_out, true);".to_string()];
        let writers = match self.registry.shape(payload) {
            TypeShape::Scalar => value_writers(name, next, payload, &present, &[]),
            TypeShape::Writable(n) if self.registry.is_stub(n) => callback(name, next, n, &present, &[]),
            TypeShape::Writable(n) => {
                let entry_name = self.nested_chain(n, name, path, next, out)?;
                let mut text = method(
                    &[&format!("{}<Output> write_{}() &&", entry_name, name)],
                    &["serialize(_out, true);", CONTINUE],
                );
                text.push_str(&method(
                    &[&format!("{}<Output> write_{}(const {}& t) &&", next, name, n)],
                    &["serialize(_out, true);", "serialize(_out, t);", CONTINUE],
                ));
                text
            }
            TypeShape::Optional(_) | TypeShape::Vector(_) | TypeShape::Variant(_) => {
                return Err(unsupported("optional", payload));
            }
        };

        let mut text = method(
            &[&format!("{}<Output> skip_{}() &&", next, name)],
            &["serialize(_out, false);", CONTINUE],
        );
        text.push_str(&writers);
        Ok(text)
    }

    fn vector_member(&mut self, element: &Type, name: &str, path: &[String], next: &str, out: &mut String) -> Result<String, IdlError> {
        let base = join(path);
        let node_name = format!("{}__{}", base, name);

        let mut methods = match self.registry.shape(element) {
            TypeShape::Writable(n) => {
                let mut text = method(
                    &[&format!("writer_of_{}<Output> add()", flat(n))],
                    &["_count++;", "return {_out};"],
                );
                text.push_str(&method(
                    &[&format!("void add(const {}& v)", view_type(self.registry, element))],
                    &["serialize(_out, v);", "_count++;"],
                ));
                text
            }
            TypeShape::Optional(payload) => {
                let writer = self.optional_node(element, payload, out)?;
                let mut text = method(&[&format!("{}<Output> add()", writer)], &["_count++;", "return {_out};"]);
                text.push_str(&method(
                    &[&format!("void add(const {}& v)", view_type(self.registry, element))],
                    &["serialize(_out, v);", "_count++;"],
                ));
                text
            }
            TypeShape::Scalar | TypeShape::Vector(_) | TypeShape::Variant(_) => {
                let param = element.param_type();
                let mut text = method(
                    &[&format!("{}& add({} t) &", node_name, param)],
                    &["serialize(_out, t);", "_count++;", "return *this;"],
                );
                text.push_str(&method(
                    &[&format!("{}&& add({} t) &&", node_name, param)],
                    &["serialize(_out, t);", "_count++;", "return std::move(*this);"],
                ));
                text
            }
        };
        methods.push_str(&method(
            &[&format!("{}<Output> end_{}() &&", next, name)],
            &["_size.set(_out, _count);", CONTINUE],
        ));
        methods.push_str(&method(
            &["vector_position pos() const"],
            &["return vector_position{_out.pos(), _count};"],
        ));
        methods.push_str(&method(
            &["void rollback(const vector_position& vp)"],
            &["_out.retract(vp.pos);", "_count = vp.count;"],
        ));

        let ctor = format!(
            "    {node_name}(Output& out, state_of_{base}<Output> state)\n        : _out(out)\n        , _state(std::move(state))\n        , _size(start_place_holder(out))\n        {{}}"
        );
        self.node(
            out,
            &node_name,
            &base,
            &["place_holder<Output> _size;", "size_type _count = 0;"],
            Some(&ctor),
            &methods,
        );

        let mut text = method(&[&format!("{}<Output> start_{}() &&", node_name, name)], &[CONTINUE]);
        text.push_str(&method(
            &[&format!("{}<Output> skip_{}() &&", next, name)],
            &["serialize(_out, size_type(0));", CONTINUE],
        ));
        Ok(text)
    }

    /// Writer for one optional vector element, shared by every vector of the
    /// same element type. Returns its name.
    fn optional_node(&mut self, element: &Type, payload: &Type, out: &mut String) -> Result<String, IdlError> {
        let name = format!("writer_of_{}", element.flat_type());
        if self.structs.contains(&name) {
            return Ok(name);
        }

        let mut methods = method(&["void skip()"], &["serialize(_out, false);"]);
        match self.registry.shape(payload) {
            TypeShape::Scalar => {
                methods.push_str(&method(
                    &[&format!("void write({} obj)", const_ref(payload))],
                    &["serialize(_out, true);", "serialize(_out, obj);"],
                ));
            }
            TypeShape::Writable(n) => {
                methods.push_str(&method(
                    &[&format!("void write(const {}& obj)", view_type(self.registry, payload))],
                    &["serialize(_out, true);", "serialize(_out, obj);"],
                ));
                methods.push_str(&method(
                    &[&format!("writer_of_{}<Output> write()", flat(n))],
                    &["serialize(_out, true);", "return {_out};"],
                ));
            }
            TypeShape::Optional(_) | TypeShape::Vector(_) | TypeShape::Variant(_) => {
                return Err(unsupported("optional", payload));
            }
        }

        self.structs.insert(name.clone());
        emit(out, &format!(
            "\ntemplate<typename Output>\nstruct {name} {{\n    Output& _out;\n{methods}\n}};"
        ));
        Ok(name)
    }

    /// One method per alternative, each writing its tag inside a frame.
    fn variant_member(&mut self, alternatives: &[Type], name: &str, path: &[String], out: &mut String) -> Result<String, IdlError> {
        let next = format!("after_{}__{}", join(path), name);
        let vpath = child(path, name);
        let vstate = join(&vpath);

        let mut text = String::new();
        for (index, alternative) in alternatives.iter().enumerate() {
            let tag = format!("serialize(_out, uint32_t({}));", index);
            let open = ["auto tag_frame = start_frame(_out);".to_string(), tag.clone()];
            let close = ["tag_frame.end(_out);".to_string()];
            let suffix = alternative.flat_type();
            let open_region = format!("state_of_{}<Output> state{{ start_frame(_out), std::move(_state) }};", vstate);

            match self.registry.shape(alternative) {
                TypeShape::Writable(n) if self.registry.is_stub(n) => {
                    text.push_str(&callback(&format!("{}_{}", name, suffix), &next, n, &open, &close));
                }
                TypeShape::Writable(n) => {
                    let cls = self.registry.writable(n)?;
                    let sub = child(&vpath, &suffix);
                    let entry_name = join(&sub);
                    let terminal = method(
                        &[&format!("{}<Output> end_{}() &&", next, suffix)],
                        &[
                            "_state.f.end(_out);",
                            "_state._parent.f.end(_out);",
                            "return { _out, std::move(_state._parent._parent) };",
                        ],
                    );
                    self.chain(cls, &sub, &entry_name, Entry::Nested, &terminal, out)?;

                    text.push_str(&method(
                        &[&format!("{}<Output> start_{}_{}() &&", entry_name, name, suffix)],
                        &[&open_region, &tag, "return { _out, std::move(state) };"],
                    ));
                    let mut body: Vec<String> = open.to_vec();
                    body.push("serialize(_out, t);".to_string());
                    body.extend(close.iter().cloned());
                    body.push(CONTINUE.to_string());
                    text.push_str(&method_owned(
                        &[format!("{}<Output> write_{}_{}(const {}& t) &&", next, name, suffix, n)],
                        &body,
                    ));
                }
                TypeShape::Variant(inner) => {
                    // The alternative region holds a single pseudo-member
                    // `variant`, closed by `end_variant()`.
                    let terminal = method(
                        &[&format!("{}<Output> end_variant() &&", next)],
                        &["_state.f.end(_out);", "return { _out, std::move(_state._parent) };"],
                    );
                    self.node(out, &format!("after_{}__variant", vstate), &vstate, &[], None, &terminal);
                    let methods = self.variant_member(inner, "variant", &vpath, out)?;
                    let node_name = format!("{}__variant", vstate);
                    self.node(out, &node_name, &vstate, &[], None, &methods);

                    text.push_str(&method(
                        &[&format!("{}<Output> start_{}_variant() &&", node_name, name)],
                        &[&open_region, &tag, "return { _out, std::move(state) };"],
                    ));
                }
                TypeShape::Scalar | TypeShape::Optional(_) | TypeShape::Vector(_) => {
                    text.push_str(&value_writers(&format!("{}_{}", name, suffix), &next, alternative, &open, &close));
                }
            }
        }
        Ok(text)
    }

    fn node(&mut self, out: &mut String, name: &str, state: &str, fields: &[&str], ctor: Option<&str>, methods: &str) {
        if !self.structs.insert(name.to_string()) {
            return;
        }
        let mut text = format!(
            "\ntemplate<typename Output>\nstruct {} {{\n    Output& _out;\n    state_of_{}<Output> _state;",
            name, state
        );
        for field in fields {
            text.push_str("\n    ");
            text.push_str(field);
        }
        if let Some(ctor) = ctor {
            text.push_str("\n\n");
            text.push_str(ctor);
        }
        text.push_str(methods);
        text.push_str("\n};");
        emit(out, &text);
    }
}

fn entry_ctor(entry_name: &str, path: &[String], entry: Entry, is_final: bool) -> String {
    let frame = if is_final { "{}" } else { "start_frame(out)" };
    match (entry, path.split_last()) {
        (Entry::Nested, Some((_, parent))) if !parent.is_empty() => format!(
            "    {entry_name}(Output& out, state_of_{parent}<Output> state)\n        : _out(out)\n        , _state{{{frame}, std::move(state)}}\n        {{}}",
            parent = join(parent),
        ),
        _ if is_final => format!("    {entry_name}(Output& out)\n        : _out(out)\n        , _state{{}}\n        {{}}"),
        _ => format!("    {entry_name}(Output& out)\n        : _out(out)\n        , _state{{{frame}}}\n        {{}}"),
    }
}

/// `write_<suffix>(v)`, plus `write_fragmented_<suffix>` for bytes-like
/// types. `open` and `close` surround the serialized value.
fn value_writers(suffix: &str, next: &str, t: &Type, open: &[String], close: &[String]) -> String {
    let fragmented = matches!(t, Type::Basic(b) if FRAGMENTED_TYPES.contains(&b.name.as_str()));
    let param = if fragmented { format!("{}_view", t.name()) } else { const_ref(t) };

    let body = |write: &str| {
        let mut body: Vec<String> = open.to_vec();
        body.push(write.to_string());
        body.extend(close.iter().cloned());
        body.push(CONTINUE.to_string());
        body
    };

    let mut text = method_owned(
        &[format!("{}<Output> write_{}({} t) &&", next, suffix, param)],
        &body("serialize(_out, t);"),
    );
    if fragmented {
        text.push_str(&method_owned(
            &[
                "template<typename FragmentedBuffer>".to_string(),
                "requires FragmentRange<FragmentedBuffer>".to_string(),
                format!("{}<Output> write_fragmented_{}(FragmentedBuffer&& fragments) &&", next, suffix),
            ],
            &body("serialize_fragmented(_out, std::forward<FragmentedBuffer>(fragments));"),
        ));
    }
    text
}

/// `<method_name>(f)` handing `f` the root writer of the stub type `n`.
fn callback(method_name: &str, next: &str, n: &str, open: &[String], close: &[String]) -> String {
    let mut body: Vec<String> = open.to_vec();
    body.push(format!("f(writer_of_{}<Output>(_out));", flat(n)));
    body.extend(close.iter().cloned());
    body.push(CONTINUE.to_string());
    method_owned(
        &[
            "template<typename Serializer>".to_string(),
            format!("{}<Output> {}(Serializer&& f) &&", next, method_name),
        ],
        &body,
    )
}

fn unsupported(context: &str, t: &Type) -> IdlError {
    let type_name = t.param_type();
    error!(context, type_name = %type_name, "unsupported type shape");
    IdlError::UnsupportedType {
        context: context.to_string(),
        type_name,
    }
}

/// A member function of a node, indented for a struct body.
fn method(header: &[&str], body: &[&str]) -> String {
    let mut text = String::from("\n");
    for line in header {
        text.push_str("\n    ");
        text.push_str(line);
    }
    text.push_str(" {");
    for line in body {
        text.push_str("\n        ");
        text.push_str(line);
    }
    text.push_str("\n    }");
    text
}

fn method_owned(header: &[String], body: &[String]) -> String {
    let header: Vec<&str> = header.iter().map(String::as_str).collect();
    let body: Vec<&str> = body.iter().map(String::as_str).collect();
    method(&header, &body)
}

fn const_ref(t: &Type) -> String {
    match t {
        Type::Basic(b) => format!("const {}&", b.name),
        Type::Template(_) => format!("const {}&", t.param_type()),
    }
}

fn flat(name: &str) -> String {
    name.replace("::", "__")
}

fn join(path: &[String]) -> String {
    path.join("__")
}

fn child(path: &[String], name: &str) -> Vec<String> {
    let mut path = path.to_vec();
    path.push(name.to_string());
    path
}
