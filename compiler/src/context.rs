use std::collections::BTreeSet;
use crate::registry::TypeRegistry;

/// Library-side knobs of one compilation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileOptions {
    /// Wraps everything emitted in `namespace <ns> { ... }`.
    pub namespace: Option<String>,
}

/// Everything the generators share during one compilation. A fresh context
/// is built per input file, so nothing leaks between compilations.
#[derive(Debug)]
pub struct CompilerContext {
    pub options:  CompileOptions,
    pub registry: TypeRegistry,

    /// View signatures whose variant `skip`/`deserialize` helpers exist.
    pub variant_helpers: BTreeSet<String>,
    /// Writable types whose root `writer_of_` chain exists.
    pub root_writers: BTreeSet<String>,
    /// Names of every writer struct (states and nodes) emitted so far.
    pub writer_structs: BTreeSet<String>,
}

impl CompilerContext {
    pub fn new(registry: TypeRegistry, options: CompileOptions) -> Self {
        Self {
            options,
            registry,
            variant_helpers: BTreeSet::new(),
            root_writers:    BTreeSet::new(),
            writer_structs:  BTreeSet::new(),
        }
    }
}
