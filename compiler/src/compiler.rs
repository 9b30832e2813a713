use std::path::{Path, PathBuf};
use tracing::debug;
use crate::{
    context::{CompileOptions, CompilerContext},
    gen_declarations::{close_namespace, declarations_prologue, implementation_prologue, BOILERPLATE},
    gen_serializer, gen_view, gen_writer,
    metadata::annotate,
    registry::TypeRegistry,
    types::Declaration,
    verifier::verify_schema,
    tokenizer::tokenize_schema,
    parser::parse_schema,
    utils::emit,
    error::IdlError,
};

pub const DEFAULT_GENERAL_INCLUDE: &str = "serializer.dist.hh";

/// The two headers produced for one IDL file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedHeaders {
    /// `serializer<T>` declarations, included where the types are declared.
    pub declarations:   String,
    /// Serializer bodies, views and writers.
    pub implementation: String,
}

/// Where the two headers of a compilation are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub declarations:   PathBuf,
    pub implementation: PathBuf,
}

impl OutputPaths {
    /// `output` if given, otherwise `input` with `.idl.hh` replaced by
    /// `.dist.hh`. The implementation header replaces the final `.hh` of the
    /// declaration header with `.impl.hh`.
    pub fn for_input(input: &Path, output: Option<&Path>) -> OutputPaths {
        let declarations = match output {
            Some(output) => output.to_path_buf(),
            None => replace_suffix(input, ".idl.hh", ".dist.hh"),
        };
        Self::from_declarations(declarations)
    }

    pub fn for_general_include(output: Option<&Path>) -> OutputPaths {
        let declarations = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_GENERAL_INCLUDE));
        Self::from_declarations(declarations)
    }

    fn from_declarations(declarations: PathBuf) -> OutputPaths {
        let implementation = replace_suffix(&declarations, ".hh", ".impl.hh");
        OutputPaths { declarations, implementation }
    }
}

/// Appends `add` to `path`, after removing `strip` if the path ends with it.
fn replace_suffix(path: &Path, strip: &str, add: &str) -> PathBuf {
    let text = path.to_string_lossy();
    let stem = text.strip_suffix(strip).unwrap_or(&text);
    PathBuf::from(format!("{}{}", stem, add))
}

/// Tokenizes, parses, annotates and verifies an IDL file.
pub fn parse_idl(text: &str) -> Result<Vec<Declaration>, IdlError> {
    let tokens = tokenize_schema(text)?;
    debug!(tokens = tokens.len(), "tokenized");

    let mut declarations = parse_schema(&tokens, text)?;
    debug!(declarations = declarations.len(), "parsed");

    annotate(&mut declarations);
    verify_schema(&declarations)?;
    Ok(declarations)
}

/// Compile an IDL file into its declaration and implementation headers.
/// Nothing is returned unless every stage succeeded.
pub fn compile_idl(text: &str, options: &CompileOptions) -> Result<GeneratedHeaders, IdlError> {
    let declarations = parse_idl(text)?;
    let registry = TypeRegistry::build(&declarations);
    let order = registry.sort_dependencies()?;
    debug!(order = ?order, "writable types ordered");

    let mut ctx = CompilerContext::new(registry, options.clone());
    let mut hout = String::new();
    let mut cout = String::new();

    declarations_prologue(&ctx, &mut hout);
    implementation_prologue(&ctx, &mut cout);

    gen_serializer::generate(&ctx, &declarations, &mut hout, &mut cout);
    if ctx.registry.has_writable_types() {
        gen_view::generate(&mut ctx, &order, &mut cout)?;
        gen_writer::generate(&mut ctx, &order, &mut cout)?;
    }

    close_namespace(&ctx, &mut hout);
    close_namespace(&ctx, &mut cout);

    debug!(
        declarations = hout.len(),
        implementation = cout.len(),
        writer_structs = ctx.writer_structs.len(),
        "generation finished"
    );
    Ok(GeneratedHeaders {
        declarations:   hout,
        implementation: cout,
    })
}

/// Aggregator headers including every generated declaration header in
/// `files`, and their implementation counterparts.
pub fn general_include(files: &[String]) -> GeneratedHeaders {
    let mut hout = String::new();
    let mut cout = String::new();
    emit(&mut hout, BOILERPLATE);
    emit(&mut cout, BOILERPLATE);

    for file in files {
        emit(&mut hout, &format!("#include \"{}\"", file));
        emit(&mut cout, &format!("#include \"{}\"", file.replace(".dist.hh", ".dist.impl.hh")));
    }

    GeneratedHeaders {
        declarations:   hout,
        implementation: cout,
    }
}
