use clap::Parser;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use idlc_compiler::{compile_idl, general_include, parse_idl, CompileOptions, GeneratedHeaders, OutputPaths};
use idlc_compiler::error::IdlError;

#[derive(Parser)]
#[command(name = "idlc")]
#[command(about = "Generate C++ serializers, views and writers from IDL files", long_about = None)]
struct Cli {
    /// Input `.idl.hh` file
    #[arg(short = 'f', long = "file", required_unless_present = "files")]
    file: Option<PathBuf>,

    /// Output declaration header (the implementation header replaces `.hh`
    /// with `.impl.hh`). Defaults to the input name with `.dist.hh`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Wrap the generated code in this namespace
    #[arg(long = "ns")]
    namespace: Option<String>,

    /// Print the annotated AST of `--file` as JSON instead of generating code
    #[arg(long)]
    dump_ast: bool,

    /// Generated `.dist.hh` headers to aggregate into a single include
    files: Vec<String>,
}

fn main() -> Result<(), IdlError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    if !cli.files.is_empty() {
        let paths = OutputPaths::for_general_include(cli.output.as_deref());
        return write_headers(&paths, &general_include(&cli.files));
    }

    let Some(input) = &cli.file else {
        return Ok(());
    };
    let text = fs::read_to_string(input)?;
    info!(input = %input.display(), "compiling");

    if cli.dump_ast {
        let declarations = parse_idl(&text)?;
        let json = serde_json::to_string_pretty(&declarations)?;
        println!("{}", json);
        return Ok(());
    }

    let options = CompileOptions { namespace: cli.namespace.clone() };
    let headers = compile_idl(&text, &options)?;
    let paths = OutputPaths::for_input(input, cli.output.as_deref());
    write_headers(&paths, &headers)?;
    println!(
        "Compiled {} → {}, {}",
        input.display(),
        paths.declarations.display(),
        paths.implementation.display()
    );
    Ok(())
}

/// Writes both headers or neither: each is staged in a temporary file next to
/// its target, and the declaration header is removed again if the
/// implementation header cannot be put in place.
fn write_headers(paths: &OutputPaths, headers: &GeneratedHeaders) -> Result<(), IdlError> {
    let declarations = stage(&paths.declarations, &headers.declarations)?;
    let implementation = stage(&paths.implementation, &headers.implementation)?;

    declarations.persist(&paths.declarations).map_err(|e| e.error)?;
    if let Err(e) = implementation.persist(&paths.implementation) {
        if let Err(remove) = fs::remove_file(&paths.declarations) {
            warn!(path = %paths.declarations.display(), error = %remove, "failed to remove header");
        }
        return Err(e.error.into());
    }
    Ok(())
}

fn stage(target: &Path, text: &str) -> Result<NamedTempFile, IdlError> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(text.as_bytes())?;
    Ok(file)
}
