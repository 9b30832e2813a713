//! idlc-compiler
//!
//! This crate implements:
//!  1) A tokenizer + parser for `.idl.hh` schema files,
//!  2) A metadata pass and a verifier (duplicate names per scope),
//!  3) A type registry with dependency ordering of writable types,
//!  4) C++ generation: `serializer<T>` declarations and bodies, lazy views,
//!     and writer state machines (`compile_idl` → `GeneratedHeaders`),
//!  5) Error types (`IdlError`).

pub mod error;
pub mod types;
pub mod utils;
pub mod tokenizer;
pub mod parser;
pub mod metadata;
pub mod verifier;
pub mod registry;
pub mod context;
pub mod gen_declarations;
pub mod gen_serializer;
pub mod gen_view;
pub mod gen_writer;
pub mod compiler;

pub use compiler::compile_idl;
pub use compiler::general_include;
pub use compiler::parse_idl;
pub use compiler::{GeneratedHeaders, OutputPaths};
pub use context::CompileOptions;
pub use error::IdlError;
