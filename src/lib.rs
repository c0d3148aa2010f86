//! @ai:module:intent Repository enrichment library: synthesize and remove REST operation annotations
//! @ai:module:layer infrastructure
//! @ai:module:public_api ast, config, enricher, error, javadoc, matcher, operations, output, parser, policy, printer, resolver, synthesis, walker
//! @ai:module:stateless true
//!
//! # Repodoc
//!
//! Walks Java sources, finds Spring Data style repository interfaces and attaches
//! JAX-RS and OpenAPI annotations describing the REST operations each repository
//! exposes. Every annotation it adds has an exact removal counterpart.
//!
//! ## Example
//!
//! ```rust,no_run
//! use repodoc_enricher::{enricher, output, EnrichConfig, FileFilter, Phase};
//! use std::path::Path;
//!
//! let config = EnrichConfig::default();
//! let filter = FileFilter::new(&[], &["**/generated/**".to_string()]).unwrap();
//! let report = enricher::enrich_directory(Path::new("src/main/java"), &filter, &config, Phase::Add).unwrap();
//! println!("{}", output::format_report(&report, output::OutputFormat::Text));
//! ```

pub mod ast;
pub mod config;
pub mod enricher;
pub mod error;
pub mod javadoc;
pub mod matcher;
pub mod operations;
pub mod output;
pub mod parser;
pub mod policy;
pub mod printer;
pub mod resolver;
pub mod synthesis;
pub mod walker;

pub use ast::{Annotation, AnnotationValue, CompilationUnit, MethodDeclaration, TypeDeclaration, TypeRef};
pub use config::{AncestorOrder, BaseKind, EnrichConfig};
pub use enricher::{enrich_directory, enrich_file, inspect_file, EnrichReport, FileReport, FileStatus, Inspection};
pub use error::{Error, Result};
pub use operations::{Operation, Outcome, Phase};
pub use output::{format_inspection, format_report, to_json, OutputFormat};
pub use parser::parse_file;
pub use printer::{print_unit, write_unit};
pub use walker::{for_each_candidate_file, FileFilter};
