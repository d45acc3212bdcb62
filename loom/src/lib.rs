pub mod attributes;
pub mod driver;
pub mod emitter;
pub mod error;
pub mod mode;
pub mod options;
pub mod registry;
pub mod scanner;

pub use attributes::{AttributeKey, RegionAttributes};
pub use error::{CompileError, ErrorKind};
pub use loom_style::Format;
pub use mode::Session;
pub use options::{CompileOptions, Dialect};
pub use registry::{ModeId, ModeRegistry, ModeSpec};

/// Result of a successful compilation.
#[derive(Debug, Clone)]
pub struct Output {
    pub code: String,
    /// Non-fatal findings.
    pub warnings: Vec<CompileError>,
}

/// Compile a document with the standard modes.
pub fn compile(source: &str, file_id: usize, options: &CompileOptions) -> Result<Output, Vec<CompileError>> {
    compile_with(&ModeRegistry::standard(), source, file_id, options)
}

/// Compile a document with a custom set of modes.
pub fn compile_with(
    registry: &ModeRegistry,
    source: &str,
    file_id: usize,
    options: &CompileOptions,
) -> Result<Output, Vec<CompileError>> {
    let mut session = Session::new(source, file_id, options);
    driver::run(registry, &mut session)?;
    Ok(Output {
        code: session.emitter.finish(),
        warnings: session.warnings,
    })
}
