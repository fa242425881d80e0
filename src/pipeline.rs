//! End-to-end run: parameters in, model files out.

use std::path::PathBuf;

use tracing::info;

use crate::config::Config;
use crate::document::Document;
use crate::error::{SynthError, SynthResult};
use crate::export;
use crate::kernel::PolyKernel;
use crate::package::PackageSpec;
use crate::params::{OutputPaths, ParamSet};
use crate::report;
use crate::synth::{self, Synthesis};

/// What a successful run produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// Synthesis result.
    pub synthesis: Synthesis,
    /// The finished document, holding only the fused model.
    pub document: Document<PolyKernel>,
    /// Files written, in write order.
    pub written: Vec<PathBuf>,
}

/// Synthesizes the package described by `params` and writes the artefacts
/// enabled in `config` to `paths`.
///
/// # Errors
///
/// Returns the first error from validation, synthesis or output.
pub fn run(params: &ParamSet, paths: &OutputPaths, config: &Config) -> SynthResult<RunOutcome> {
    let spec = PackageSpec::from_params(params)?;
    std::fs::create_dir_all(&paths.model_dir).map_err(|e| SynthError::io(&paths.model_dir, e))?;

    let kernel = PolyKernel::with_cylinder_segments(config.kernel.cylinder_segments);
    let mut document = Document::new(paths.doc_name.clone(), kernel);
    let synthesis = synth::synthesize(&mut document, &spec, params)?;

    let mut written = Vec::new();
    if config.output.description_log {
        report::write_description(&paths.description_log, &synthesis.description)?;
        written.push(paths.description_log.clone());
    }
    if config.output.native {
        export::save_native(&document, &paths.native)?;
        written.push(paths.native.clone());
    }
    if config.output.interchange {
        export::export_interchange(&document, &[spec.model_name.as_str()], &paths.interchange)?;
        written.push(paths.interchange.clone());
    }
    info!(
        model = %spec.model_name,
        files = written.len(),
        faces = synthesis.fusion.faces,
        "Run complete"
    );
    Ok(RunOutcome {
        synthesis,
        document,
        written,
    })
}
