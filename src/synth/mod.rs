//! Package synthesis.
//!
//! Builds the body, pin-1 marker, leads and exposed pads of one package in
//! a [`Document`], writes the description log text, then fuses everything
//! into one colored solid named after the model.
//!
//! The steps run strictly in order; later steps read geometry produced by
//! earlier ones.

mod body;
mod ep;
pub mod fusion;
mod gullwing;
mod pins;
mod qfn;

pub use body::{build_body, BodyOutput};
pub use ep::build_exposed_pad;
pub use fusion::{classify_unmatched, fuse_and_color, FaceSignature, FusionReport, Provenance};
pub use gullwing::build_gullwing_template;
pub use pins::build_pins;
pub use qfn::build_qfn_template;

use tracing::info;

use crate::document::Document;
use crate::error::{SynthError, SynthResult};
use crate::kernel::{GeometryKernel, KernelError};
use crate::package::PackageSpec;
use crate::params::ParamSet;
use crate::report;

/// Extra length added to the draft cutting boxes so they overhang both ends
/// of the face they cut.
pub const BODY_CUT_LENGTH_DELTA: f64 = 0.2;

/// Shift of the draft cutting boxes towards -X, half of the length delta.
pub const BODY_CUT_POSITION_DELTA: f64 = 0.1;

/// Inner bend radius of a gullwing lead, as a fraction of the outer radius.
pub const INNER_BEND_RADIUS_RATIO: f64 = 0.3;

/// Amount a D-shaped QFN pad's end radius stays under half the pad width.
pub const D_SHAPE_RADIUS_MARGIN: f64 = 0.000_01;

/// Object name of the North/South lead template.
pub const PIN_TEMPLATE_NORTH: &str = "pinTemplateNorth";

/// Object name of the transient cylinder that cuts the marker recess.
pub const MARKER_CUTTER: &str = "CylCuttingTool";

/// Names of the separate parts before fusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSet {
    /// Body object.
    pub body: String,
    /// Pin-1 marker ink object.
    pub marker: String,
    /// Leads and exposed pads, in pin order.
    pub pins: Vec<String>,
}

impl PartSet {
    /// All part names: body, pins, then marker.
    #[must_use]
    pub fn all(&self) -> Vec<&str> {
        let mut names = Vec::with_capacity(self.pins.len() + 2);
        names.push(self.body.as_str());
        names.extend(self.pins.iter().map(String::as_str));
        names.push(self.marker.as_str());
        names
    }
}

/// Result of a full synthesis run.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    /// Parts as they were before fusion.
    pub parts: PartSet,
    /// Description log text.
    pub description: String,
    /// Face attribution statistics.
    pub fusion: FusionReport,
}

/// Wraps a kernel error with the step that raised it.
pub(crate) fn step(operation: &'static str) -> impl Fn(KernelError) -> SynthError {
    move |e| SynthError::kernel(operation, e)
}

/// Builds body, marker, leads and pads, and gives each part its display
/// color.
///
/// # Errors
///
/// Returns the first configuration, family or kernel error.
pub fn build_parts<K: GeometryKernel>(
    doc: &mut Document<K>,
    spec: &PackageSpec,
) -> SynthResult<PartSet> {
    build_body(doc, spec)?;
    let pins = build_pins(doc, spec)?;

    let parts = PartSet {
        body: spec.names.body.clone(),
        marker: spec.names.pin1_mark.clone(),
        pins,
    };
    let set_color = step("set part colors");
    for pin in &parts.pins {
        doc.set_shape_color(pin, spec.colors.pins).map_err(&set_color)?;
    }
    doc.set_shape_color(&parts.body, spec.colors.body)
        .map_err(&set_color)?;
    doc.set_shape_color(&parts.marker, spec.colors.pin1_mark)
        .map_err(&set_color)?;
    Ok(parts)
}

/// Runs the whole pipeline: parts, description log, fusion and coloring.
///
/// # Errors
///
/// Returns the first error raised by any step.
pub fn synthesize<K: GeometryKernel>(
    doc: &mut Document<K>,
    spec: &PackageSpec,
    params: &ParamSet,
) -> SynthResult<Synthesis> {
    info!(model = %spec.model_name, family = %spec.family, "Synthesizing package");
    let parts = build_parts(doc, spec)?;
    let description = report::describe(doc, spec, params, &parts)?;
    let fusion = fuse_and_color(doc, spec, &parts)?;
    info!(
        faces = fusion.faces,
        unmatched = fusion.unmatched,
        "Package synthesized"
    );
    Ok(Synthesis {
        parts,
        description,
        fusion,
    })
}
