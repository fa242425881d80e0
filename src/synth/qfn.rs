//! QFN pad templates.

use tracing::debug;

use super::{step, D_SHAPE_RADIUS_MARGIN, PIN_TEMPLATE_NORTH};
use crate::document::Document;
use crate::error::SynthResult;
use crate::kernel::{Axis, EdgeSelector, GeometryKernel, Placement};
use crate::package::{PackageSpec, TINY_DELTA_FOR_QFN};

/// Builds the East and North QFN pad templates.
///
/// Each pad ends just past the body side and runs `T` inward from there.
/// A pad length `L` shorter than the body moves that end inside the body.
///
/// # Errors
///
/// Kernel failures are wrapped with the step that raised them.
pub fn build_qfn_template<K: GeometryKernel>(
    doc: &mut Document<K>,
    spec: &PackageSpec,
) -> SynthResult<()> {
    let pin = &spec.pin;
    let name = spec.names.pin_template.as_str();
    let (a, b) = (spec.body.a, spec.body.b);
    let (l, w, t, tp) = (pin.l, pin.w, pin.t, pin.tp);
    let (east_end, north_end) = pad_ends(l, a, b);
    debug!(l, w, t, tp, east_end, north_end, d_shape = pin.d_shape, "Building QFN template");

    doc.add_box(name, l, w, tp, Placement::translation(east_end - t, -w / 2.0, 0.0))
        .map_err(step("create pad bar"))?;
    if pin.d_shape {
        let inner_end = EdgeSelector::along(Axis::Z, east_end - t, w / 2.0)
            .or(EdgeSelector::along(Axis::Z, east_end - t, -w / 2.0));
        doc.fillet(name, &inner_end, w / 2.0 - D_SHAPE_RADIUS_MARGIN)
            .map_err(step("round pad inner end"))?;
    }
    doc.cut_with_box(
        name,
        l,
        w,
        w.max(tp),
        Placement::translation(east_end + TINY_DELTA_FOR_QFN, -w / 2.0, 0.0),
        None,
    )
    .map_err(step("cut pad to length"))?;

    doc.copy(
        name,
        PIN_TEMPLATE_NORTH,
        Placement::at_rotated_z(0.0, north_end - east_end, 0.0, 90.0),
    )
    .map_err(step("create north pad template"))?;
    doc.cut_with_box(
        PIN_TEMPLATE_NORTH,
        w,
        l,
        t.max(tp),
        Placement::translation(-w / 2.0, north_end + TINY_DELTA_FOR_QFN, 0.0),
        None,
    )
    .map_err(step("cut north pad to body"))?;
    Ok(())
}

/// Outer pad ends on the East and North sides, never past the body.
fn pad_ends(l: f64, a: f64, b: f64) -> (f64, f64) {
    ((l / 2.0).min(a / 2.0), (l / 2.0).min(b / 2.0))
}
