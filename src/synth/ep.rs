//! Exposed pads.

use tracing::debug;

use super::step;
use crate::document::{Document, CUTTER};
use crate::error::SynthResult;
use crate::kernel::{Axis, EdgeSelector, GeometryKernel, Placement};
use crate::package::{EpKind, PackageSpec};

/// Builds the exposed pad `name` centred on `(x, y)` and sinks it into the
/// body.
///
/// Corners are rounded by `Rt`. The pin-1 corner (upper left) is either
/// chamfered by `Ft` or notched by a cylinder of radius
/// `epPin1ChamferRadius`, and is left out of the corner rounding when
/// either is configured.
///
/// # Errors
///
/// Returns [`crate::error::SynthError::Configuration`] for a pad without
/// dimensions or with both chamfer styles, before any geometry is created.
pub fn build_exposed_pad<K: GeometryKernel>(
    doc: &mut Document<K>,
    spec: &PackageSpec,
    name: &str,
    kind: &EpKind,
    x: f64,
    y: f64,
) -> SynthResult<()> {
    let dims = spec.ep_dims(kind)?;
    dims.validate(name)?;
    let (wt, tt, tp) = (dims.wt, dims.tt, spec.pin.tp);
    debug!(pad = name, x, y, wt, tt, ft = dims.ft, rt = dims.rt, "Building exposed pad");

    doc.add_box(name, wt, tt, tp, Placement::translation(x - wt / 2.0, y - tt / 2.0, 0.0))
        .map_err(step("create exposed pad"))?;

    let (left, right) = (x - wt / 2.0, x + wt / 2.0);
    let (bottom, top) = (y - tt / 2.0, y + tt / 2.0);
    let pin1_corner = EdgeSelector::along(Axis::Z, left, top);

    if dims.rt > 0.0 {
        let mut corners = EdgeSelector::along(Axis::Z, right, top)
            .or(EdgeSelector::along(Axis::Z, right, bottom))
            .or(EdgeSelector::along(Axis::Z, left, bottom));
        if !dims.has_pin1_chamfer() {
            corners = corners.or(pin1_corner.clone());
        }
        doc.fillet(name, &corners, dims.rt)
            .map_err(step("round exposed pad corners"))?;
    }

    if dims.ft > 0.0 {
        doc.chamfer(name, &pin1_corner, dims.ft)
            .map_err(step("chamfer exposed pad"))?;
    } else if dims.pin1_chamfer_radius > 0.0 {
        doc.add_cylinder(
            CUTTER,
            dims.pin1_chamfer_radius,
            tp,
            Placement::translation(left, top, 0.0),
        )
        .map_err(step("create exposed pad notch tool"))?;
        doc.cut_with_object(name, CUTTER, false)
            .map_err(step("notch exposed pad"))?;
    }

    doc.cut_with_object(&spec.names.body, name, true)
        .map_err(step("sink exposed pad into body"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SynthError;
    use crate::kernel::{KernelOp, PolyKernel};
    use crate::params::{ParamSet, ParamValue};
    use crate::synth::qfn::tests::qfn8;

    fn setup(params: &ParamSet) -> (Document<PolyKernel>, PackageSpec) {
        let spec = PackageSpec::from_params(params).unwrap();
        let mut d = Document::new("Test", PolyKernel::new());
        d.add_box("Body", 5.0, 5.0, 0.8, Placement::translation(-2.5, -2.5, 0.000_001))
            .unwrap();
        (d, spec)
    }

    fn pad_volume(d: &Document<PolyKernel>) -> f64 {
        d.kernel().volume(d.solid("Pin9").unwrap()).unwrap()
    }

    #[test]
    fn straight_chamfer_trims_pin1_corner() {
        let (mut d, spec) = setup(&qfn8());
        build_exposed_pad(&mut d, &spec, "Pin9", &EpKind::Default, 0.0, 0.0).unwrap();
        let full = 3.0 * 3.0 * 0.2;
        let chamfered = full - 0.5 * 0.3 * 0.3 * 0.2;
        assert!((pad_volume(&d) - chamfered).abs() < 1e-9);
        assert!(d.contains("Body"));
        let chamfers = d
            .kernel()
            .journal()
            .iter()
            .filter(|op| matches!(op, KernelOp::Chamfer { edges: 1, .. }))
            .count();
        assert_eq!(chamfers, 1);
    }

    #[test]
    fn rounded_corners_skip_chamfered_corner() {
        let mut params = qfn8();
        params.insert("Rt", ParamValue::Float(0.2));
        let (mut d, spec) = setup(&params);
        build_exposed_pad(&mut d, &spec, "Pin9", &EpKind::Default, 0.0, 0.0).unwrap();
        assert!(d
            .kernel()
            .journal()
            .iter()
            .any(|op| matches!(op, KernelOp::Fillet { edges: 3, .. })));
    }

    #[test]
    fn radius_notch_uses_cutter() {
        let mut params = qfn8();
        params.insert("Ft", ParamValue::Float(0.0));
        params.insert("epPin1ChamferRadius", ParamValue::Float(0.3));
        let (mut d, spec) = setup(&params);
        build_exposed_pad(&mut d, &spec, "Pin9", &EpKind::Default, 0.0, 0.0).unwrap();
        assert!(!d.contains(CUTTER));
        assert!(pad_volume(&d) < 3.0 * 3.0 * 0.2);
    }

    #[test]
    fn conflicting_chamfers_fail_before_geometry() {
        let (mut d, mut spec) = setup(&qfn8());
        if let Some(ep) = spec.ep.as_mut() {
            ep.pin1_chamfer_radius = 0.2;
        }
        let before = d.kernel().journal().len();
        let err = build_exposed_pad(&mut d, &spec, "Pin9", &EpKind::Default, 0.0, 0.0)
            .unwrap_err();
        assert!(matches!(err, SynthError::Configuration { .. }));
        assert_eq!(d.kernel().journal().len(), before);
        assert!(!d.contains("Pin9"));
    }
}
