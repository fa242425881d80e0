//! Gullwing lead template.
//!
//! The East template is built in place at the body's +X side: a bar from
//! inside the body out to the toe, two rounded box cuts that leave the
//! S-bend, outer bend fillets, then a trim along the draft angle so the lead
//! ends flush with the lower draft face. QFP packages also get a North
//! template rotated onto the +Y side.

use nalgebra::{UnitQuaternion, Vector3};
use tracing::debug;

use super::{step, INNER_BEND_RADIUS_RATIO, PIN_TEMPLATE_NORTH};
use crate::document::Document;
use crate::error::{SynthError, SynthResult};
use crate::kernel::{Axis, EdgeSelector, GeometryKernel, Placement};
use crate::package::{FootprintFamily, PackageSpec};

/// Builds the East gullwing template and, for QFP, the North one.
///
/// # Errors
///
/// Returns [`SynthError::Configuration`] when the lead would enter the body
/// below the upper pivot, before any geometry is created. Kernel failures
/// are wrapped with the step that raised them.
pub fn build_gullwing_template<K: GeometryKernel>(
    doc: &mut Document<K>,
    spec: &PackageSpec,
) -> SynthResult<()> {
    let body = &spec.body;
    let pin = &spec.pin;
    let name = spec.names.pin_template.as_str();
    let (a, b) = (body.a, body.b);
    let (l, w, t, tp, fr, hpe) = (pin.l, pin.w, pin.t, pin.tp, pin.fr, pin.hpe);
    let draft = tp * body.mold_angle().tan();

    // The lead bottom must clear the upper pivot or it pokes out of the draft.
    if hpe - tp / 2.0 < body.hpph {
        return Err(SynthError::configuration(format!(
            "lead underside Hpe - Tp/2 ({}) is below the upper pivot height Hpph ({})",
            hpe - tp / 2.0,
            body.hpph
        )));
    }
    debug!(l, w, t, tp, fr, hpe, "Building gullwing template");

    doc.add_box(
        name,
        l / 2.0 - a / 2.0 + draft,
        w,
        hpe + tp / 2.0,
        Placement::translation(a / 2.0 - draft, -w / 2.0, 0.0),
    )
    .map_err(step("create lead bar"))?;

    let inner_radius = INNER_BEND_RADIUS_RATIO * fr;
    let foot_bend = EdgeSelector::along(Axis::Y, l / 2.0 - t + tp, tp);
    doc.cut_with_box(
        name,
        l,
        l,
        l,
        Placement::translation(l / 2.0 - t + tp, -w / 2.0, tp),
        Some((&foot_bend, inner_radius)),
    )
    .map_err(step("cut lead foot"))?;

    let shoulder_bend = EdgeSelector::along(Axis::Y, l / 2.0 - t, hpe - tp / 2.0);
    doc.cut_with_box(
        name,
        l / 2.0 - t,
        w,
        hpe - tp / 2.0,
        Placement::translation(0.0, -w / 2.0, 0.0),
        Some((&shoulder_bend, inner_radius)),
    )
    .map_err(step("cut lead shoulder"))?;

    if fr > 0.0 {
        let outer = EdgeSelector::along(Axis::Y, l / 2.0 - t + tp, hpe + tp / 2.0)
            .or(EdgeSelector::along(Axis::Y, l / 2.0 - t, 0.0));
        doc.fillet(name, &outer, fr)
            .map_err(step("fillet lead bends"))?;
    }

    let trim_height = a - (hpe - tp / 2.0);
    let trim_rotation =
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), (-90.0 - body.ma_deg).to_radians());
    doc.cut_with_box(
        name,
        a,
        a,
        trim_height,
        Placement::new(Vector3::new(a / 2.0, -w / 2.0, hpe - tp / 2.0), trim_rotation),
        None,
    )
    .map_err(step("trim lead at draft"))?;

    if spec.family == FootprintFamily::Qfp {
        let y_offset = if (a - b).abs() > f64::EPSILON {
            b / 2.0 - a / 2.0
        } else {
            0.0
        };
        doc.copy(name, PIN_TEMPLATE_NORTH, Placement::at_rotated_z(0.0, y_offset, 0.0, 90.0))
            .map_err(step("create north lead template"))?;
        doc.cut_with_box(
            PIN_TEMPLATE_NORTH,
            a,
            a,
            a,
            Placement::translation(w / 2.0, b / 2.0 - draft, 0.0),
            None,
        )
        .map_err(step("normalize north lead template"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{KernelOp, PolyKernel};
    use crate::package::tests::soic8;
    use crate::params::ParamValue;

    fn doc() -> Document<PolyKernel> {
        Document::new("Test", PolyKernel::new())
    }

    #[test]
    fn template_spans_body_edge_to_toe() {
        let spec = PackageSpec::from_params(&soic8()).unwrap();
        let mut d = doc();
        build_gullwing_template(&mut d, &spec).unwrap();
        let id = d.solid("PinTemplate").unwrap();
        let (lo, hi) = d.kernel().bounding_box(id).unwrap();
        assert!((hi.x - spec.pin.l / 2.0).abs() < 1e-9);
        assert!(lo.z.abs() < 1e-9, "toe sits on the seating plane");
        assert!(
            (hi.z - (spec.pin.hpe + spec.pin.tp / 2.0)).abs() < 1e-9,
            "lead top at Hpe + Tp/2"
        );
        assert!((hi.y - spec.pin.w / 2.0).abs() < 1e-9);
        assert!(!d.contains(PIN_TEMPLATE_NORTH));
        assert!(!d.contains(crate::document::CUTTER));
    }

    #[test]
    fn qfp_gets_north_template() {
        let mut params = soic8();
        params.insert("newModelName", ParamValue::Text("QFP50P900X900X120-64N".into()));
        params.insert("B", ParamValue::Float(3.9));
        let spec = PackageSpec::from_params(&params).unwrap();
        let mut d = doc();
        build_gullwing_template(&mut d, &spec).unwrap();
        let id = d.solid(PIN_TEMPLATE_NORTH).unwrap();
        let (lo, hi) = d.kernel().bounding_box(id).unwrap();
        assert!((hi.y - spec.pin.l / 2.0).abs() < 1e-9);
        assert!((lo.x + spec.pin.w / 2.0).abs() < 1e-9);
        assert!((hi.x - spec.pin.w / 2.0).abs() < 1e-9);
    }

    #[test]
    fn low_entry_fails_before_geometry() {
        let mut params = soic8();
        // Hpe - Tp/2 = 0.9 < Hpph = 1.0
        params.insert("Hpe", ParamValue::Float(1.0));
        let spec = PackageSpec::from_params(&params).unwrap();
        let mut d = doc();
        let err = build_gullwing_template(&mut d, &spec).unwrap_err();
        assert!(matches!(err, SynthError::Configuration { .. }));
        assert!(d.kernel().journal().is_empty());
    }

    #[test]
    fn flat_lead_skips_outer_fillet() {
        let mut params = soic8();
        params.insert("Fr", ParamValue::Float(0.0));
        let spec = PackageSpec::from_params(&params).unwrap();
        let mut d = doc();
        build_gullwing_template(&mut d, &spec).unwrap();
        assert!(!d
            .kernel()
            .journal()
            .iter()
            .any(|op| matches!(op, KernelOp::Fillet { .. })));
    }
}
