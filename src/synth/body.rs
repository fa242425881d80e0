//! Package body with mold draft, pin-1 chamfer and marker.
//!
//! The draft is cut one face at a time. Each cut works on the face that is
//! currently north (+Y); the body is then turned so the next face comes
//! round to north. Cuts bake the current placement into the geometry and
//! every turn sets an absolute rotation, so a turn always rotates the body
//! relative to where the previous cut left it.

use nalgebra::{UnitQuaternion, Vector3};
use tracing::debug;

use super::{step, BODY_CUT_LENGTH_DELTA, BODY_CUT_POSITION_DELTA, MARKER_CUTTER};
use crate::document::Document;
use crate::error::SynthResult;
use crate::kernel::{Axis, EdgeSelector, GeometryKernel, Placement};
use crate::package::PackageSpec;

/// Derived body values the rest of the pipeline needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyOutput {
    /// Effective standoff.
    pub standoff: f64,
    /// Top face inset caused by the draft.
    pub mold_offset: f64,
    /// Pin-1 chamfer offset actually applied.
    pub chamfer_offset: f64,
}

/// Which body dimension spans the face currently facing north.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Span {
    /// The north face is `A` long and sits at `y = B/2`.
    A,
    /// The north face is `B` long and sits at `y = A/2`.
    B,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DraftStep {
    /// Upper draft cut, pivoting at `Hpph`.
    High(Span),
    /// Lower draft cut, pivoting at `Hppl`, shifted by this many position deltas.
    Low(Span, f64),
    /// 45 degree chamfer along the top of the north face, when configured.
    Pin1Chamfer,
    /// Set the body rotation about Z.
    Turn(f64),
}

const DRAFT_SEQUENCE: [DraftStep; 13] = [
    DraftStep::High(Span::A),
    DraftStep::Low(Span::A, 1.0),
    DraftStep::Turn(180.0),
    DraftStep::High(Span::A),
    DraftStep::Low(Span::A, 1.0),
    DraftStep::Turn(90.0),
    DraftStep::High(Span::B),
    DraftStep::Low(Span::B, 1.0),
    DraftStep::Turn(180.0),
    DraftStep::High(Span::B),
    DraftStep::Pin1Chamfer,
    DraftStep::Low(Span::B, 2.0),
    DraftStep::Turn(90.0),
];

fn x_rotation(radians: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), radians)
}

/// Builds the body and the pin-1 marker ink.
///
/// # Errors
///
/// Returns a kernel error when any cut or fillet fails.
pub fn build_body<K: GeometryKernel>(
    doc: &mut Document<K>,
    spec: &PackageSpec,
) -> SynthResult<BodyOutput> {
    let dims = &spec.body;
    let body = spec.names.body.as_str();
    let (a, b, h) = (dims.a, dims.b, dims.h);
    let k = spec.standoff();
    let mold_offset = dims.mold_offset();
    let chamfer = dims.chamfer_offset;
    debug!(a, b, h, k, ma_deg = dims.ma_deg, mold_offset, chamfer, "Building body");

    // Pin 1 ends up in the upper left corner.
    doc.add_box(body, b, a, h - k, Placement::at_rotated_z(a / 2.0, -b / 2.0, k, 90.0))
        .map_err(step("create body"))?;
    doc.cut_with_box(
        body,
        a,
        h - k,
        h - k,
        Placement::translation(-a / 2.0, b / 2.0, k),
        None,
    )
    .map_err(step("normalize body"))?;

    if dims.ma_deg > 0.0 {
        for draft in DRAFT_SEQUENCE {
            apply_draft_step(doc, spec, draft, mold_offset)?;
        }
        if dims.fillet_radius > 0.0 {
            let mut selector = EdgeSelector::InPlaneZ(h).or(EdgeSelector::InPlaneZ(k));
            if chamfer > 0.0 {
                selector = selector.excluding(EdgeSelector::along(
                    Axis::Y,
                    -a / 2.0 + mold_offset + chamfer,
                    h,
                ));
            }
            doc.fillet(body, &selector, dims.fillet_radius)
                .map_err(step("fillet body edges"))?;
        }
    }

    let marker = &spec.marker;
    let cx = -a / 2.0 + mold_offset + chamfer + dims.fillet_radius + marker.offset + marker.radius;
    let cy = b / 2.0 - mold_offset - dims.fillet_radius - marker.offset - marker.radius;
    let cz = h - marker.indent;
    doc.add_cylinder(MARKER_CUTTER, marker.radius, h, Placement::translation(cx, cy, cz))
        .map_err(step("create marker recess tool"))?;
    doc.cut_with_object(body, MARKER_CUTTER, false)
        .map_err(step("cut marker recess"))?;
    doc.add_cylinder(
        &spec.names.pin1_mark,
        marker.radius,
        marker.height,
        Placement::translation(cx, cy, cz),
    )
    .map_err(step("create pin-1 marker"))?;

    Ok(BodyOutput {
        standoff: k,
        mold_offset,
        chamfer_offset: chamfer,
    })
}

fn apply_draft_step<K: GeometryKernel>(
    doc: &mut Document<K>,
    spec: &PackageSpec,
    draft: DraftStep,
    mold_offset: f64,
) -> SynthResult<()> {
    let dims = &spec.body;
    let body = spec.names.body.as_str();
    let ma = dims.mold_angle();
    let span = |s: Span| match s {
        Span::A => (dims.a, dims.b / 2.0),
        Span::B => (dims.b, dims.a / 2.0),
    };

    match draft {
        DraftStep::High(s) => {
            let (side, north) = span(s);
            let at = Vector3::new(-side / 2.0 - BODY_CUT_POSITION_DELTA, north, dims.hpph);
            doc.cut_with_box(
                body,
                side + BODY_CUT_LENGTH_DELTA,
                side,
                side,
                Placement::new(at, x_rotation(ma)),
                None,
            )
            .map_err(step("upper draft cut"))
        }
        DraftStep::Low(s, shift) => {
            let (side, north) = span(s);
            let at = Vector3::new(
                -side / 2.0 - shift * BODY_CUT_POSITION_DELTA,
                north,
                dims.hppl,
            );
            doc.cut_with_box(
                body,
                side + BODY_CUT_LENGTH_DELTA,
                side,
                side,
                Placement::new(at, x_rotation(3.0 * std::f64::consts::FRAC_PI_2 - ma)),
                None,
            )
            .map_err(step("lower draft cut"))
        }
        DraftStep::Pin1Chamfer if dims.chamfer_offset > 0.0 => {
            let b = dims.b;
            let at = Vector3::new(
                -b / 2.0,
                dims.a / 2.0 - mold_offset - dims.chamfer_offset,
                dims.h,
            );
            doc.cut_with_box(
                body,
                b,
                b,
                b,
                Placement::new(at, x_rotation(-std::f64::consts::FRAC_PI_4)),
                None,
            )
            .map_err(step("pin-1 chamfer cut"))
        }
        DraftStep::Pin1Chamfer => Ok(()),
        DraftStep::Turn(degrees) => doc
            .rotate_about_z(body, degrees)
            .map_err(step("turn body")),
    }
}
