//! Lead instancing.

use tracing::{debug, info};

use super::{build_exposed_pad, build_gullwing_template, build_qfn_template, step, PIN_TEMPLATE_NORTH};
use crate::document::Document;
use crate::error::{SynthError, SynthResult};
use crate::kernel::{GeometryKernel, Placement};
use crate::package::{FootprintFamily, LeadKind, PackageSpec, PinEntry, PinSide};

/// Checks every lead against the family before any template is built.
fn check_leads(spec: &PackageSpec, family_kind: LeadKind) -> SynthResult<()> {
    for (name, entry) in &spec.pins {
        let PinEntry::Lead { kind, side, .. } = entry else {
            continue;
        };
        if *kind != family_kind {
            return Err(SynthError::configuration(format!(
                "{name} is a {kind} lead but {} packages use {family_kind} leads",
                spec.family
            )));
        }
        if *kind == LeadKind::Gullwing && side.is_north_south() && spec.family != FootprintFamily::Qfp {
            return Err(SynthError::configuration(format!(
                "{name}: gullwing leads on the {side:?} side need a QFP package, got {}",
                spec.family
            )));
        }
    }
    Ok(())
}

/// Builds the lead templates, places every pin and exposed pad, then drops
/// the templates. Returns the pin object names in pin order.
///
/// # Errors
///
/// - [`SynthError::UnsupportedFamily`] when the family has no lead shape.
/// - [`SynthError::Configuration`] for leads that do not fit the family.
/// - Kernel failures wrapped with the step that raised them.
pub fn build_pins<K: GeometryKernel>(
    doc: &mut Document<K>,
    spec: &PackageSpec,
) -> SynthResult<Vec<String>> {
    let family_kind = spec
        .family
        .lead_kind()
        .ok_or_else(|| SynthError::unsupported("footprint family", spec.family.to_string()))?;
    check_leads(spec, family_kind)?;

    match family_kind {
        LeadKind::Gullwing => build_gullwing_template(doc, spec)?,
        LeadKind::Qfn => build_qfn_template(doc, spec)?,
    }

    let east = spec.names.pin_template.as_str();
    let mut names = Vec::with_capacity(spec.pins.len());
    for (name, entry) in &spec.pins {
        match entry {
            PinEntry::Lead { kind, side, x, y } => {
                let placement = match side {
                    PinSide::East => Placement::at_rotated_z(0.0, *y, 0.0, 0.0),
                    PinSide::West => Placement::at_rotated_z(0.0, *y, 0.0, 180.0),
                    PinSide::North => Placement::at_rotated_z(*x, 0.0, 0.0, 0.0),
                    PinSide::South => Placement::at_rotated_z(*x, 0.0, 0.0, 180.0),
                };
                let template = if side.is_north_south() {
                    PIN_TEMPLATE_NORTH
                } else {
                    east
                };
                doc.copy(template, name, placement)
                    .map_err(step("place lead"))?;
                if *kind == LeadKind::Qfn {
                    doc.cut_with_object(&spec.names.body, name, true)
                        .map_err(step("sink pad into body"))?;
                }
                debug!(pin = %name, ?side, x, y, "Placed lead");
            }
            PinEntry::Pad { kind, x, y } => {
                build_exposed_pad(doc, spec, name, kind, *x, *y)?;
            }
        }
        names.push(name.clone());
    }

    doc.remove(east).map_err(step("remove lead template"))?;
    if doc.contains(PIN_TEMPLATE_NORTH) {
        doc.remove(PIN_TEMPLATE_NORTH)
            .map_err(step("remove north lead template"))?;
    }
    info!(pins = names.len(), "Pins built");
    Ok(names)
}
