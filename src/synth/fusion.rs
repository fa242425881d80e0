//! Fusion and face provenance coloring.
//!
//! Before fusing, every face of every part is fingerprinted by its vertex
//! set. Faces of the fused solid are looked up against those fingerprints
//! and colored after the part they came from. Faces that match nothing are
//! guessed at: small faces are most likely bits of a lead, everything else
//! is body.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use nalgebra::Point3;
use serde::Serialize;
use tracing::{debug, warn};

use super::{step, PartSet};
use crate::document::Document;
use crate::error::{SynthError, SynthResult};
use crate::kernel::{Color, GeometryKernel};
use crate::package::{PackageColors, PackageSpec};

/// Vertex quantization used for fingerprints, in units per millimetre.
const SIGNATURE_SCALE: f64 = 1e6;

/// Faces with at most this many vertices are treated as lead faces when
/// their origin is unknown.
const SMALL_FACE_VERTICES: usize = 4;

/// Order-independent fingerprint of a face's vertex set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceSignature(u64);

impl FaceSignature {
    /// Fingerprints a vertex list. Vertex order and starting point do not
    /// matter; positions are compared at 1 nm resolution.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn of(vertices: &[Point3<f64>]) -> Self {
        let mut keys: Vec<[i64; 3]> = vertices
            .iter()
            .map(|p| {
                [
                    (p.x * SIGNATURE_SCALE).round() as i64,
                    (p.y * SIGNATURE_SCALE).round() as i64,
                    (p.z * SIGNATURE_SCALE).round() as i64,
                ]
            })
            .collect();
        keys.sort_unstable();
        let mut hasher = DefaultHasher::new();
        keys.hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// Which part a fused face is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Pin-1 marker ink.
    Marker,
    /// A lead or exposed pad.
    Pin,
    /// The body.
    Body,
}

impl Provenance {
    /// Display color for faces of this origin.
    #[must_use]
    pub const fn color(self, colors: &PackageColors) -> Color {
        match self {
            Self::Marker => colors.pin1_mark,
            Self::Pin => colors.pins,
            Self::Body => colors.body,
        }
    }
}

/// Attribution for a face that matches no part fingerprint.
#[must_use]
pub const fn classify_unmatched(vertex_count: usize, exempt: bool) -> Provenance {
    if vertex_count <= SMALL_FACE_VERTICES && !exempt {
        Provenance::Pin
    } else {
        Provenance::Body
    }
}

/// Face attribution counts for the fused solid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FusionReport {
    /// Faces on the fused solid.
    pub faces: usize,
    /// Faces matched to the marker.
    pub marker_faces: usize,
    /// Faces matched to a pin, including unmatched faces guessed as pins.
    pub pin_faces: usize,
    /// Faces matched to the body, including unmatched faces guessed as body.
    pub body_faces: usize,
    /// Faces that matched no part.
    pub unmatched: usize,
}

impl FusionReport {
    fn count(&mut self, provenance: Provenance) {
        match provenance {
            Provenance::Marker => self.marker_faces += 1,
            Provenance::Pin => self.pin_faces += 1,
            Provenance::Body => self.body_faces += 1,
        }
    }
}

fn signatures<K: GeometryKernel>(
    doc: &Document<K>,
    names: &[&str],
) -> SynthResult<HashSet<FaceSignature>> {
    let mut set = HashSet::new();
    for name in names {
        let faces = doc.faces(name).map_err(step("read part faces"))?;
        set.extend(faces.iter().map(|f| FaceSignature::of(&f.vertices)));
    }
    Ok(set)
}

/// Fuses all parts into one object named after the model, colors each face
/// by the part it came from, and removes the parts.
///
/// # Errors
///
/// Returns [`SynthError::Configuration`] when the model name collides with
/// a part name, and kernel failures wrapped with the step that raised them.
pub fn fuse_and_color<K: GeometryKernel>(
    doc: &mut Document<K>,
    spec: &PackageSpec,
    parts: &PartSet,
) -> SynthResult<FusionReport> {
    let fused_name = spec.model_name.as_str();
    let all = parts.all();
    if all.contains(&fused_name) {
        return Err(SynthError::configuration(format!(
            "model name '{fused_name}' collides with a part name"
        )));
    }

    let marker = signatures(doc, &[parts.marker.as_str()])?;
    let pin_names: Vec<&str> = parts.pins.iter().map(String::as_str).collect();
    let pins = signatures(doc, &pin_names)?;
    let body = signatures(doc, &[parts.body.as_str()])?;

    doc.fuse(&all, fused_name).map_err(step("fuse parts"))?;
    let faces = doc.faces(fused_name).map_err(step("read fused faces"))?;

    let mut report = FusionReport {
        faces: faces.len(),
        ..FusionReport::default()
    };
    let mut colors = Vec::with_capacity(faces.len());
    for face in &faces {
        let signature = FaceSignature::of(&face.vertices);
        let provenance = if marker.contains(&signature) {
            Provenance::Marker
        } else if pins.contains(&signature) {
            Provenance::Pin
        } else if body.contains(&signature) {
            Provenance::Body
        } else {
            report.unmatched += 1;
            classify_unmatched(face.vertex_count(), spec.provenance_exempt)
        };
        report.count(provenance);
        colors.push(provenance.color(&spec.colors));
    }
    if report.unmatched > 0 {
        warn!(
            unmatched = report.unmatched,
            "Fused faces without a matching part face"
        );
    }
    doc.set_face_colors(fused_name, &colors)
        .map_err(step("color fused faces"))?;

    for part in all {
        doc.remove(part).map_err(step("remove fused part"))?;
    }
    debug!(?report, object = fused_name, "Fused and colored");
    Ok(report)
}
