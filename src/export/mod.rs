//! Output writers.
//!
//! Two formats are produced from a finished [`Document`]:
//!
//! - the native document, a JSON dump of every object's faces and colors
//!   that round-trips through serde;
//! - a STEP AP214 exchange file for ECAD/MCAD tools.

pub mod step;

use std::path::Path;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::document::Document;
use crate::error::{SynthError, SynthResult};
use crate::kernel::{Color, GeometryKernel};
use step::{StepBuilder, StepOptions, StepSolid};

/// Format tag written into native documents.
pub const NATIVE_FORMAT: &str = "ic3d-document";

/// Version of the native document layout.
pub const NATIVE_VERSION: u32 = 1;

/// A face in a native document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeFace {
    /// Boundary vertices.
    pub vertices: Vec<[f64; 3]>,
    /// Face color, if assigned.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub color: Option<Color>,
}

/// An object in a native document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeObject {
    /// Object name.
    pub name: String,
    /// Display color, if set.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub color: Option<Color>,
    /// Faces.
    pub faces: Vec<NativeFace>,
}

/// The native document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeDocument {
    /// Always [`NATIVE_FORMAT`].
    pub format: String,
    /// Layout version.
    pub version: u32,
    /// Program and version that wrote the file.
    pub generator: String,
    /// Document name.
    pub name: String,
    /// Objects in creation order.
    pub objects: Vec<NativeObject>,
}

impl NativeDocument {
    /// Snapshots every object of `doc`.
    ///
    /// # Errors
    ///
    /// Returns a kernel error when an object cannot be read.
    pub fn capture<K: GeometryKernel>(doc: &Document<K>) -> SynthResult<Self> {
        let read = |e| SynthError::kernel("read document", e);
        let mut objects = Vec::new();
        for name in doc.object_names() {
            let faces = doc.faces(name).map_err(read)?;
            let colors = doc.face_colors(name).map_err(read)?.unwrap_or_default();
            objects.push(NativeObject {
                name: name.to_string(),
                color: doc.shape_color(name).map_err(read)?,
                faces: faces
                    .iter()
                    .enumerate()
                    .map(|(i, f)| NativeFace {
                        vertices: f.vertices.iter().map(|p| [p.x, p.y, p.z]).collect(),
                        color: colors.get(i).copied(),
                    })
                    .collect(),
            });
        }
        Ok(Self {
            format: NATIVE_FORMAT.to_string(),
            version: NATIVE_VERSION,
            generator: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            name: doc.name().to_string(),
            objects,
        })
    }
}

/// Saves the native document.
///
/// # Errors
///
/// Returns [`SynthError::Export`] when serialization fails and
/// [`SynthError::Io`] when the file cannot be written.
pub fn save_native<K: GeometryKernel>(doc: &Document<K>, path: &Path) -> SynthResult<()> {
    let native = NativeDocument::capture(doc)?;
    let json = serde_json::to_string_pretty(&native).map_err(|e| SynthError::Export {
        message: format!("native document: {e}"),
    })?;
    std::fs::write(path, json).map_err(|e| SynthError::io(path, e))?;
    info!(path = %path.display(), objects = native.objects.len(), "Saved native document");
    Ok(())
}

/// Writes the named objects to a STEP exchange file. Faces carry their
/// assigned colors, falling back to the object's display color.
///
/// # Errors
///
/// Returns [`SynthError::Export`] when there is nothing to export, a kernel
/// error for unknown objects, and [`SynthError::Io`] on write failure.
pub fn export_interchange<K: GeometryKernel>(
    doc: &Document<K>,
    names: &[&str],
    path: &Path,
) -> SynthResult<()> {
    if names.is_empty() {
        return Err(SynthError::Export {
            message: "no objects to export".to_string(),
        });
    }
    let options = StepOptions::default();
    let mut builder = StepBuilder::new(&options);
    let context = builder.add_context();
    let read = |e| SynthError::kernel("read export object", e);

    for name in names {
        let faces = doc.faces(name).map_err(read)?;
        let colors = match doc.face_colors(name).map_err(read)? {
            Some(colors) => colors,
            None => doc
                .shape_color(name)
                .map_err(read)?
                .map(|c| vec![c; faces.len()])
                .unwrap_or_default(),
        };
        builder.add_solid(
            &StepSolid {
                name: *name,
                faces: &faces,
                colors: &colors,
            },
            context,
        );
    }

    let file_name = path
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
    let text = builder.finish(&file_name, context, &timestamp);
    std::fs::write(path, text).map_err(|e| SynthError::io(path, e))?;
    info!(path = %path.display(), objects = names.len(), "Exported STEP file");
    Ok(())
}
