//! Description log.
//!
//! A plain-text record of a synthesis run, meant to be diffed between runs:
//! the parameters that went in, then every part's color and vertex list.
//! Machine-specific values (paths, debug switches) are left out and the
//! interchange suffix is normalized so logs from different output variants
//! compare equal.
//!
//! ```text
//! Parms:
//! A=3.9
//! ...
//!
//! Pin1:
//! Color (0.8, 0.8, 0.75)
//! Vector (-3.000000, 1.700000, 0.000000)
//! ...
//! ```

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::document::Document;
use crate::error::{SynthError, SynthResult};
use crate::kernel::{Color, GeometryKernel};
use crate::package::PackageSpec;
use crate::params::{compare_pin_names, format_float, ParamSet};
use crate::synth::PartSet;

/// Parameter key prefixes left out of the log.
pub const EXCLUDED_PREFIXES: [&str; 4] = ["debugFilePath", "footprintType", "hasEp", "newModelPathRel"];

/// Trailing variant number of an interchange suffix.
static VARIANT_NUMBER: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

/// Interchange suffix with its trailing variant number removed.
fn base_suffix(suffix: &str) -> SynthResult<String> {
    match VARIANT_NUMBER.get_or_init(|| Regex::new(r"[0-9]+$")) {
        Ok(re) => Ok(re.replace(suffix, "").into_owned()),
        Err(e) => Err(SynthError::configuration(format!(
            "stepSuffix '{suffix}': variant pattern is invalid: {e}"
        ))),
    }
}

/// Rounds to the log's resolution; negative zero prints as zero.
fn coordinate(v: f64) -> f64 {
    let r = (v * 1e6).round() / 1e6;
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

fn color_line(color: Color) -> String {
    let mut out = String::from("Color (");
    for (i, c) in [color.r, color.g, color.b].into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        // Writing into a String cannot fail.
        let _ = format_float(c, &mut out);
    }
    out.push(')');
    out
}

fn parameter_lines(params: &ParamSet) -> SynthResult<Vec<String>> {
    let suffix = params.text_opt("stepSuffix").ok().flatten().unwrap_or("");
    let replacement = base_suffix(suffix)?;
    let mut lines: Vec<String> = params
        .iter()
        .filter(|(key, _)| !EXCLUDED_PREFIXES.iter().any(|p| key.starts_with(p)))
        .map(|(key, value)| {
            let value = value.to_string();
            let value = if suffix.is_empty() {
                value
            } else {
                value.replace(suffix, &replacement)
            };
            format!("{key}={value}")
        })
        .collect();
    lines.sort_by(|a, b| compare_pin_names(a, b));
    Ok(lines)
}

fn part_section<K: GeometryKernel>(
    doc: &Document<K>,
    name: &str,
    color: Color,
    out: &mut String,
) -> SynthResult<()> {
    let faces = doc
        .faces(name)
        .map_err(|e| SynthError::kernel("describe part", e))?;
    let mut vertices: Vec<String> = faces
        .iter()
        .flat_map(|f| f.vertices.iter())
        .map(|p| {
            format!(
                "Vector ({:.6}, {:.6}, {:.6})",
                coordinate(p.x),
                coordinate(p.y),
                coordinate(p.z)
            )
        })
        .collect();
    vertices.sort_by(|a, b| compare_pin_names(a, b));

    out.push_str(&format!("\n{name}:\n"));
    out.push_str(&color_line(color));
    out.push('\n');
    for v in vertices {
        out.push_str(&v);
        out.push('\n');
    }
    Ok(())
}

/// Renders the description log for the parts of a finished build.
///
/// # Errors
///
/// Returns a kernel error when a part cannot be read.
pub fn describe<K: GeometryKernel>(
    doc: &Document<K>,
    spec: &PackageSpec,
    params: &ParamSet,
    parts: &PartSet,
) -> SynthResult<String> {
    let mut out = String::from("Parms:\n");
    for line in parameter_lines(params)? {
        out.push_str(&line);
        out.push('\n');
    }
    for pin in &parts.pins {
        part_section(doc, pin, spec.colors.pins, &mut out)?;
    }
    part_section(doc, &parts.body, spec.colors.body, &mut out)?;
    part_section(doc, &parts.marker, spec.colors.pin1_mark, &mut out)?;
    debug!(bytes = out.len(), "Rendered description log");
    Ok(out)
}

/// Writes the description log.
///
/// # Errors
///
/// Returns [`SynthError::Io`] when the file cannot be written.
pub fn write_description(path: &Path, text: &str) -> SynthResult<()> {
    std::fs::write(path, text).map_err(|e| SynthError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{Placement, PolyKernel};
    use crate::package::tests::soic8;
    use crate::params::ParamValue;

    #[test]
    fn suffix_loses_variant_number() {
        assert_eq!(base_suffix("_SvnRev_123").unwrap(), "_SvnRev_");
        assert_eq!(base_suffix("_v").unwrap(), "_v");
        let first: *const _ = VARIANT_NUMBER.get().unwrap().as_ref().unwrap();
        assert_eq!(base_suffix("_TRT1").unwrap(), "_TRT");
        let second: *const _ = VARIANT_NUMBER.get().unwrap().as_ref().unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn coordinates_drop_negative_zero() {
        assert_eq!(format!("{:.6}", coordinate(-1e-9)), "0.000000");
        assert_eq!(format!("{:.6}", coordinate(-1.5)), "-1.500000");
    }

    #[test]
    fn color_line_uses_tuple_style() {
        assert_eq!(color_line(Color::new(0.8, 1.0, 0.75)), "Color (0.8, 1.0, 0.75)");
    }

    #[test]
    fn parameters_are_filtered_and_sorted() {
        let mut params = soic8();
        params.insert("stepSuffix", ParamValue::Text("_SvnRev_42".into()));
        params.insert("newStepPathNameExt", ParamValue::Text("out/X_SvnRev_42.step".into()));
        params.insert("debugFilePath", ParamValue::Text("/tmp/debug.txt".into()));
        params.insert("hasEp", ParamValue::Bool(false));
        params.insert("Pin10", ParamValue::Text("Gullwing,East,0,0".into()));
        let lines = parameter_lines(&params).unwrap();

        assert!(lines.contains(&"stepSuffix=_SvnRev_".to_string()));
        assert!(lines.contains(&"newStepPathNameExt=out/X_SvnRev_.step".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("debugFilePath")));
        assert!(!lines.iter().any(|l| l.starts_with("hasEp")));
        let pins: Vec<&String> = lines.iter().filter(|l| l.starts_with("Pin")).collect();
        assert!(pins[1].starts_with("Pin2="));
        assert!(pins[pins.len() - 1].starts_with("Pin10="));
    }

    #[test]
    fn sections_follow_part_order() {
        let spec = PackageSpec::from_params(&soic8()).unwrap();
        let mut doc = Document::new("Test", PolyKernel::new());
        doc.add_box("Body", 1.0, 1.0, 1.0, Placement::identity()).unwrap();
        doc.add_box("Pin1", 1.0, 1.0, 1.0, Placement::translation(-1.0, 0.0, 0.0))
            .unwrap();
        doc.add_box("Pin1Mark", 0.1, 0.1, 0.1, Placement::translation(0.0, 0.0, 1.0))
            .unwrap();
        let parts = PartSet {
            body: "Body".into(),
            marker: "Pin1Mark".into(),
            pins: vec!["Pin1".into()],
        };
        let text = describe(&doc, &spec, &soic8(), &parts).unwrap();
        let pin = text.find("\nPin1:\n").unwrap();
        let body = text.find("\nBody:\n").unwrap();
        let mark = text.find("\nPin1Mark:\n").unwrap();
        assert!(text.starts_with("Parms:\n"));
        assert!(pin < body && body < mark);
        assert!(text.contains("Vector (-1.000000, 0.000000, 0.000000)"));
        assert_eq!(text, describe(&doc, &spec, &soic8(), &parts).unwrap());
    }
}
