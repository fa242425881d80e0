//! End-to-end synthesis runs from parameter files to model files.
//!
//! Every test writes a global and a component file into its own temporary
//! directory and runs the full pipeline with the default configuration.

use std::path::{Path, PathBuf};

use ic3d_synth::config::Config;
use ic3d_synth::document::Document;
use ic3d_synth::error::SynthError;
use ic3d_synth::export::NativeDocument;
use ic3d_synth::kernel::{Color, PolyKernel};
use ic3d_synth::package::{PackageSpec, TINY_DELTA_FOR_QFN};
use ic3d_synth::params::{load_param_files, ParamSet};
use ic3d_synth::pipeline::{self, RunOutcome};
use ic3d_synth::synth::build_parts;
use tempfile::TempDir;

const SOIC8: &str = r"
# SOIC-8, 1.27 mm pitch
newModelName = 'SOIC127P600X175-8N'
A = 3.9
B = 4.9
H = 1.75
K = 0.1
maDeg = 8
Hpph = 1.0
Hppl = 0.7
Frbody = 0.05
P1chamferOffset = 0.2
P1markOffset = 0.3
P1markRadius = 0.25
P1markIndent = 0.05
markHeight = 0.06
L = 6.0
W = 0.41
T = 0.84
Tp = 0.2
Fr = 0.15
Hpe = 1.2
Pin1 = 'Gullwing,West,0,1.905'
Pin2 = 'Gullwing,West,0,0.635'
Pin3 = 'Gullwing,West,0,-0.635'
Pin4 = 'Gullwing,West,0,-1.905'
Pin5 = 'Gullwing,East,0,-1.905'
Pin6 = 'Gullwing,East,0,-0.635'
Pin7 = 'Gullwing,East,0,0.635'
Pin8 = 'Gullwing,East,0,1.905'
";

const QFN2: &str = r"
newModelName = 'QFN50P500X500X100-2N'
A = 5.0
B = 5.0
H = 1.0
K = 0.1
maDeg = 0
P1markOffset = 0.5
P1markRadius = 0.2
P1markIndent = 0.02
markHeight = 0.03
L = 5.0
W = 0.4
T = 0.6
Tp = 0.2
Hpe = 0.5
Pin1 = 'QFN,East,0,1.5'
Pin2 = 'QFN,North,0,1.5'
";

/// Writes the global file and the component file it names.
fn write_params(dir: &Path, component: &str) -> PathBuf {
    let global = dir.join("global.ini");
    std::fs::write(
        &global,
        "iniFileName = 'component.ini'\n\
         stepSuffix = '_SvnRev_7'\n\
         stepExt = '.step'\n\
         newModelPathRel = 'out'\n",
    )
    .expect("write global file");
    std::fs::write(dir.join("component.ini"), component).expect("write component file");
    global
}

fn run_in(dir: &TempDir, component: &str) -> Result<RunOutcome, SynthError> {
    let global = write_params(dir.path(), component);
    let (params, paths) = load_param_files(&global)?;
    pipeline::run(&params, &paths, &Config::default())
}

fn color(rgb: [f64; 3]) -> Color {
    Color::new(rgb[0], rgb[1], rgb[2])
}

fn same_color(a: Color, b: Color) -> bool {
    (a.r - b.r).abs() < 1e-9 && (a.g - b.g).abs() < 1e-9 && (a.b - b.b).abs() < 1e-9
}

#[test]
fn soic8_writes_all_artefacts() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = run_in(&dir, SOIC8).unwrap();

    let out = dir.path().join("out");
    let expected = [
        out.join("SOIC127P600X175-8N.log"),
        out.join("SOIC127P600X175-8N.ic3d.json"),
        out.join("SOIC127P600X175-8N_SvnRev_7.step"),
    ];
    assert_eq!(outcome.written, expected);
    for path in &expected {
        assert!(path.is_file(), "{} missing", path.display());
    }

    assert_eq!(outcome.synthesis.parts.pins.len(), 8);
    let names: Vec<&str> = outcome.document.object_names().collect();
    assert_eq!(names, vec!["SOIC127P600X175-8N"]);
    assert_eq!(outcome.document.name(), "SOIC127P600X175_8N_SvnRev_7");
}

#[test]
fn soic8_every_face_is_colored() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = run_in(&dir, SOIC8).unwrap();
    let doc = &outcome.document;

    let faces = doc.faces("SOIC127P600X175-8N").unwrap();
    let colors = doc.face_colors("SOIC127P600X175-8N").unwrap().unwrap();
    assert_eq!(colors.len(), faces.len());
    assert_eq!(outcome.synthesis.fusion.faces, faces.len());

    let report = &outcome.synthesis.fusion;
    assert_eq!(
        report.marker_faces + report.pin_faces + report.body_faces,
        report.faces
    );
    assert!(report.marker_faces > 0);
    assert!(report.pin_faces > 0);
    assert!(report.body_faces > 0);
    // Leads split the body faces they cross.
    assert!(report.unmatched > 0);
}

#[test]
fn native_document_matches_result() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = run_in(&dir, SOIC8).unwrap();

    let text = std::fs::read_to_string(dir.path().join("out/SOIC127P600X175-8N.ic3d.json")).unwrap();
    let native: NativeDocument = serde_json::from_str(&text).unwrap();
    assert_eq!(native.name, "SOIC127P600X175_8N_SvnRev_7");
    assert_eq!(native.objects.len(), 1);
    assert_eq!(native.objects[0].faces.len(), outcome.synthesis.fusion.faces);
    assert!(native.objects[0].faces.iter().all(|f| f.color.is_some()));
}

#[test]
fn step_file_names_the_model() {
    let dir = tempfile::tempdir().unwrap();
    run_in(&dir, SOIC8).unwrap();

    let text = std::fs::read_to_string(dir.path().join("out/SOIC127P600X175-8N_SvnRev_7.step")).unwrap();
    assert!(text.starts_with("ISO-10303-21;"));
    assert!(text.contains("FILE_NAME('SOIC127P600X175-8N_SvnRev_7.step'"));
    assert!(text.contains("FACETED_BREP('SOIC127P600X175-8N'"));
    // Marker, pins and body each get their own style.
    assert_eq!(text.matches("COLOUR_RGB").count(), 3);
}

#[test]
fn description_log_is_stable_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let first = run_in(&dir, SOIC8).unwrap();
    let log = dir.path().join("out/SOIC127P600X175-8N.log");
    let first_text = std::fs::read_to_string(&log).unwrap();

    let second = run_in(&dir, SOIC8).unwrap();
    let second_text = std::fs::read_to_string(&log).unwrap();

    assert_eq!(first.synthesis.description, second.synthesis.description);
    assert_eq!(first.synthesis.fusion.faces, second.synthesis.fusion.faces);
    assert_eq!(first_text, second_text);
    assert!(first_text.starts_with("Parms:\n"));
    assert!(first_text.contains("\nPin1:\n"));
    assert!(first_text.contains("\nBody:\n"));
    assert!(first_text.contains("\nPin1Mark:\n"));
}

#[test]
fn qfn_pads_sit_flush_with_body_and_get_pin_color() {
    let dir = tempfile::tempdir().unwrap();
    let global = write_params(dir.path(), QFN2);
    let (params, paths) = load_param_files(&global).unwrap();
    let outcome = pipeline::run(&params, &paths, &Config::default()).unwrap();

    assert_eq!(outcome.synthesis.parts.pins.len(), 2);

    let pins = color(params.triple_or("colorPins", [0.0; 3]).unwrap());
    let body = color(params.triple_or("colorBody", [0.0; 3]).unwrap());
    let colors = outcome
        .document
        .face_colors("QFN50P500X500X100-2N")
        .unwrap()
        .unwrap();
    let pin_faces = colors.iter().filter(|c| same_color(**c, pins)).count();
    let body_faces = colors.iter().filter(|c| same_color(**c, body)).count();
    assert!(pin_faces >= 2, "only {pin_faces} pin faces");
    assert!(body_faces >= 1);

    // The East pad reaches just past the body side.
    let faces = outcome.document.faces("QFN50P500X500X100-2N").unwrap();
    let max_x = faces
        .iter()
        .flat_map(|f| f.vertices.iter())
        .map(|p| p.x)
        .fold(f64::MIN, f64::max);
    assert!(max_x > 2.5 && max_x < 2.5 + 1e-3, "max x {max_x}");
}

#[test]
fn qfn_pads_longer_than_body_end_at_body_side() {
    let component = QFN2.replace("L = 5.0", "L = 7.0");

    let params = ParamSet::parse(&component, Path::new("qfn2.ini")).unwrap();
    let spec = PackageSpec::from_params(&params).unwrap();
    let mut doc = Document::new("QFN50P500X500X100_2N", PolyKernel::new());
    let parts = build_parts(&mut doc, &spec).unwrap();
    assert_eq!(parts.pins, vec!["Pin1", "Pin2"]);
    assert!(doc.solid(&parts.body).is_ok());
    for pin in &parts.pins {
        assert!(doc.solid(pin).is_ok());
    }

    let dir = tempfile::tempdir().unwrap();
    let global = write_params(dir.path(), &component);
    let (params, paths) = load_param_files(&global).unwrap();
    let outcome = pipeline::run(&params, &paths, &Config::default()).unwrap();

    let faces = outcome.document.faces("QFN50P500X500X100-2N").unwrap();
    let max_x = faces
        .iter()
        .flat_map(|f| f.vertices.iter())
        .map(|p| p.x)
        .fold(f64::MIN, f64::max);
    assert!((max_x - (2.5 + TINY_DELTA_FOR_QFN)).abs() < 1e-9, "max x {max_x}");

    let pins = color(params.triple_or("colorPins", [0.0; 3]).unwrap());
    let body = color(params.triple_or("colorBody", [0.0; 3]).unwrap());
    let colors = outcome
        .document
        .face_colors("QFN50P500X500X100-2N")
        .unwrap()
        .unwrap();
    assert!(colors.iter().filter(|c| same_color(**c, pins)).count() >= 2);
    assert!(colors.iter().any(|c| same_color(*c, body)));
}

#[test]
fn conflicting_pad_chamfers_fail_before_output() {
    let dir = tempfile::tempdir().unwrap();
    let component = format!(
        "{QFN2}Tt = 3.0\nWt = 3.0\nFt = 0.3\nepPin1ChamferRadius = 0.2\nPin3 = 'Ep,Ep,0,0'\n"
    );
    let err = run_in(&dir, &component).unwrap_err();
    assert!(matches!(err, SynthError::Configuration { .. }), "{err}");
    assert_eq!(err.exit_code(), 2);
    assert!(!dir.path().join("out").exists());
}

#[test]
fn lead_entry_below_upper_pivot_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let component = SOIC8.replace("Hpe = 1.2", "Hpe = 0.9");
    let err = run_in(&dir, &component).unwrap_err();
    assert!(matches!(err, SynthError::Configuration { .. }), "{err}");
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn unsupported_family_exits_with_its_own_code() {
    let dir = tempfile::tempdir().unwrap();
    let component = SOIC8.replace("SOIC127P600X175-8N", "BGA100C50P10X10_600X600X100");
    let err = run_in(&dir, &component).unwrap_err();
    assert!(matches!(err, SynthError::UnsupportedFamily { .. }), "{err}");
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn missing_component_file_is_a_parameter_error() {
    let dir = tempfile::tempdir().unwrap();
    let global = dir.path().join("global.ini");
    std::fs::write(&global, "iniFileName = 'nowhere.ini'\n").unwrap();
    let err = SynthError::from(load_param_files(&global).unwrap_err());
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("nowhere.ini"));
}
