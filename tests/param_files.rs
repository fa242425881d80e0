//! Loading global and component parameter files from disk.

use std::path::{Path, PathBuf};

use ic3d_synth::params::{load_param_files, ParamError, DEFAULT_COLOR_BODY, NATIVE_EXTENSION};

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).expect("write parameter file");
    path
}

const GLOBAL: &str = "iniFileName = 'parts/comp.ini'\n\
                      stepSuffix = '_TRT1'\n\
                      stepExt = '.step'\n\
                      newModelPathRel = 'models'\n\
                      A = 1.0\n\
                      colorPins = (0.5, 0.5, 0.5)\n";

#[test]
fn component_overrides_global_values() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("parts")).unwrap();
    write(
        &dir.path().join("parts"),
        "comp.ini",
        "newModelName = 'SOIC127P600X175-8N'\nA = 3.9\n",
    );
    let global = write(dir.path(), "global.ini", GLOBAL);

    let (params, _) = load_param_files(&global).unwrap();
    assert!((params.number("A").unwrap() - 3.9).abs() < 1e-12);
    assert_eq!(params.triple_or("colorPins", [0.0; 3]).unwrap(), [0.5, 0.5, 0.5]);
    assert_eq!(params.triple_or("colorBody", [9.0; 3]).unwrap(), DEFAULT_COLOR_BODY);
    assert!(params.text("iniFileName").unwrap().ends_with("parts/comp.ini"));
}

#[test]
fn derived_paths_are_stored_back() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("parts")).unwrap();
    write(
        &dir.path().join("parts"),
        "comp.ini",
        "newModelName = 'QFN50P500X500X80-33N'\n",
    );
    let global = write(dir.path(), "global.ini", GLOBAL);

    let (params, paths) = load_param_files(&global).unwrap();
    let models = dir.path().join("models");
    assert_eq!(paths.model_dir, models);
    assert_eq!(
        paths.native,
        models.join(format!("QFN50P500X500X80-33N{NATIVE_EXTENSION}"))
    );
    assert_eq!(paths.interchange, models.join("QFN50P500X500X80-33N_TRT1.step"));
    assert_eq!(paths.description_log, models.join("QFN50P500X500X80-33N.log"));
    assert_eq!(paths.doc_name, "QFN50P500X500X80_33N_TRT1");

    assert_eq!(params.text("docName").unwrap(), "QFN50P500X500X80_33N_TRT1");
    assert!(params
        .text("newStepPathNameExt")
        .unwrap()
        .ends_with("models/QFN50P500X500X80-33N_TRT1.step"));
    assert!(params.contains("logFilePathNameExt"));
    assert!(params.contains("debugFilePath"));
}

#[test]
fn absolute_model_path_is_used_as_is() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("elsewhere");
    write(dir.path(), "comp.ini", "newModelName = 'SOT95P280X145-5N'\n");
    let global = write(
        dir.path(),
        "global.ini",
        &format!(
            "iniFileName = 'comp.ini'\nstepSuffix = ''\nstepExt = '.stp'\nnewModelPath = '{}'\n",
            target.display().to_string().replace('\\', "/")
        ),
    );

    let (_, paths) = load_param_files(&global).unwrap();
    assert_eq!(paths.model_dir, PathBuf::from(target.display().to_string().replace('\\', "/")));
    assert_eq!(
        paths.interchange.file_name().unwrap().to_string_lossy(),
        "SOT95P280X145-5N.stp"
    );
}

#[test]
fn missing_naming_key_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "comp.ini", "newModelName = 'SOIC127P600X175-8N'\n");
    let global = write(
        dir.path(),
        "global.ini",
        "iniFileName = 'comp.ini'\nstepSuffix = ''\nnewModelPathRel = 'out'\n",
    );

    match load_param_files(&global).unwrap_err() {
        ParamError::Missing { key } => assert_eq!(key, "stepExt"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn syntax_error_names_the_component_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "comp.ini", "newModelName = 'X'\nA = 3.9.1\n");
    let global = write(dir.path(), "global.ini", "iniFileName = 'comp.ini'\n");

    match load_param_files(&global).unwrap_err() {
        ParamError::Syntax { path, line, .. } => {
            assert!(path.ends_with("comp.ini"));
            assert_eq!(line, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unreadable_global_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_param_files(&dir.path().join("absent.ini")).unwrap_err();
    assert!(matches!(err, ParamError::Read { .. }));
}
