//! Package parameter files.
//!
//! A package is described by two `name = value` files: a global file shared by
//! every model in a library, and a component file named by the global file's
//! `iniFileName` key. Component values override global ones.
//!
//! ```text
//! # SOIC-8, 1.27 mm pitch
//! newModelName = 'SOIC127P600X175-8N'
//! A = 3.90        # body width
//! Pin1 = 'Gullwing,West,0,1.905'
//! ```
//!
//! After both files are read, the output paths are derived and stored back
//! into the set so that the description log records them.

mod literal;

pub use literal::{parse_literal, ParamValue};
pub(crate) use literal::format_float;

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

/// Key in the global file naming the component file.
pub const COMPONENT_FILE_KEY: &str = "iniFileName";

/// File extension of the native document.
pub const NATIVE_EXTENSION: &str = ".ic3d.json";

/// Name of the debug log written next to the model.
pub const DEBUG_FILE_NAME: &str = "ic3d_debug.txt";

/// Default pin-1 marker color (white).
pub const DEFAULT_COLOR_PIN1_MARK: [f64; 3] = [1.00, 1.00, 1.00];
/// Default pin color (bright tin).
pub const DEFAULT_COLOR_PINS: [f64; 3] = [0.80, 0.80, 0.75];
/// Default body color (black).
pub const DEFAULT_COLOR_BODY: [f64; 3] = [0.10, 0.10, 0.10];

/// Errors raised while reading parameter files.
#[derive(Error, Debug)]
pub enum ParamError {
    /// A parameter file could not be read.
    #[error("failed to read parameter file: {path}")]
    Read {
        /// Path to the file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A value could not be parsed as a literal.
    #[error("{path}:{line}: {message}")]
    Syntax {
        /// Path to the file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// A required parameter is absent.
    #[error("missing required parameter '{key}'")]
    Missing {
        /// Parameter name.
        key: String,
    },

    /// A parameter has the wrong type.
    #[error("parameter '{key}' must be {expected}, got '{value}'")]
    Type {
        /// Parameter name.
        key: String,
        /// Expected type description.
        expected: &'static str,
        /// The value found.
        value: String,
    },
}

/// Ordered mapping from parameter name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSet {
    values: IndexMap<String, ParamValue>,
}

impl ParamSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses parameter text. `origin` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Syntax`] for a value that is not a literal.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, ParamError> {
        let mut set = Self::new();
        set.merge_text(text, origin)?;
        Ok(set)
    }

    /// Parses parameter text on top of the existing values.
    fn merge_text(&mut self, text: &str, origin: &Path) -> Result<(), ParamError> {
        for (idx, raw) in text.lines().enumerate() {
            let line = strip_comment(raw.trim());
            let Some((name, value)) = line.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let value = parse_literal(value.trim()).map_err(|message| ParamError::Syntax {
                path: origin.to_path_buf(),
                line: idx + 1,
                message: format!("{name}: {message}"),
            })?;
            self.values.insert(name.to_string(), value);
        }
        Ok(())
    }

    /// Inserts or replaces a value.
    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.values.insert(name.into(), value);
    }

    /// Returns the raw value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Returns `true` when `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterates over `(name, value)` in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns a required numeric parameter.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is missing or not numeric.
    pub fn number(&self, name: &str) -> Result<f64, ParamError> {
        let value = self.get(name).ok_or_else(|| ParamError::Missing {
            key: name.to_string(),
        })?;
        value.as_f64().ok_or_else(|| type_error(name, "a number", value))
    }

    /// Returns an optional numeric parameter, or `default` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is present but not numeric.
    pub fn number_or(&self, name: &str, default: f64) -> Result<f64, ParamError> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value.as_f64().ok_or_else(|| type_error(name, "a number", value)),
        }
    }

    /// Returns a required text parameter.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is missing or not text.
    pub fn text(&self, name: &str) -> Result<&str, ParamError> {
        let value = self.get(name).ok_or_else(|| ParamError::Missing {
            key: name.to_string(),
        })?;
        value.as_str().ok_or_else(|| type_error(name, "a string", value))
    }

    /// Returns an optional text parameter.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is present but not text.
    pub fn text_opt(&self, name: &str) -> Result<Option<&str>, ParamError> {
        self.get(name)
            .map(|value| value.as_str().ok_or_else(|| type_error(name, "a string", value)))
            .transpose()
    }

    /// Returns an optional boolean flag, `false` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is present but neither bool nor integer.
    pub fn flag(&self, name: &str) -> Result<bool, ParamError> {
        match self.get(name) {
            None => Ok(false),
            Some(value) => value
                .as_bool()
                .ok_or_else(|| type_error(name, "True/False or an integer", value)),
        }
    }

    /// Returns an RGB triple, or `default` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is present but not a numeric 3-tuple.
    pub fn triple_or(&self, name: &str, default: [f64; 3]) -> Result<[f64; 3], ParamError> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value
                .as_triple()
                .ok_or_else(|| type_error(name, "a 3-tuple of numbers", value)),
        }
    }

    /// Returns the pin definition keys (those starting with `Pin`), sorted by
    /// [`compare_pin_names`].
    #[must_use]
    pub fn pin_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .values
            .keys()
            .map(String::as_str)
            .filter(|k| k.starts_with("Pin"))
            .collect();
        names.sort_by(|a, b| compare_pin_names(a, b));
        names
    }
}

fn type_error(name: &str, expected: &'static str, value: &ParamValue) -> ParamError {
    ParamError::Type {
        key: name.to_string(),
        expected,
        value: value.to_string(),
    }
}

/// Drops a `#` comment, ignoring `#` inside quoted strings.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    for (idx, c) in line.char_indices() {
        match (quote, c) {
            (None, '#') => return &line[..idx],
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), _) if q == c => quote = None,
            _ => {}
        }
    }
    line
}

/// Orders pin names numerically (`Pin2` before `Pin10`).
///
/// Anything after an `=` is ignored, so `name=value` lines sort the same way.
/// Names whose remainder after `Pin` is not an integer (`PinEP`, `PinA1`) and
/// strings not starting with `Pin` compare lexically.
#[must_use]
pub fn compare_pin_names(a: &str, b: &str) -> Ordering {
    if !(a.starts_with("Pin") && b.starts_with("Pin")) {
        return a.cmp(b);
    }
    let a_key = a.split_once('=').map_or(a, |(k, _)| k).replace("Pin", "");
    let b_key = b.split_once('=').map_or(b, |(k, _)| k).replace("Pin", "");
    match (a_key.trim().parse::<i64>(), b_key.trim().parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a_key.cmp(&b_key),
    }
}

/// Output locations derived from the parameter files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// Directory all artefacts are written to.
    pub model_dir: PathBuf,
    /// Native document.
    pub native: PathBuf,
    /// STEP interchange file.
    pub interchange: PathBuf,
    /// Description log.
    pub description_log: PathBuf,
    /// Debug log.
    pub debug_file: PathBuf,
    /// Document name: model name plus suffix with `-` replaced by `_`.
    pub doc_name: String,
}

impl OutputPaths {
    /// Derives output paths from the model name, suffix, extension and
    /// model directory parameters.
    ///
    /// `base_dir` resolves `newModelPathRel`; an absolute `newModelPath` is
    /// used as is.
    ///
    /// # Errors
    ///
    /// Returns an error when a required naming parameter is missing.
    pub fn derive(params: &ParamSet, base_dir: &Path) -> Result<Self, ParamError> {
        let model_name = params.text("newModelName")?;
        let suffix = params.text("stepSuffix")?;
        let ext = params.text("stepExt")?;

        let model_dir = match params.text_opt("newModelPathRel")? {
            Some(rel) => base_dir.join(rel),
            None => PathBuf::from(params.text("newModelPath").map_err(|_| {
                ParamError::Missing {
                    key: "newModelPath or newModelPathRel".to_string(),
                }
            })?),
        };

        Ok(Self {
            native: model_dir.join(format!("{model_name}{NATIVE_EXTENSION}")),
            interchange: model_dir.join(format!("{model_name}{suffix}{ext}")),
            description_log: model_dir.join(format!("{model_name}.log")),
            debug_file: model_dir.join(DEBUG_FILE_NAME),
            doc_name: format!("{model_name}{suffix}").replace('-', "_"),
            model_dir,
        })
    }

    /// Records the derived paths in `params` under their well-known keys.
    pub fn store(&self, params: &mut ParamSet) {
        let text = |p: &Path| ParamValue::Text(p.display().to_string().replace('\\', "/"));
        params.insert("newModelPath", text(&self.model_dir));
        params.insert("newModelPathNameExt", text(&self.native));
        params.insert("newStepPathNameExt", text(&self.interchange));
        params.insert("logFilePathNameExt", text(&self.description_log));
        params.insert("docName", ParamValue::Text(self.doc_name.clone()));
        params.insert("debugFilePath", text(&self.debug_file));
    }
}

fn read_file(path: &Path) -> Result<String, ParamError> {
    std::fs::read_to_string(path).map_err(|source| ParamError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads the global parameter file and the component file it names.
///
/// The component path is resolved relative to the global file's directory.
/// Missing colors get their defaults and the derived output paths are stored
/// in the returned set.
///
/// # Errors
///
/// Returns an error if either file cannot be read or parsed, or if a required
/// naming key is missing.
pub fn load_param_files(global: &Path) -> Result<(ParamSet, OutputPaths), ParamError> {
    let base_dir = global
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    let mut params = ParamSet::parse(&read_file(global)?, global)?;
    debug!(path = %global.display(), count = params.len(), "Read global parameters");

    let component = base_dir.join(params.text(COMPONENT_FILE_KEY)?);
    params.merge_text(&read_file(&component)?, &component)?;
    debug!(path = %component.display(), count = params.len(), "Read component parameters");
    params.insert(
        COMPONENT_FILE_KEY,
        ParamValue::Text(component.display().to_string().replace('\\', "/")),
    );

    for (key, default) in [
        ("colorPin1Mark", DEFAULT_COLOR_PIN1_MARK),
        ("colorPins", DEFAULT_COLOR_PINS),
        ("colorBody", DEFAULT_COLOR_BODY),
    ] {
        if !params.contains(key) {
            params.insert(
                key,
                ParamValue::Tuple(default.iter().copied().map(ParamValue::Float).collect()),
            );
        }
    }

    let paths = OutputPaths::derive(&params, &base_dir)?;
    paths.store(&mut params);
    Ok((params, paths))
}
