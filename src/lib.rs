//! ic3d-synth: parametric 3D models of surface-mount IC packages.
//!
//! Reads a pair of package parameter files and builds a colored solid of the
//! package: a molded body with draft and pin-1 marker, gullwing or QFN
//! leads, and optional exposed pads. The result is written as a native JSON
//! document, a STEP file and a plain-text description log.
//!
//! # Architecture
//!
//! - **Parameters**: [`params`] reads the files, [`package`] turns them into
//!   a validated [`package::PackageSpec`].
//! - **Geometry**: [`synth`] drives a [`kernel::GeometryKernel`] through a
//!   named-object [`document::Document`]. [`kernel::PolyKernel`] is the
//!   bundled polygonal kernel.
//! - **Output**: [`report`] renders the description log, [`export`] writes
//!   model files, [`pipeline`] ties a run together.
//! - **Support**: [`config`] loads the run configuration, [`error`] holds
//!   the error types and exit codes.

pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod kernel;
pub mod package;
pub mod params;
pub mod pipeline;
pub mod report;
pub mod synth;
