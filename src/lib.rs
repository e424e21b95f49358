//! Lifts 2D footprints onto a point cloud and reconciles heights between neighbours.
//!
//! The pipeline, driven through [`FeatureSet`]:
//!
//! 1. record samples into every nearby feature ([`FeatureSet::record_samples`]);
//! 2. reduce samples into per-vertex heights ([`FeatureSet::lift_all`]);
//! 3. repair bow-ties on shared edges ([`FeatureSet::resolve_bowties`]);
//! 4. build vertical walls at height steps ([`FeatureSet::construct_vertical_walls`]);
//! 5. triangulate every lifted footprint ([`FeatureSet::build_meshes`]).
//!
//! Elevations are stored as integer centimeters. The crate logs through the
//! `log` facade and never installs a logger itself.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod drape;
pub mod feature;
pub mod geom;
pub mod reconcile;

pub use config::LiftOptions;
pub use drape::{
    DrapeError, FeatureId, FeatureSequence, FeatureSet, LasClass, MeshReport, ProcessReport, Sample,
};
pub use feature::{
    ElevationTable, Feature, FeatureClass, FeatureError, FeatureInput, FeatureOptions, LiftKind,
};
pub use geom::{
    EarClipTriangulator, Footprint, Point2, Point3, TriangleMesh, Triangulator, VertexRef,
};
pub use reconcile::{BowtieReport, NodeColumns, WallReport};
