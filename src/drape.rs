//! The feature arena and the phases that drape footprints over a point cloud.
//!
//! A [`FeatureSet`] owns every feature in insertion order. Features refer to
//! their neighbours by [`FeatureId`], an index into the arena; features are
//! never removed, so ids stay valid for the life of the set.
//!
//! Phases run in a fixed order: samples are recorded, every feature is lifted,
//! bow-ties are repaired, walls are built and finally surfaces are meshed.
//! [`FeatureSet::process`] runs everything after recording.

use std::collections::HashMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::LiftOptions;
use crate::feature::{Feature, FeatureError, FeatureInput, FeatureOptions};
use crate::geom::{Point2, Triangulator};
use crate::reconcile::{self, BowtieReport, NodeColumns, WallReport};

// ============================================================================
// Identifiers
// ============================================================================

/// Index of a feature inside its [`FeatureSet`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Ord, PartialOrd)]
pub struct FeatureId(pub usize);

impl FeatureId {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for FeatureId {
    fn from(value: usize) -> Self {
        Self::new(value)
    }
}

/// Issues creation counters in increasing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSequence {
    next: u64,
}

impl FeatureSequence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    /// Hand out the next counter.
    pub fn issue(&mut self) -> u64 {
        let counter = self.next;
        self.next += 1;
        counter
    }

    #[must_use]
    pub fn peek(&self) -> u64 {
        self.next
    }
}

// ============================================================================
// Samples
// ============================================================================

/// ASPRS LAS 1.4 point classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LasClass {
    Created,
    #[default]
    Unclassified,
    Ground,
    LowVegetation,
    MediumVegetation,
    HighVegetation,
    Building,
    LowPoint,
    Water,
    Rail,
    RoadSurface,
    WireGuard,
    WireConductor,
    TransmissionTower,
    WireConnector,
    BridgeDeck,
    HighNoise,
    Other(u8),
}

impl LasClass {
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Created,
            1 => Self::Unclassified,
            2 => Self::Ground,
            3 => Self::LowVegetation,
            4 => Self::MediumVegetation,
            5 => Self::HighVegetation,
            6 => Self::Building,
            7 => Self::LowPoint,
            9 => Self::Water,
            10 => Self::Rail,
            11 => Self::RoadSurface,
            13 => Self::WireGuard,
            14 => Self::WireConductor,
            15 => Self::TransmissionTower,
            16 => Self::WireConnector,
            17 => Self::BridgeDeck,
            18 => Self::HighNoise,
            other => Self::Other(other),
        }
    }

    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Unclassified => 1,
            Self::Ground => 2,
            Self::LowVegetation => 3,
            Self::MediumVegetation => 4,
            Self::HighVegetation => 5,
            Self::Building => 6,
            Self::LowPoint => 7,
            Self::Water => 9,
            Self::Rail => 10,
            Self::RoadSurface => 11,
            Self::WireGuard => 13,
            Self::WireConductor => 14,
            Self::TransmissionTower => 15,
            Self::WireConnector => 16,
            Self::BridgeDeck => 17,
            Self::HighNoise => 18,
            Self::Other(code) => code,
        }
    }
}

/// One point-cloud return; `z` is in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub point: Point2,
    pub z: f64,
    pub classification: LasClass,
    pub last_return: bool,
}

impl Sample {
    #[must_use]
    pub fn new(point: Point2, z: f64) -> Self {
        Self {
            point,
            z,
            classification: LasClass::Unclassified,
            last_return: true,
        }
    }

    #[must_use]
    pub fn with_class(mut self, classification: LasClass) -> Self {
        self.classification = classification;
        self
    }
}

// ============================================================================
// Errors and reports
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DrapeError {
    #[error("feature {0:?} does not exist in this set")]
    UnknownFeature(FeatureId),
    #[error("feature id '{0}' is already in use")]
    DuplicateId(String),
    #[error(transparent)]
    Feature(#[from] FeatureError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshReport {
    pub built: usize,
    pub failures: Vec<FeatureError>,
}

impl MeshReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of [`FeatureSet::process`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessReport {
    pub lifted: usize,
    pub bowties: BowtieReport,
    pub walls: WallReport,
    pub meshes: MeshReport,
}

// ============================================================================
// FeatureSet
// ============================================================================

/// Arena of features plus the options every phase runs with.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    features: Vec<Feature>,
    id_index: HashMap<String, FeatureId>,
    sequence: FeatureSequence,
    options: LiftOptions,
}

impl FeatureSet {
    #[must_use]
    pub fn new(options: LiftOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Use an existing sequence, e.g. to continue numbering from another set.
    #[must_use]
    pub fn with_sequence(options: LiftOptions, sequence: FeatureSequence) -> Self {
        Self {
            options,
            sequence,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn options(&self) -> &LiftOptions {
        &self.options
    }

    /// Add a feature and issue its creation counter.
    ///
    /// # Errors
    /// Returns `DrapeError::DuplicateId` if a feature with the same id exists.
    pub fn insert(&mut self, input: FeatureInput) -> Result<FeatureId, DrapeError> {
        if self.id_index.contains_key(&input.id) {
            return Err(DrapeError::DuplicateId(input.id));
        }
        let counter = self.sequence.issue();
        let id = FeatureId::new(self.features.len());
        self.id_index.insert(input.id.clone(), id);
        self.features
            .push(Feature::new(input, counter, self.options.seed ^ counter));
        Ok(id)
    }

    /// Parse `wkt` and add the feature.
    ///
    /// # Errors
    /// Returns `DrapeError::Feature` for invalid geometry (the feature is not
    /// added) and `DrapeError::DuplicateId` for a repeated id.
    pub fn insert_wkt(&mut self, id: &str, wkt: &str, options: FeatureOptions) -> Result<FeatureId, DrapeError> {
        let input = FeatureInput::from_wkt(id, wkt, options)?;
        self.insert(input)
    }

    #[must_use]
    pub fn get(&self, id: FeatureId) -> Option<&Feature> {
        self.features.get(id.0)
    }

    pub fn get_mut(&mut self, id: FeatureId) -> Option<&mut Feature> {
        self.features.get_mut(id.0)
    }

    /// # Errors
    /// Returns `DrapeError::UnknownFeature` for an id outside the arena.
    pub fn feature(&self, id: FeatureId) -> Result<&Feature, DrapeError> {
        self.get(id).ok_or(DrapeError::UnknownFeature(id))
    }

    /// Arena id of the feature with the given string id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<FeatureId> {
        self.id_index.get(id).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = FeatureId> + use<> {
        (0..self.features.len()).map(FeatureId::new)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, &Feature)> {
        self.features
            .iter()
            .enumerate()
            .map(|(i, f)| (FeatureId::new(i), f))
    }

    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    // ------------------------------------------------------------------------
    // Adjacency
    // ------------------------------------------------------------------------

    /// Record `a` and `b` as neighbours of each other.
    ///
    /// # Errors
    /// Returns `DrapeError::UnknownFeature` if either id is outside the arena.
    pub fn link_adjacent(&mut self, a: FeatureId, b: FeatureId) -> Result<(), DrapeError> {
        self.feature(a)?;
        self.feature(b)?;
        if a == b {
            return Ok(());
        }
        if let Some(f) = self.get_mut(a) {
            f.add_adjacent(b);
        }
        if let Some(f) = self.get_mut(b) {
            f.add_adjacent(a);
        }
        Ok(())
    }

    /// Link every pair of features that share at least one edge in opposite
    /// directions. Returns the number of newly linked pairs.
    pub fn detect_adjacency(&mut self) -> usize {
        let tol = self.options.tolerance();
        let boxes: Vec<_> = self
            .features
            .iter()
            .map(|f| f.bbox().expand_by(tol.eps))
            .collect();

        let mut pairs = Vec::new();
        for i in 0..self.features.len() {
            for j in (i + 1)..self.features.len() {
                if !boxes[i].intersects(boxes[j]) {
                    continue;
                }
                let other = self.features[j].footprint();
                let shares_edge = self.features[i]
                    .footprint()
                    .edges()
                    .any(|e| other.find_segment(e.pb, e.pa, tol).is_some());
                if shares_edge {
                    pairs.push((i, j));
                }
            }
        }

        let mut linked = 0;
        for (i, j) in pairs {
            let new_a = self.features[i].add_adjacent(FeatureId::new(j));
            let new_b = self.features[j].add_adjacent(FeatureId::new(i));
            if new_a || new_b {
                linked += 1;
            }
        }
        log::debug!("adjacency: linked {linked} feature pairs");
        linked
    }

    // ------------------------------------------------------------------------
    // Phases
    // ------------------------------------------------------------------------

    /// Offer a sample to every feature whose bbox, grown by the sample reach,
    /// contains it. Returns how many features used it.
    pub fn record_sample(&mut self, sample: &Sample) -> usize {
        self.record_samples(std::slice::from_ref(sample))
    }

    /// Record a batch of samples; returns the total number of uses.
    pub fn record_samples(&mut self, samples: &[Sample]) -> usize {
        let used = record_batch(&mut self.features, samples, &self.options);
        log::trace!("recorded {} samples, {used} uses", samples.len());
        used
    }

    /// Reduce the samples of every feature not lifted yet; returns how many were lifted.
    pub fn lift_all(&mut self) -> usize {
        let lifted = lift_batch(&mut self.features, &self.options);
        log::debug!("lifted {lifted} features");
        lifted
    }

    pub fn resolve_bowties(&mut self) -> BowtieReport {
        let tol = self.options.tolerance();
        reconcile::resolve_bowties(self, tol)
    }

    #[must_use]
    pub fn detect_bowties(&self) -> usize {
        reconcile::detect_bowties(self, self.options.tolerance())
    }

    /// Rebuild the wall buffer of every feature.
    pub fn construct_vertical_walls(&mut self, columns: &NodeColumns) -> WallReport {
        let mut report = WallReport::default();
        for f in &self.features {
            if f.has_vertical_walls() && !f.is_lifted() {
                log::warn!("skipping walls for unlifted feature '{}'", f.id());
                report.skipped_unlifted += 1;
            }
        }

        let walls = wall_batch(self, columns);
        for (feature, (mesh, edges)) in self.features.iter_mut().zip(walls) {
            report.add_feature(edges, mesh.triangle_count());
            feature.set_walls(mesh);
        }

        log::debug!(
            "walls: {} triangles on {} edges of {} features",
            report.triangles,
            report.edges_walled,
            report.features
        );
        report
    }

    /// Mesh every feature. Failures are collected; the batch always completes.
    pub fn build_meshes(&mut self, triangulator: &dyn Triangulator) -> MeshReport {
        let mut report = MeshReport::default();
        for feature in &mut self.features {
            match feature.build_mesh(triangulator) {
                Ok(()) => report.built += 1,
                Err(err) => {
                    log::warn!("{err}");
                    report.failures.push(err);
                }
            }
        }
        log::debug!(
            "meshed {} features, {} failed",
            report.built,
            report.failures.len()
        );
        report
    }

    /// Lift, repair bow-ties, build walls and mesh, in that order.
    pub fn process(&mut self, columns: &NodeColumns, triangulator: &dyn Triangulator) -> ProcessReport {
        let lifted = self.lift_all();
        let bowties = self.resolve_bowties();
        let walls = self.construct_vertical_walls(columns);
        let meshes = self.build_meshes(triangulator);
        ProcessReport {
            lifted,
            bowties,
            walls,
            meshes,
        }
    }
}

fn record_into(feature: &mut Feature, samples: &[Sample], options: &LiftOptions) -> usize {
    let reach = feature.bbox().expand_by(options.sample_reach());
    samples
        .iter()
        .filter(|s| reach.contains_point(s.point))
        .filter(|s| feature.record_point(s, options))
        .count()
}

#[cfg(feature = "parallel")]
fn record_batch(features: &mut [Feature], samples: &[Sample], options: &LiftOptions) -> usize {
    features
        .par_iter_mut()
        .map(|f| record_into(f, samples, options))
        .sum()
}

#[cfg(not(feature = "parallel"))]
fn record_batch(features: &mut [Feature], samples: &[Sample], options: &LiftOptions) -> usize {
    features
        .iter_mut()
        .map(|f| record_into(f, samples, options))
        .sum()
}

#[cfg(feature = "parallel")]
fn lift_batch(features: &mut [Feature], options: &LiftOptions) -> usize {
    features
        .par_iter_mut()
        .map(|f| usize::from(f.lift(options)))
        .sum()
}

#[cfg(not(feature = "parallel"))]
fn lift_batch(features: &mut [Feature], options: &LiftOptions) -> usize {
    features
        .iter_mut()
        .map(|f| usize::from(f.lift(options)))
        .sum()
}

#[cfg(feature = "parallel")]
fn wall_batch(set: &FeatureSet, columns: &NodeColumns) -> Vec<(crate::geom::TriangleMesh, usize)> {
    let tol = set.options.tolerance();
    let base = set.options.base_height_cm;
    (0..set.len())
        .into_par_iter()
        .map(|i| reconcile::build_walls(set, FeatureId::new(i), columns, base, tol))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn wall_batch(set: &FeatureSet, columns: &NodeColumns) -> Vec<(crate::geom::TriangleMesh, usize)> {
    let tol = set.options.tolerance();
    let base = set.options.base_height_cm;
    set.ids()
        .map(|id| reconcile::build_walls(set, id, columns, base, tol))
        .collect()
}
