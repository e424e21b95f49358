mod attributes;
mod elevation;
mod lifting;

pub use attributes::{Attribute, AttributeKind, Attributes};
pub use elevation::{ElevationTable, FlatSamples, VertexSamples, percentile_select};
pub use lifting::{LiftKind, LiftSamples, TinSamples, VertexLifter};

use serde::{Deserialize, Serialize};

use crate::config::LiftOptions;
use crate::drape::{FeatureId, LasClass, Sample};
use crate::geom::{
    BBox2, Footprint, GeometryError, Point3, TriangleMesh, TriangulationError, Triangulator,
    VertexRef, meters_to_cm,
};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureError {
    #[error("feature '{id}' has invalid geometry: {source}")]
    InvalidGeometry {
        id: String,
        #[source]
        source: GeometryError,
    },
    #[error("feature '{id}' has not been lifted")]
    NotLifted { id: String },
    #[error("triangulation of feature '{id}' failed: {source}")]
    TriangulationFailed {
        id: String,
        #[source]
        source: TriangulationError,
    },
}

// ============================================================================
// Classification
// ============================================================================

/// Semantic class of a footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FeatureClass {
    #[default]
    Terrain,
    Forest,
    Water,
    Road,
    Separation,
    Bridge,
    Building,
}

impl FeatureClass {
    /// Whether heights of this class are authoritative unless overridden.
    #[must_use]
    pub const fn is_hard_by_default(self) -> bool {
        matches!(
            self,
            Self::Building | Self::Water | Self::Separation | Self::Bridge
        )
    }

    /// Classes that get walls down to the base height where no neighbour exists.
    #[must_use]
    pub const fn builds_base_walls(self) -> bool {
        matches!(self, Self::Building)
    }

    #[must_use]
    pub const fn default_lifting(self) -> LiftKind {
        match self {
            Self::Building | Self::Water => LiftKind::Flat,
            Self::Terrain | Self::Forest => LiftKind::Tin {
                simplification: 1,
                inner_buffer: 0.0,
            },
            Self::Road | Self::Separation | Self::Bridge => LiftKind::Boundary,
        }
    }
}

/// Per-feature settings supplied by whoever decides which features exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureOptions {
    pub class: FeatureClass,
    pub lifting: LiftKind,
    /// Overrides the class hardness when set
    pub hard: Option<bool>,
    pub vertical_walls: bool,
    pub top_level: bool,
    /// Accepted sample classes; empty accepts all
    pub las_classes: Vec<LasClass>,
}

impl Default for FeatureOptions {
    fn default() -> Self {
        Self::for_class(FeatureClass::default())
    }
}

impl FeatureOptions {
    /// Class defaults: lifting strategy, walls for buildings and water.
    #[must_use]
    pub fn for_class(class: FeatureClass) -> Self {
        Self {
            class,
            lifting: class.default_lifting(),
            hard: None,
            vertical_walls: matches!(class, FeatureClass::Building | FeatureClass::Water),
            top_level: true,
            las_classes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_lifting(mut self, lifting: LiftKind) -> Self {
        self.lifting = lifting;
        self
    }

    #[must_use]
    pub fn with_hard(mut self, hard: bool) -> Self {
        self.hard = Some(hard);
        self
    }

    #[must_use]
    pub fn with_vertical_walls(mut self, vertical_walls: bool) -> Self {
        self.vertical_walls = vertical_walls;
        self
    }

    #[must_use]
    pub fn with_las_classes(mut self, las_classes: Vec<LasClass>) -> Self {
        self.las_classes = las_classes;
        self
    }
}

// ============================================================================
// FeatureInput
// ============================================================================

/// Everything needed to add a feature to a set, before it gets a counter.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureInput {
    pub id: String,
    pub layer: String,
    pub footprint: Footprint,
    pub attributes: Attributes,
    pub options: FeatureOptions,
}

impl FeatureInput {
    #[must_use]
    pub fn new(id: impl Into<String>, footprint: Footprint, options: FeatureOptions) -> Self {
        Self {
            id: id.into(),
            layer: String::new(),
            footprint,
            attributes: Attributes::default(),
            options,
        }
    }

    /// Parse the footprint from `POLYGON` WKT.
    ///
    /// # Errors
    /// Returns `FeatureError::InvalidGeometry` when the text does not give a valid footprint.
    pub fn from_wkt(id: impl Into<String>, wkt: &str, options: FeatureOptions) -> Result<Self, FeatureError> {
        let id = id.into();
        match Footprint::from_wkt(wkt) {
            Ok(footprint) => Ok(Self::new(id, footprint, options)),
            Err(source) => Err(FeatureError::InvalidGeometry { id, source }),
        }
    }

    #[must_use]
    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = layer.into();
        self
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: impl Into<Attributes>) -> Self {
        self.attributes = attributes.into();
        self
    }
}

// ============================================================================
// Feature
// ============================================================================

/// One footprint with its samples, elevations and produced meshes.
#[derive(Debug, Clone)]
pub struct Feature {
    id: String,
    counter: u64,
    layer: String,
    attributes: Attributes,
    footprint: Footprint,
    options: FeatureOptions,
    samples: LiftSamples,
    elevations: Option<ElevationTable>,
    adjacent: Vec<FeatureId>,
    surface: Option<TriangleMesh>,
    walls: TriangleMesh,
}

impl Feature {
    /// Build a feature; `seed` drives TIN sample thinning.
    #[must_use]
    pub fn new(input: FeatureInput, counter: u64, seed: u64) -> Self {
        let FeatureInput {
            id,
            layer,
            footprint,
            attributes,
            options,
        } = input;
        let samples = LiftSamples::new(options.lifting, &footprint, seed);
        Self {
            id,
            counter,
            layer,
            attributes,
            footprint,
            options,
            samples,
            elevations: None,
            adjacent: Vec::new(),
            surface: None,
            walls: TriangleMesh::default(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn counter(&self) -> u64 {
        self.counter
    }

    #[must_use]
    pub fn layer(&self) -> &str {
        &self.layer
    }

    #[must_use]
    pub fn bbox(&self) -> BBox2 {
        self.footprint.bbox()
    }

    #[must_use]
    pub fn attribute<'a>(&'a self, name: &str, default: &'a str) -> Option<&'a str> {
        self.attributes.get(name, default)
    }

    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    #[must_use]
    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    #[must_use]
    pub fn class(&self) -> FeatureClass {
        self.options.class
    }

    #[must_use]
    pub fn lifting(&self) -> LiftKind {
        self.options.lifting
    }

    #[must_use]
    pub fn is_hard(&self) -> bool {
        self.options
            .hard
            .unwrap_or_else(|| self.options.class.is_hard_by_default())
    }

    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.options.top_level
    }

    pub fn set_top_level(&mut self, top_level: bool) {
        self.options.top_level = top_level;
    }

    #[must_use]
    pub fn has_vertical_walls(&self) -> bool {
        self.options.vertical_walls
    }

    /// Allow walls to be built for this feature.
    pub fn add_vertical_wall(&mut self) {
        self.options.vertical_walls = true;
    }

    #[must_use]
    pub fn adjacent(&self) -> &[FeatureId] {
        &self.adjacent
    }

    /// Record a neighbour once; returns false if it was already linked.
    pub(crate) fn add_adjacent(&mut self, other: FeatureId) -> bool {
        if self.adjacent.contains(&other) {
            return false;
        }
        self.adjacent.push(other);
        true
    }

    /// Offer one sample; returns true when the feature used it.
    ///
    /// Samples offered after lifting are ignored.
    pub fn record_point(&mut self, sample: &Sample, options: &LiftOptions) -> bool {
        if self.is_lifted() || !self.accepts_class(sample.classification) {
            return false;
        }
        let z_cm = meters_to_cm(sample.z);
        self.samples
            .record(&self.footprint, sample.point, z_cm, options)
    }

    fn accepts_class(&self, class: LasClass) -> bool {
        self.options.las_classes.is_empty() || self.options.las_classes.contains(&class)
    }

    /// Reduce recorded samples into the elevation table.
    ///
    /// The sample store is drained, so only the first call has an effect;
    /// returns false when the feature was already lifted.
    pub fn lift(&mut self, options: &LiftOptions) -> bool {
        if self.is_lifted() {
            return false;
        }
        let table = self.samples.reduce(&self.footprint, options);
        log::trace!(
            "lifted feature '{}' ({}) to {:?}..{:?} cm",
            self.id,
            self.samples.kind_name(),
            table.min(),
            table.max()
        );
        self.elevations = Some(table);
        true
    }

    #[must_use]
    pub fn is_lifted(&self) -> bool {
        self.elevations.is_some()
    }

    #[must_use]
    pub fn elevations(&self) -> Option<&ElevationTable> {
        self.elevations.as_ref()
    }

    #[must_use]
    pub fn vertex_elevation(&self, v: VertexRef) -> Option<i32> {
        self.elevations.as_ref().and_then(|t| t.get(v))
    }

    /// Returns false when the feature is unlifted or `v` is out of range.
    pub fn set_vertex_elevation(&mut self, v: VertexRef, z_cm: i32) -> bool {
        self.elevations.as_mut().is_some_and(|t| t.set(v, z_cm))
    }

    /// Elevation of the first outer vertex; the uniform height of a flat feature.
    #[must_use]
    pub fn height(&self) -> Option<i32> {
        self.vertex_elevation(VertexRef::new(0, 0))
    }

    #[must_use]
    pub fn interior_points(&self) -> &[Point3] {
        self.samples.interior_points()
    }

    /// Triangulate the lifted footprint and store it as the surface.
    ///
    /// # Errors
    /// Returns `FeatureError::NotLifted` before reduction, and
    /// `FeatureError::TriangulationFailed` when the triangulator rejects the
    /// input; the surface is left empty in both cases.
    pub fn build_mesh(&mut self, triangulator: &dyn Triangulator) -> Result<(), FeatureError> {
        self.surface = None;
        let Some(elevations) = self.elevations.as_ref() else {
            return Err(FeatureError::NotLifted {
                id: self.id.clone(),
            });
        };

        let mesh = triangulator
            .triangulate(&self.footprint, elevations, self.samples.interior_points())
            .map_err(|source| FeatureError::TriangulationFailed {
                id: self.id.clone(),
                source,
            })?;
        self.surface = Some(mesh);
        Ok(())
    }

    #[must_use]
    pub fn surface(&self) -> Option<&TriangleMesh> {
        self.surface.as_ref()
    }

    #[must_use]
    pub fn walls(&self) -> &TriangleMesh {
        &self.walls
    }

    pub(crate) fn set_walls(&mut self, walls: TriangleMesh) {
        self.walls = walls;
    }

    /// Surface vertices plus wall vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.surface.as_ref().map_or(0, TriangleMesh::vertex_count) + self.walls.vertex_count()
    }
}
