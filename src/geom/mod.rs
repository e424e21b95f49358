mod core;
mod earclip;
mod footprint;
mod mesh;
mod refine;
mod triangulation;
mod wkt;

pub use core::{
    BBox2, LocationKey, Point2, Point3, Tolerance, VertexKey, cm_to_meters, meters_to_cm,
};
pub use footprint::{Footprint, GeometryError, Ring, RingEdge, VertexRef};
pub use mesh::TriangleMesh;
pub use triangulation::{
    EarClipTriangulator, TriangulationError, TriangulationOptions, Triangulator,
};
pub use wkt::parse_polygon;
