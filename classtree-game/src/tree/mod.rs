//! Class evolution tree construction and validation.

pub mod builder;
pub mod catalog;
pub mod config;
pub mod invariants;

pub use builder::{TreeBuilder, build_class_tree};
pub use catalog::{
    BaseReport, BuildStats, Catalog, CatalogEntry, ConstructionReport, EdgeKind, NodeOrigin,
    Shortfall, TreeEdge, TreeStructure,
};
pub use config::{TreeConfig, TreeConfigError};
pub use invariants::{InvariantViolation, NodeView, check_edge, validate_catalog};
