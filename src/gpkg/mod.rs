//! GeoPackage container surface backed by rusqlite.
//!
//! `Container` owns the connection; the catalog, schema, writer, reader and
//! remover modules implement the operations on any `&Connection`, so the same
//! code runs on the bare connection, a transaction or a savepoint.

mod catalog;
mod container;
mod feature;
mod reader;
mod remover;
mod schema;
mod srs;
mod writer;

pub use container::{Container, ContainerOptions, ContainerTransaction};
pub use feature::Feature;
pub use reader::{FeatureBatchIterator, FeatureReader};

pub(crate) use feature::gpkg_geometry_to_wkb;
#[cfg(test)]
pub(crate) use feature::wkb_to_gpkg_geometry;
