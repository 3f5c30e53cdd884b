//! GeoPackage container and layer lifecycle manager built on top of rusqlite.
//!
//! ## Overview
//!
//! - `Container` is one GeoPackage file (or an in-memory database) and its catalog.
//! - `LayerDescriptor` describes a vector or raster layer registered in the catalog.
//! - `Feature` is one row of a vector layer: id, properties and WKB geometry.
//! - `Value` represents a single property value of a feature.
//!
//! `Container` is the entry point and supports several open modes:
//!
//! - `Container::open_or_create(path)`: open a file for read/write, creating
//!   it (atomically) when it does not exist.
//! - `Container::open_read_only(path)`: open an existing file without write access.
//! - `Container::open_in_memory()`: create a transient in-memory container.
//! - `Container::open_with(path, options)`: any of the above via `ContainerOptions`.
//!
//! Every mutating call is atomic on its own. Use `Container::begin_transaction`
//! to group several of them; dropping the transaction without `commit` undoes
//! all of them.
//!
//! ## Writer
//!
//! ```no_run
//! use geo_types::Point;
//! use gpkg_container::{Container, Feature, FieldDescriptor, FieldType, GeometryType, Value};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut gpkg = Container::open_or_create("data.gpkg")?;
//!
//!     let fields = vec![
//!         FieldDescriptor::not_null("name", FieldType::Text),
//!         FieldDescriptor::new("value", FieldType::Integer),
//!     ];
//!     gpkg.create_vector_layer("points", &fields, 4326, GeometryType::Point, None)?;
//!
//!     let features = vec![
//!         // geometry: whatever implements GeometryTrait<T = f64>
//!         Feature::with_geometry([Value::from("alpha"), Value::from(7)], Point::new(1.0, 2.0))?,
//!         Feature::with_geometry([Value::from("beta"), Value::Null], Point::new(3.0, 4.0))?,
//!     ];
//!     let written = gpkg.append_features("points", features)?;
//!     assert_eq!(written, 2);
//!     Ok(())
//! }
//! ```
//!
//! ## Reader
//!
//! ```no_run
//! use gpkg_container::Container;
//! use wkt::to_wkt::write_geometry;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gpkg = Container::open_read_only("data.gpkg")?;
//!     for layer in gpkg.list_vector_layers()? {
//!         for feature in gpkg.read_features(&layer.name)? {
//!             let feature = feature?;
//!             if let Some(geom) = feature.geometry()? {
//!                 let mut wkt = String::new();
//!                 write_geometry(&mut wkt, &geom)?;
//!                 println!("{}: {wkt}", layer.name);
//!             }
//!             for (field, value) in layer.fields.iter().zip(&feature.properties) {
//!                 println!("  {} = {:?}", field.name, value);
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! `read_features` fetches `ContainerOptions::batch_size` rows at a time. To
//! work on the chunks directly, use `read_feature_batches`.
//!
//! `Value` mirrors SQLite's dynamic typing (null, integer, real, text, blob).
//! Convert with `try_into()`; convert to `Option<T>` to accept `NULL`:
//!
//! ```
//! use gpkg_container::Value;
//!
//! let maybe_i64: Option<i64> = Value::Null.try_into()?;
//! assert_eq!(maybe_i64, None);
//! let name: String = Value::from("alpha").try_into()?;
//! assert_eq!(name, "alpha");
//! # Ok::<(), gpkg_container::GpkgError>(())
//! ```
mod conversions;
mod error;
mod gpkg;
mod ogc_sql;
mod sql_functions;
mod types;

pub use error::{GpkgError, Result};
pub use gpkg::{
    Container, ContainerOptions, ContainerTransaction, Feature, FeatureBatchIterator,
    FeatureReader,
};
pub use sql_functions::register_spatial_functions;
pub use types::{
    FieldDescriptor, FieldType, GeometryType, LayerDescriptor, LayerKind, TileMatrixSet, Value,
};

// Returned by `Feature::geometry`.
pub use wkb::reader::Wkb;
