use super::feature::Feature;
use super::reader::{self, FeatureBatchIterator, FeatureReader};
use super::{catalog, remover, schema, srs, writer};
use crate::error::{GpkgError, Result};
use crate::ogc_sql::{SQL_HAS_CATALOG, initialize_gpkg};
use crate::sql_functions::register_spatial_functions;
use crate::types::{FieldDescriptor, GeometryType, LayerDescriptor, TileMatrixSet};
use rusqlite::{Connection, ErrorCode, OpenFlags, TransactionBehavior};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings applied when a container is opened.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContainerOptions {
    /// Open without write access. Mutating calls fail with `GpkgError::ReadOnly`.
    pub read_only: bool,
    /// Create the file when the path does not exist. Ignored when `read_only`.
    pub create_if_missing: bool,
    /// How long a writer waits for another connection's lock.
    pub busy_timeout: Duration,
    /// Build an R-tree spatial index for new spatial layers.
    pub spatial_index: bool,
    /// Rows fetched per round trip by `read_features`.
    pub batch_size: u32,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            create_if_missing: true,
            busy_timeout: Duration::from_secs(5),
            spatial_index: true,
            batch_size: 1000,
        }
    }
}

/// A GeoPackage file (or in-memory database) and its catalog.
#[derive(Debug)]
pub struct Container {
    conn: Connection,
    path: Option<PathBuf>,
    options: ContainerOptions,
}

impl Container {
    /// Open the container at `path`, creating it when it does not exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, ContainerOptions::default())
    }

    /// Open an existing container without write access.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(
            path,
            ContainerOptions {
                read_only: true,
                create_if_missing: false,
                ..Default::default()
            },
        )
    }

    /// Create a fresh container in memory.
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with(ContainerOptions::default())
    }

    pub fn open_in_memory_with(options: ContainerOptions) -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        initialize_in_transaction(&mut conn)?;
        register_spatial_functions(&conn)?;
        Ok(Self {
            conn,
            path: None,
            options: ContainerOptions {
                read_only: false,
                ..options
            },
        })
    }

    /// Open the container at `path` with explicit options.
    ///
    /// - a directory, a file that is not SQLite, or a SQLite file without the
    ///   GeoPackage catalog is rejected with `InvalidContainer`;
    /// - an empty file is initialized in place;
    /// - a missing path is created atomically unless the options forbid it,
    ///   in which case the `Io` not-found error is returned.
    pub fn open_with<P: AsRef<Path>>(path: P, options: ContainerOptions) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_dir() => Err(invalid_container(path, "path is a directory")),
            Ok(meta) if meta.len() == 0 => {
                if options.read_only {
                    return Err(invalid_container(path, "file is empty"));
                }
                let mut conn = Connection::open_with_flags(path, read_write_flags())?;
                initialize_in_transaction(&mut conn)?;
                tracing::info!(path = %path.display(), "initialized empty file as GeoPackage");
                Self::from_connection(conn, path, options)
            }
            Ok(_) => Self::open_existing(path, options),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                if options.read_only || !options.create_if_missing {
                    return Err(err.into());
                }
                create_atomically(path)?;
                Self::open_existing(path, options)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn open_existing(path: &Path, options: ContainerOptions) -> Result<Self> {
        let flags = if options.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            read_write_flags()
        };
        let conn = Connection::open_with_flags(path, flags)?;
        conn.busy_timeout(options.busy_timeout)?;

        let catalog_tables: i64 = match conn.query_row(SQL_HAS_CATALOG, [], |row| row.get(0)) {
            Ok(n) => n,
            Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::NotADatabase => {
                return Err(invalid_container(path, "file is not a SQLite database"));
            }
            Err(err) => return Err(err.into()),
        };
        if catalog_tables != 2 {
            return Err(invalid_container(path, "GeoPackage catalog tables are missing"));
        }

        tracing::debug!(path = %path.display(), read_only = options.read_only, "opened GeoPackage");
        Self::from_connection(conn, path, options)
    }

    fn from_connection(conn: Connection, path: &Path, options: ContainerOptions) -> Result<Self> {
        conn.busy_timeout(options.busy_timeout)?;
        register_spatial_functions(&conn)?;
        Ok(Self {
            conn,
            path: Some(std::fs::canonicalize(path)?),
            options,
        })
    }

    /// Absolute path of the file; `None` for in-memory containers.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_read_only(&self) -> bool {
        self.options.read_only
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.options
    }

    /// Close the underlying connection, reporting any error SQLite raises.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| err.into())
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Start an IMMEDIATE transaction that groups several operations.
    ///
    /// Dropping the transaction without calling `commit` rolls it back.
    pub fn begin_transaction(&mut self) -> Result<ContainerTransaction<'_>> {
        if self.options.read_only {
            return Err(GpkgError::ReadOnly);
        }
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(ContainerTransaction {
            tx,
            options: self.options,
        })
    }

    /// Vector layers in registration order.
    pub fn list_vector_layers(&self) -> Result<Vec<LayerDescriptor>> {
        catalog::list_vector_layers(&self.conn)
    }

    /// Raster (tile) layers in registration order.
    pub fn list_raster_layers(&self) -> Result<Vec<LayerDescriptor>> {
        catalog::list_raster_layers(&self.conn)
    }

    /// Names of all layers: vector layers first, then raster layers.
    pub fn list_layers(&self) -> Result<Vec<String>> {
        catalog::layer_names(&self.conn)
    }

    /// Look up a layer by exact name, failing with `NotFound`.
    pub fn resolve(&self, layer_name: &str) -> Result<LayerDescriptor> {
        catalog::resolve(&self.conn, layer_name)
    }

    pub fn find(&self, layer_name: &str) -> Result<Option<LayerDescriptor>> {
        catalog::find(&self.conn, layer_name)
    }

    /// Stream the features of a layer in identifier order.
    pub fn read_features(&self, layer_name: &str) -> Result<FeatureReader<'_>> {
        Ok(FeatureReader::new(self.read_feature_batches(
            layer_name,
            self.options.batch_size,
        )?))
    }

    pub fn read_feature_batches(
        &self,
        layer_name: &str,
        batch_size: u32,
    ) -> Result<FeatureBatchIterator<'_>> {
        FeatureBatchIterator::new(&self.conn, layer_name, batch_size)
    }

    pub fn count_features(&self, layer_name: &str) -> Result<u64> {
        reader::count_features(&self.conn, layer_name)
    }

    /// Create a vector layer and register it in the catalog.
    ///
    /// `geometry_type` `None` creates a non-spatial (`attributes`) table. When
    /// `primary_key` names an integer field, that field holds the feature id;
    /// otherwise a hidden `fid` column does.
    pub fn create_vector_layer(
        &mut self,
        layer_name: &str,
        fields: &[FieldDescriptor],
        srs_id: i32,
        geometry_type: GeometryType,
        primary_key: Option<&str>,
    ) -> Result<LayerDescriptor> {
        let mut tx = self.begin_transaction()?;
        let layer =
            tx.create_vector_layer(layer_name, fields, srs_id, geometry_type, primary_key)?;
        tx.commit()?;
        Ok(layer)
    }

    /// Create an empty tile pyramid layer.
    pub fn create_tile_layer(
        &mut self,
        layer_name: &str,
        srs_id: i32,
        matrix_set: TileMatrixSet,
    ) -> Result<LayerDescriptor> {
        let mut tx = self.begin_transaction()?;
        let layer = tx.create_tile_layer(layer_name, srs_id, matrix_set)?;
        tx.commit()?;
        Ok(layer)
    }

    /// Append features to a vector layer. Either every feature is written or,
    /// on the first failure, none is.
    pub fn append_features<I>(&mut self, layer_name: &str, features: I) -> Result<usize>
    where
        I: IntoIterator<Item = Feature>,
    {
        let mut tx = self.begin_transaction()?;
        let written = tx.append_features(layer_name, features)?;
        tx.commit()?;
        Ok(written)
    }

    /// Drop a layer and its catalog rows. Removing a missing layer is a no-op.
    pub fn remove_layer(&mut self, layer_name: &str) -> Result<()> {
        let mut tx = self.begin_transaction()?;
        tx.remove_layer(layer_name)?;
        tx.commit()
    }

    /// Expert-only: register a spatial reference system in gpkg_spatial_ref_sys.
    ///
    /// Layers must reference an `srs_id` that already exists. Only EPSG:4326
    /// and the undefined systems (-1, 0) come with a new container; anything
    /// else has to be inserted with its full definition first. No validation
    /// of the WKT or authority fields is done.
    ///
    /// Example: register EPSG:3857 (Web Mercator / Pseudo-Mercator).
    /// ```
    /// # use gpkg_container::Container;
    /// let mut gpkg = Container::open_in_memory()?;
    /// let definition = r#"PROJCS["WGS 84 / Pseudo-Mercator",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]],PROJECTION["Mercator_1SP"],PARAMETER["central_meridian",0],PARAMETER["scale_factor",1],PARAMETER["false_easting",0],PARAMETER["false_northing",0],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AXIS["Easting",EAST],AXIS["Northing",NORTH],AUTHORITY["EPSG","3857"]]"#;
    /// gpkg.register_srs(
    ///     "WGS 84 / Pseudo-Mercator",
    ///     3857,
    ///     "EPSG",
    ///     3857,
    ///     definition,
    ///     "Web Mercator / Pseudo-Mercator (EPSG:3857)",
    /// )?;
    /// # Ok::<(), gpkg_container::GpkgError>(())
    /// ```
    pub fn register_srs(
        &mut self,
        srs_name: &str,
        srs_id: i32,
        organization: &str,
        organization_coordsys_id: i32,
        definition: &str,
        description: &str,
    ) -> Result<()> {
        let mut tx = self.begin_transaction()?;
        tx.register_srs(
            srs_name,
            srs_id,
            organization,
            organization_coordsys_id,
            definition,
            description,
        )?;
        tx.commit()
    }
}

/// A write transaction over a `Container`.
///
/// Each mutating call runs in its own savepoint: a failed call is undone
/// without disturbing earlier calls of the same transaction. Nothing is
/// persisted until `commit`; dropping the transaction rolls it back.
pub struct ContainerTransaction<'c> {
    tx: rusqlite::Transaction<'c>,
    options: ContainerOptions,
}

impl ContainerTransaction<'_> {
    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }

    pub fn rollback(self) -> Result<()> {
        self.tx.rollback()?;
        Ok(())
    }

    pub fn list_vector_layers(&self) -> Result<Vec<LayerDescriptor>> {
        catalog::list_vector_layers(&self.tx)
    }

    pub fn list_raster_layers(&self) -> Result<Vec<LayerDescriptor>> {
        catalog::list_raster_layers(&self.tx)
    }

    pub fn list_layers(&self) -> Result<Vec<String>> {
        catalog::layer_names(&self.tx)
    }

    pub fn resolve(&self, layer_name: &str) -> Result<LayerDescriptor> {
        catalog::resolve(&self.tx, layer_name)
    }

    pub fn find(&self, layer_name: &str) -> Result<Option<LayerDescriptor>> {
        catalog::find(&self.tx, layer_name)
    }

    pub fn read_features(&self, layer_name: &str) -> Result<FeatureReader<'_>> {
        Ok(FeatureReader::new(self.read_feature_batches(
            layer_name,
            self.options.batch_size,
        )?))
    }

    pub fn read_feature_batches(
        &self,
        layer_name: &str,
        batch_size: u32,
    ) -> Result<FeatureBatchIterator<'_>> {
        FeatureBatchIterator::new(&self.tx, layer_name, batch_size)
    }

    pub fn count_features(&self, layer_name: &str) -> Result<u64> {
        reader::count_features(&self.tx, layer_name)
    }

    pub fn create_vector_layer(
        &mut self,
        layer_name: &str,
        fields: &[FieldDescriptor],
        srs_id: i32,
        geometry_type: GeometryType,
        primary_key: Option<&str>,
    ) -> Result<LayerDescriptor> {
        let sp = self.tx.savepoint()?;
        let layer = schema::create_vector_layer(
            &sp,
            layer_name,
            fields,
            srs_id,
            geometry_type,
            primary_key,
            self.options.spatial_index,
        )?;
        sp.commit()?;
        Ok(layer)
    }

    pub fn create_tile_layer(
        &mut self,
        layer_name: &str,
        srs_id: i32,
        matrix_set: TileMatrixSet,
    ) -> Result<LayerDescriptor> {
        let sp = self.tx.savepoint()?;
        let layer = schema::create_tile_layer(&sp, layer_name, srs_id, matrix_set)?;
        sp.commit()?;
        Ok(layer)
    }

    pub fn append_features<I>(&mut self, layer_name: &str, features: I) -> Result<usize>
    where
        I: IntoIterator<Item = Feature>,
    {
        let sp = self.tx.savepoint()?;
        let written = writer::append_features(&sp, layer_name, features)?;
        sp.commit()?;
        Ok(written)
    }

    pub fn remove_layer(&mut self, layer_name: &str) -> Result<()> {
        let sp = self.tx.savepoint()?;
        remover::remove_layer(&sp, layer_name)?;
        sp.commit()?;
        Ok(())
    }

    pub fn register_srs(
        &mut self,
        srs_name: &str,
        srs_id: i32,
        organization: &str,
        organization_coordsys_id: i32,
        definition: &str,
        description: &str,
    ) -> Result<()> {
        let sp = self.tx.savepoint()?;
        srs::register_srs(
            &sp,
            srs_name,
            srs_id,
            organization,
            organization_coordsys_id,
            definition,
            description,
        )?;
        sp.commit()?;
        Ok(())
    }
}

fn read_write_flags() -> OpenFlags {
    OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX
}

fn invalid_container(path: &Path, reason: &str) -> GpkgError {
    GpkgError::InvalidContainer {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn initialize_in_transaction(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    initialize_gpkg(&tx)?;
    tx.commit()?;
    Ok(())
}

// The catalog is written to a temporary file next to `path`, which is then
// linked into place without replacing anything created meanwhile.
fn create_atomically(path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = tempfile::Builder::new()
        .prefix(".gpkg-")
        .suffix(".tmp")
        .tempfile_in(dir)?;

    let mut conn = Connection::open(tmp.path())?;
    initialize_in_transaction(&mut conn)?;
    conn.close().map_err(|(_, err)| err)?;

    match tmp.persist_noclobber(path) {
        Ok(_) => {
            tracing::info!(path = %path.display(), "created GeoPackage");
            Ok(())
        }
        Err(err) if err.error.kind() == ErrorKind::AlreadyExists => {
            tracing::warn!(path = %path.display(), "file appeared while creating; opening it instead");
            Ok(())
        }
        Err(err) => Err(err.error.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::{Container, ContainerOptions, create_atomically};
    use crate::Result;
    use crate::error::GpkgError;
    use crate::gpkg::Feature;
    use crate::types::{FieldDescriptor, FieldType, GeometryType, Value};

    #[test]
    fn in_memory_container_has_catalog() -> Result<()> {
        let gpkg = Container::open_in_memory()?;
        assert!(gpkg.path().is_none());
        assert!(!gpkg.is_read_only());
        assert!(gpkg.list_layers()?.is_empty());

        let conn = gpkg.connection();
        let application_id: i32 =
            conn.pragma_query_value(None, "application_id", |row| row.get(0))?;
        let user_version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        assert_eq!(application_id, 0x4750_4B47);
        assert_eq!(user_version, 10300);
        Ok(())
    }

    #[test]
    fn failed_call_keeps_earlier_work_of_transaction() -> Result<()> {
        let mut gpkg = Container::open_in_memory()?;
        let fields = [FieldDescriptor::not_null("name", FieldType::Text)];

        let mut tx = gpkg.begin_transaction()?;
        tx.create_vector_layer("places", &fields, 4326, GeometryType::None, None)?;
        tx.append_features("places", [Feature::without_geometry([Value::from("a")])])?;
        let failed = tx.append_features(
            "places",
            [
                Feature::without_geometry([Value::from("b")]),
                Feature::without_geometry([Value::Null]),
            ],
        );
        assert!(matches!(
            failed,
            Err(GpkgError::PartialWriteRejected { index: 1, .. })
        ));
        assert_eq!(tx.count_features("places")?, 1);
        tx.commit()?;

        assert_eq!(gpkg.count_features("places")?, 1);
        Ok(())
    }

    #[test]
    fn dropped_transaction_rolls_back() -> Result<()> {
        let mut gpkg = Container::open_in_memory()?;
        {
            let mut tx = gpkg.begin_transaction()?;
            tx.create_vector_layer("scratch", &[], 4326, GeometryType::Point, None)?;
            assert!(tx.find("scratch")?.is_some());
        }
        assert!(gpkg.find("scratch")?.is_none());
        Ok(())
    }

    #[test]
    fn spatial_index_can_be_disabled() -> Result<()> {
        let mut gpkg = Container::open_in_memory_with(ContainerOptions {
            spatial_index: false,
            ..Default::default()
        })?;
        gpkg.create_vector_layer("points", &[], 4326, GeometryType::Point, None)?;

        let rtree_tables: i64 = gpkg.connection().query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE name LIKE 'rtree_points_geom%'",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(rtree_tables, 0);
        Ok(())
    }

    fn dir_entries(dir: &std::path::Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    #[test]
    fn atomic_create_never_replaces_an_existing_container() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("shared.gpkg");
        let mut gpkg = Container::open_or_create(&path)?;
        gpkg.create_vector_layer("first", &[], 4326, GeometryType::Point, None)?;
        gpkg.close()?;

        // Another writer got there between the existence check and the rename.
        create_atomically(&path)?;

        assert_eq!(dir_entries(dir.path())?, vec!["shared.gpkg"]);
        let gpkg = Container::open_read_only(&path)?;
        assert_eq!(gpkg.list_layers()?, vec!["first"]);
        Ok(())
    }

    #[test]
    fn atomic_create_leaves_nothing_behind_on_failure() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("missing-dir").join("new.gpkg");

        let err = create_atomically(&path).expect_err("parent directory does not exist");
        assert!(matches!(err, GpkgError::Io(_)));
        assert!(dir_entries(dir.path())?.is_empty());

        let err = Container::open_or_create(&path).expect_err("parent directory does not exist");
        assert!(matches!(err, GpkgError::Io(_)));
        assert!(dir_entries(dir.path())?.is_empty());
        Ok(())
    }
}
