use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Crate error type for GeoPackage container operations.
#[derive(Debug)]
pub enum GpkgError {
    /// Wraps errors returned by `rusqlite` that are not I/O failures.
    Sql(rusqlite::Error),
    /// Wraps errors returned by the `wkb` crate.
    Wkb(wkb::error::WkbError),
    /// Disk or permission failure, from the file system or reported by SQLite
    /// (cannot open, I/O error, disk full, read-only, permission denied).
    Io(std::io::Error),
    /// The path exists but is not a GeoPackage container (and is not an empty file).
    InvalidContainer { path: PathBuf, reason: String },
    /// A layer with the same name already exists.
    DuplicateLayer { layer_name: String },
    /// No layer with this name is registered in the catalog.
    NotFound { layer_name: String },
    /// Bad layer name, field list or primary key combination.
    InvalidSchema(String),
    /// A field cannot be represented by the container's column type system.
    SchemaError { column: String, reason: String },
    /// A feature batch was rolled back because the feature at `index` failed.
    PartialWriteRejected {
        index: usize,
        source: Box<GpkgError>,
    },
    /// A geometry type in metadata could not be mapped to a supported geometry type.
    UnsupportedGeometryType(String),
    /// Property count did not match the layer schema.
    InvalidPropertyCount { expected: usize, got: usize },
    /// A property value does not fit the declared field type.
    ValueTypeMismatch {
        column: String,
        expected: &'static str,
        actual: &'static str,
    },
    /// `NULL` given for a field declared `NOT NULL`.
    NullValue { column: String },
    /// A date field received text that is not an ISO-8601 date.
    InvalidDate { column: String, value: String },
    /// The geometry does not match the geometry type of the layer.
    GeometryTypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    /// A spatial layer received a feature without geometry.
    MissingGeometry,
    /// A non-spatial layer received a feature with geometry.
    UnexpectedGeometry,
    /// The feature id disagrees with its primary key property.
    IdentifierMismatch { id: i64, primary_key: i64 },
    /// GeoPackage geometry blob does not start with the `GP` magic.
    InvalidGpkgGeometryMagic,
    /// Invalid GeoPackage geometry flags byte.
    InvalidGpkgGeometryFlags(u8),
    /// GeoPackage geometry blob is too short for the fixed header.
    InvalidGpkgGeometryLength { len: usize, minimum: usize },
    /// GeoPackage geometry blob is too short for the declared envelope payload.
    InvalidGpkgGeometryEnvelope { len: usize, required: usize },
    /// Dynamic `Value` type did not match the expected conversion target.
    ValueConversion {
        expected: &'static str,
        actual: &'static str,
    },
    /// Numeric conversion failed because the value is out of range.
    ValueOutOfRange { target: &'static str },
    /// Referenced `srs_id` does not exist in `gpkg_spatial_ref_sys`.
    MissingSpatialRefSysId { srs_id: i32 },
    /// Layer table has more than one primary key column.
    CompositePrimaryKeyUnsupported { layer_name: String },
    ReadOnly,
}

impl fmt::Display for GpkgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sql(err) => write!(f, "{err}"),
            Self::Wkb(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "i/o error: {err}"),
            Self::InvalidContainer { path, reason } => {
                write!(f, "not a GeoPackage container: {} ({reason})", path.display())
            }
            Self::DuplicateLayer { layer_name } => {
                write!(f, "layer already exists: {layer_name}")
            }
            Self::NotFound { layer_name } => write!(f, "layer not found: {layer_name}"),
            Self::InvalidSchema(message) => write!(f, "invalid schema: {message}"),
            Self::SchemaError { column, reason } => {
                write!(f, "cannot represent column '{column}': {reason}")
            }
            Self::PartialWriteRejected { index, source } => {
                write!(f, "feature batch rejected at index {index}: {source}")
            }
            Self::UnsupportedGeometryType(ty) => write!(f, "unsupported geometry type: {ty}"),
            Self::InvalidPropertyCount { expected, got } => {
                write!(f, "invalid property count: expected {expected}, got {got}")
            }
            Self::ValueTypeMismatch {
                column,
                expected,
                actual,
            } => write!(f, "column '{column}' expects {expected}, got {actual}"),
            Self::NullValue { column } => write!(f, "column '{column}' does not accept NULL"),
            Self::InvalidDate { column, value } => {
                write!(f, "column '{column}' expects a YYYY-MM-DD date, got '{value}'")
            }
            Self::GeometryTypeMismatch { expected, actual } => {
                write!(f, "geometry type mismatch: expected {expected}, got {actual}")
            }
            Self::MissingGeometry => write!(f, "feature has no geometry"),
            Self::UnexpectedGeometry => write!(f, "layer has no geometry column"),
            Self::IdentifierMismatch { id, primary_key } => write!(
                f,
                "feature id {id} does not match primary key value {primary_key}"
            ),
            Self::InvalidGpkgGeometryMagic => write!(f, "invalid gpkg geometry magic"),
            Self::InvalidGpkgGeometryFlags(flags) => {
                write!(f, "invalid gpkg geometry flags: {flags:#04x}")
            }
            Self::InvalidGpkgGeometryLength { len, minimum } => {
                write!(
                    f,
                    "invalid gpkg geometry length: got {len} bytes, expected at least {minimum}"
                )
            }
            Self::InvalidGpkgGeometryEnvelope { len, required } => {
                write!(
                    f,
                    "invalid gpkg geometry envelope length: got {len} bytes, required {required}"
                )
            }
            Self::ValueConversion { expected, actual } => {
                write!(f, "expected {expected}, got {actual}")
            }
            Self::ValueOutOfRange { target } => {
                write!(f, "value out of range for {target}")
            }
            Self::MissingSpatialRefSysId { srs_id } => {
                write!(f, "srs_id {srs_id} not found in gpkg_spatial_ref_sys")
            }
            Self::CompositePrimaryKeyUnsupported { layer_name } => write!(
                f,
                "composite primary keys are not supported for layer: {layer_name}"
            ),
            Self::ReadOnly => write!(f, "operation not allowed on read-only container"),
        }
    }
}

impl Error for GpkgError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sql(err) => Some(err),
            Self::Wkb(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::PartialWriteRejected { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for GpkgError {
    fn from(err: rusqlite::Error) -> Self {
        match sqlite_io_error_kind(&err) {
            Some(kind) => Self::Io(std::io::Error::new(kind, err)),
            None => Self::Sql(err),
        }
    }
}

// SQLite failures caused by the file system rather than by the statement.
fn sqlite_io_error_kind(err: &rusqlite::Error) -> Option<std::io::ErrorKind> {
    use rusqlite::ErrorCode;
    use std::io::ErrorKind;

    let rusqlite::Error::SqliteFailure(failure, _) = err else {
        return None;
    };
    match failure.code {
        ErrorCode::CannotOpen | ErrorCode::SystemIoFailure => Some(ErrorKind::Other),
        ErrorCode::DiskFull => Some(ErrorKind::StorageFull),
        ErrorCode::PermissionDenied | ErrorCode::ReadOnly => Some(ErrorKind::PermissionDenied),
        _ => None,
    }
}

impl From<wkb::error::WkbError> for GpkgError {
    fn from(err: wkb::error::WkbError) -> Self {
        Self::Wkb(err)
    }
}

impl From<std::io::Error> for GpkgError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, GpkgError>;

#[cfg(test)]
mod tests {
    use super::GpkgError;
    use rusqlite::ffi;
    use std::io::ErrorKind;

    fn sqlite_failure(code: i32) -> GpkgError {
        rusqlite::Error::SqliteFailure(ffi::Error::new(code), None).into()
    }

    #[test]
    fn file_system_failures_become_io_errors() {
        let cases = [
            (ffi::SQLITE_CANTOPEN, ErrorKind::Other),
            (ffi::SQLITE_IOERR_WRITE, ErrorKind::Other),
            (ffi::SQLITE_FULL, ErrorKind::StorageFull),
            (ffi::SQLITE_PERM, ErrorKind::PermissionDenied),
            (ffi::SQLITE_READONLY, ErrorKind::PermissionDenied),
        ];
        for (code, kind) in cases {
            match sqlite_failure(code) {
                GpkgError::Io(err) => assert_eq!(err.kind(), kind, "code {code}"),
                other => panic!("code {code} mapped to {other:?}"),
            }
        }
    }

    #[test]
    fn statement_failures_stay_sql_errors() {
        assert!(matches!(
            sqlite_failure(ffi::SQLITE_CONSTRAINT_UNIQUE),
            GpkgError::Sql(_)
        ));
        assert!(matches!(
            GpkgError::from(rusqlite::Error::QueryReturnedNoRows),
            GpkgError::Sql(_)
        ));
    }
}
