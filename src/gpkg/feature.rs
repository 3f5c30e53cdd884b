use crate::error::{GpkgError, Result};
use crate::types::Value;
use geo_traits::GeometryTrait;
use wkb::reader::Wkb;

/// One row of a vector layer: identifier, ordered properties and optional WKB geometry.
///
/// `properties` follow the layer's `fields` order, including the primary key
/// field when the layer declares one. Features read from a layer always carry
/// an `id`; when writing, `None` lets the container assign it.
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub id: Option<i64>,
    pub properties: Vec<Value>,
    /// Geometry as ISO WKB, without the GeoPackage binary header.
    pub geometry: Option<Vec<u8>>,
}

impl Feature {
    /// Build a feature from raw WKB bytes.
    pub fn new<I>(properties: I, geometry: Option<Vec<u8>>) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Self {
            id: None,
            properties: properties.into_iter().collect(),
            geometry,
        }
    }

    /// Build a feature by encoding any `geo_traits` geometry to WKB.
    ///
    /// Example:
    /// ```
    /// use geo_types::Point;
    /// use gpkg_container::{Feature, Value};
    ///
    /// let feature = Feature::with_geometry([Value::from("harbour")], Point::new(10.0, 53.5))?;
    /// assert!(feature.geometry.is_some());
    /// # Ok::<(), gpkg_container::GpkgError>(())
    /// ```
    pub fn with_geometry<I, G>(properties: I, geometry: G) -> Result<Self>
    where
        I: IntoIterator<Item = Value>,
        G: GeometryTrait<T = f64>,
    {
        let mut wkb = Vec::new();
        wkb::writer::write_geometry(&mut wkb, &geometry, &Default::default())?;
        Ok(Self::new(properties, Some(wkb)))
    }

    /// Build a feature for a non-spatial layer.
    pub fn without_geometry<I>(properties: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Self::new(properties, None)
    }

    /// Set an explicit identifier.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn property(&self, idx: usize) -> Option<&Value> {
        self.properties.get(idx)
    }

    /// Parse the geometry bytes.
    pub fn geometry(&self) -> Result<Option<Wkb<'_>>> {
        match &self.geometry {
            Some(bytes) => Ok(Some(Wkb::try_new(bytes)?)),
            None => Ok(None),
        }
    }
}

const GPKG_HEADER_LEN: usize = 8;

/// Strip GeoPackage header and envelope bytes to access raw WKB.
// cf. https://www.geopackage.org/spec140/index.html#gpb_format
pub(crate) fn gpkg_geometry_wkb_bytes(b: &[u8]) -> Result<&[u8]> {
    if b.len() < GPKG_HEADER_LEN {
        return Err(GpkgError::InvalidGpkgGeometryLength {
            len: b.len(),
            minimum: GPKG_HEADER_LEN,
        });
    }
    if b[0] != b'G' || b[1] != b'P' {
        return Err(GpkgError::InvalidGpkgGeometryMagic);
    }

    let flags = b[3];
    let envelope_size: usize = match flags & 0b00001110 {
        0b00000000 => 0,  // no envelope
        0b00000010 => 32, // envelope is [minx, maxx, miny, maxy], 32 bytes
        0b00000100 => 48, // envelope is [minx, maxx, miny, maxy, minz, maxz], 48 bytes
        0b00000110 => 48, // envelope is [minx, maxx, miny, maxy, minm, maxm], 48 bytes
        0b00001000 => 64, // envelope is [minx, maxx, miny, maxy, minz, maxz, minm, maxm], 64 bytes
        _ => {
            return Err(GpkgError::InvalidGpkgGeometryFlags(flags));
        }
    };
    let offset = GPKG_HEADER_LEN + envelope_size;
    if b.len() < offset {
        return Err(GpkgError::InvalidGpkgGeometryEnvelope {
            len: b.len(),
            required: offset,
        });
    }

    Ok(&b[offset..])
}

pub(crate) fn gpkg_geometry_to_wkb(b: &[u8]) -> Result<Wkb<'_>> {
    Ok(Wkb::try_new(gpkg_geometry_wkb_bytes(b)?)?)
}

const GPKG_FLAG_LITTLE_ENDIAN: u8 = 0b0000_0001;
const GPKG_FLAG_EMPTY: u8 = 0b0001_0000;

/// Prefix WKB with a GeoPackage header (little endian SRS id, no envelope).
///
/// `is_empty` sets the empty-geometry flag, e.g. for `POINT EMPTY`.
// cf. https://www.geopackage.org/spec140/index.html#gpb_format
pub(crate) fn wkb_to_gpkg_geometry(wkb: &[u8], srs_id: i32, is_empty: bool) -> Vec<u8> {
    let mut flags = GPKG_FLAG_LITTLE_ENDIAN;
    if is_empty {
        flags |= GPKG_FLAG_EMPTY;
    }

    let mut geom = Vec::with_capacity(wkb.len() + GPKG_HEADER_LEN);
    geom.extend_from_slice(&[
        0x47u8, // magic
        0x50u8, // magic
        0x00u8, // version
        flags,
    ]);
    geom.extend_from_slice(&srs_id.to_le_bytes());
    geom.extend_from_slice(wkb);
    geom
}
