use super::catalog;
use super::feature::{Feature, gpkg_geometry_wkb_bytes};
use crate::Result;
use crate::error::GpkgError;
use crate::ogc_sql::{sql_count_features, sql_select_features};
use crate::types::{LayerKind, Value};
use rusqlite::types::{Type, ValueRef};
use rusqlite::{Connection, Row};

/// Iterator that yields batches of features from a layer.
///
/// Each call to `next()` returns a `Result<Vec<Feature>>` containing up to
/// `batch_size` features in identifier order. Each batch starts right after the
/// last identifier seen, so it costs one indexed range scan.
pub struct FeatureBatchIterator<'c> {
    stmt: rusqlite::Statement<'c>,
    has_geometry: bool,
    column_count: usize,
    batch_size: u32,
    next_id: i64,
    end_or_invalid_state: bool,
}

impl<'c> FeatureBatchIterator<'c> {
    pub(crate) fn new(conn: &'c Connection, layer_name: &str, batch_size: u32) -> Result<Self> {
        let layer = catalog::resolve_layer(conn, layer_name)?;
        let descriptor = &layer.descriptor;
        if descriptor.kind == LayerKind::Raster {
            return Err(GpkgError::InvalidSchema(format!(
                "raster layer '{layer_name}' has no features"
            )));
        }

        let batch_size = batch_size.max(1);
        let sql = sql_select_features(
            &descriptor.name,
            &layer.id_column,
            descriptor.geometry_column.as_deref(),
            descriptor.fields.iter().map(|f| f.name.as_str()),
            batch_size,
        );

        let stmt = conn.prepare(&sql)?;
        Ok(Self {
            column_count: stmt.column_count(),
            stmt,
            has_geometry: descriptor.geometry_column.is_some(),
            batch_size,
            next_id: i64::MIN,
            end_or_invalid_state: false,
        })
    }
}

impl Iterator for FeatureBatchIterator<'_> {
    type Item = Result<Vec<Feature>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.end_or_invalid_state {
            return None;
        }

        let (has_geometry, column_count) = (self.has_geometry, self.column_count);
        let collected = self
            .stmt
            .query_map([self.next_id], |row| {
                row_to_feature(row, has_geometry, column_count)
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<Feature>>>());

        let features = match collected {
            Ok(features) => features,
            Err(e) => {
                self.end_or_invalid_state = true;
                return Some(Err(e.into()));
            }
        };

        // A short batch is the last one.
        if features.len() < self.batch_size as usize {
            self.end_or_invalid_state = true;
            if features.is_empty() {
                return None;
            }
        }
        if let Some(id) = features.last().and_then(|f| f.id) {
            match id.checked_add(1) {
                Some(next_id) => self.next_id = next_id,
                None => self.end_or_invalid_state = true,
            }
        }

        Some(Ok(features))
    }
}

/// Lazy, one-shot stream of the features of a layer.
///
/// Features are fetched from the container in batches as the iterator
/// advances; the iterator borrows the container until it is dropped.
pub struct FeatureReader<'c> {
    batches: FeatureBatchIterator<'c>,
    current: std::vec::IntoIter<Feature>,
}

impl<'c> FeatureReader<'c> {
    pub(crate) fn new(batches: FeatureBatchIterator<'c>) -> Self {
        Self {
            batches,
            current: Vec::new().into_iter(),
        }
    }
}

impl Iterator for FeatureReader<'_> {
    type Item = Result<Feature>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(feature) = self.current.next() {
                return Some(Ok(feature));
            }
            match self.batches.next()? {
                Ok(batch) => self.current = batch.into_iter(),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

pub(crate) fn count_features(conn: &Connection, layer_name: &str) -> Result<u64> {
    let layer = catalog::resolve_layer(conn, layer_name)?;
    let count: i64 = conn.query_row(&sql_count_features(&layer.descriptor.name), [], |row| {
        row.get(0)
    })?;
    Ok(count.max(0) as u64)
}

// Column layout: id, [geometry], fields...
fn row_to_feature(
    row: &Row<'_>,
    has_geometry: bool,
    column_count: usize,
) -> rusqlite::Result<Feature> {
    let id: i64 = row.get(0)?;
    let first_field = if has_geometry { 2 } else { 1 };

    let geometry = if has_geometry {
        match row.get_ref(1)? {
            ValueRef::Null => None,
            ValueRef::Blob(blob) => {
                let wkb = gpkg_geometry_wkb_bytes(blob).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(1, Type::Blob, Box::new(e))
                })?;
                Some(wkb.to_vec())
            }
            other => {
                return Err(rusqlite::Error::InvalidColumnType(
                    1,
                    "geometry".to_string(),
                    other.data_type(),
                ));
            }
        }
    } else {
        None
    };

    let mut properties = Vec::with_capacity(column_count.saturating_sub(first_field));
    for idx in first_field..column_count {
        properties.push(Value::from(row.get_ref(idx)?));
    }

    Ok(Feature {
        id: Some(id),
        properties,
        geometry,
    })
}

#[cfg(test)]
mod tests {
    use crate::Result;
    use crate::error::GpkgError;
    use crate::gpkg::{Container, Feature};
    use crate::types::{FieldDescriptor, FieldType, GeometryType, Value};
    use geo_types::Point;

    fn points_layer(total: usize) -> Result<Container> {
        let mut gpkg = Container::open_in_memory()?;
        gpkg.create_vector_layer(
            "batch_points",
            &[FieldDescriptor::new("seq", FieldType::Integer)],
            4326,
            GeometryType::Point,
            None,
        )?;
        let features = (0..total)
            .map(|i| Feature::with_geometry([Value::from(i as i64)], Point::new(i as f64, i as f64)))
            .collect::<Result<Vec<_>>>()?;
        gpkg.append_features("batch_points", features)?;
        Ok(gpkg)
    }

    fn assert_batch_iteration(total: usize, batch_size: u32) -> Result<()> {
        let gpkg = points_layer(total)?;

        let mut counts = Vec::new();
        for batch in gpkg.read_feature_batches("batch_points", batch_size)? {
            counts.push(batch?.len());
        }

        assert_eq!(counts.iter().sum::<usize>(), total);
        let batch_size = batch_size as usize;
        let expected_batches = total.div_ceil(batch_size);
        assert_eq!(counts.len(), expected_batches);
        for (idx, count) in counts.iter().enumerate() {
            if idx + 1 < counts.len() {
                assert_eq!(*count, batch_size);
            } else {
                assert_eq!(*count, total - batch_size * idx);
            }
        }
        Ok(())
    }

    #[test]
    fn batch_iterator_handles_empty_layer() -> Result<()> {
        assert_batch_iteration(0, 3)
    }

    #[test]
    fn batch_iterator_handles_smaller_than_batch() -> Result<()> {
        assert_batch_iteration(2, 5)
    }

    #[test]
    fn batch_iterator_handles_exact_multiple() -> Result<()> {
        assert_batch_iteration(6, 3)
    }

    #[test]
    fn batch_iterator_handles_remainder() -> Result<()> {
        assert_batch_iteration(7, 3)
    }

    #[test]
    fn batch_iterator_handles_single_item_batches() -> Result<()> {
        assert_batch_iteration(4, 1)
    }

    #[test]
    fn reader_yields_features_in_insertion_order() -> Result<()> {
        let gpkg = points_layer(5)?;
        let features = gpkg
            .read_features("batch_points")?
            .collect::<Result<Vec<_>>>()?;

        let seqs: Vec<Value> = features.iter().map(|f| f.properties[0].clone()).collect();
        assert_eq!(seqs, (0..5).map(Value::from).collect::<Vec<Value>>());
        let ids: Vec<Option<i64>> = features.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![Some(1), Some(2), Some(3), Some(4), Some(5)]);
        assert_eq!(gpkg.count_features("batch_points")?, 5);
        Ok(())
    }

    #[test]
    fn reader_covers_the_whole_id_range() -> Result<()> {
        let mut gpkg = points_layer(0)?;
        let features = [i64::MIN, 0, i64::MAX].into_iter().map(|id| {
            Feature::with_geometry([Value::from(id)], Point::new(0.0, 0.0))
                .map(|feature| feature.with_id(id))
        });
        gpkg.append_features("batch_points", features.collect::<Result<Vec<_>>>()?)?;

        for batch_size in [1, 2, 10] {
            let ids = gpkg
                .read_feature_batches("batch_points", batch_size)?
                .map(|batch| batch.map(|b| b.into_iter().map(|f| f.id).collect::<Vec<_>>()))
                .collect::<Result<Vec<_>>>()?
                .concat();
            assert_eq!(ids, vec![Some(i64::MIN), Some(0), Some(i64::MAX)]);
        }
        assert_eq!(gpkg.count_features("batch_points")?, 3);
        Ok(())
    }

    #[test]
    fn reader_is_lazy_and_one_shot() -> Result<()> {
        let gpkg = points_layer(3)?;
        let mut reader = gpkg.read_features("batch_points")?;
        assert!(reader.next().is_some());
        assert_eq!(reader.by_ref().count(), 2);
        assert!(reader.next().is_none());
        Ok(())
    }

    #[test]
    fn reading_unknown_layer_fails() -> Result<()> {
        let gpkg = Container::open_in_memory()?;
        let err = gpkg.read_features("missing").err().expect("no such layer");
        assert!(matches!(err, GpkgError::NotFound { .. }));
        Ok(())
    }
}
