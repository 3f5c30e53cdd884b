use geo_types::{LineString, Point, Polygon};
use gpkg_container::{
    Container, ContainerOptions, Feature, FieldDescriptor, FieldType, GeometryType, GpkgError,
    LayerKind, Result, TileMatrixSet, Value,
};
use std::str::FromStr;
use tempfile::tempdir;
use wkt::Wkt;

fn survey_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::not_null("name", FieldType::Text),
        FieldDescriptor::new("depth", FieldType::Real),
        FieldDescriptor::new("samples", FieldType::Integer),
        FieldDescriptor::new("surveyed", FieldType::Date),
        FieldDescriptor::new("raw", FieldType::Binary),
    ]
}

fn wkb_of(text: &str) -> Vec<u8> {
    let geometry: Wkt<f64> = Wkt::from_str(text).expect("valid wkt");
    let mut wkb = Vec::new();
    wkb::writer::write_geometry(&mut wkb, &geometry, &Default::default()).expect("encode wkb");
    wkb
}

#[test]
fn new_file_is_an_empty_valid_container() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("fresh.gpkg");

    let gpkg = Container::open_or_create(&path)?;
    assert!(path.is_file());
    assert_eq!(gpkg.path(), Some(std::fs::canonicalize(&path)?.as_path()));
    assert!(gpkg.list_vector_layers()?.is_empty());
    assert!(gpkg.list_raster_layers()?.is_empty());
    gpkg.close()?;

    // Only the container itself is left behind.
    let entries: Vec<_> = std::fs::read_dir(dir.path())?.collect::<std::io::Result<_>>()?;
    assert_eq!(entries.len(), 1);

    let reopened = Container::open_read_only(&path)?;
    assert!(reopened.is_read_only());
    assert!(reopened.list_layers()?.is_empty());
    Ok(())
}

#[test]
fn rejects_paths_that_are_not_containers() -> Result<()> {
    let dir = tempdir()?;

    let err = Container::open_or_create(dir.path()).expect_err("directory");
    assert!(matches!(err, GpkgError::InvalidContainer { .. }));

    let text = dir.path().join("notes.gpkg");
    std::fs::write(&text, "this is not a database, just some notes that are long enough")?;
    let err = Container::open_or_create(&text).expect_err("text file");
    assert!(matches!(err, GpkgError::InvalidContainer { .. }), "{err}");

    let plain = dir.path().join("plain.sqlite");
    rusqlite::Connection::open(&plain)?.execute_batch("CREATE TABLE t (x)")?;
    let err = Container::open_or_create(&plain).expect_err("no catalog");
    assert!(matches!(err, GpkgError::InvalidContainer { .. }), "{err}");

    let missing = dir.path().join("missing.gpkg");
    let err = Container::open_read_only(&missing).expect_err("read-only never creates");
    assert!(matches!(err, GpkgError::Io(_)));
    assert!(!missing.exists());

    let err = Container::open_with(
        &missing,
        ContainerOptions {
            create_if_missing: false,
            ..Default::default()
        },
    )
    .expect_err("creation disabled");
    assert!(matches!(err, GpkgError::Io(_)));
    Ok(())
}

#[test]
fn empty_file_is_initialized_in_place() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("placeholder.gpkg");
    std::fs::File::create(&path)?;

    let mut gpkg = Container::open_or_create(&path)?;
    gpkg.create_vector_layer("points", &[], 4326, GeometryType::Point, None)?;
    assert_eq!(gpkg.list_layers()?, vec!["points"]);
    Ok(())
}

#[test]
fn created_layer_resolves_to_its_inputs() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("survey.gpkg");
    let mut gpkg = Container::open_or_create(&path)?;

    let cases = [
        ("wells", GeometryType::Point, 4326),
        ("transects", GeometryType::LineString, 4326),
        ("zones", GeometryType::Polygon, 0),
        ("anything", GeometryType::Unknown, -1),
        ("log", GeometryType::None, 0),
    ];
    for (name, geometry_type, srs_id) in cases {
        let created =
            gpkg.create_vector_layer(name, &survey_fields(), srs_id, geometry_type, None)?;
        let resolved = gpkg.resolve(name)?;
        assert_eq!(created, resolved);
        assert_eq!(resolved.fields, survey_fields());
        assert_eq!(resolved.geometry_type, geometry_type);
        assert_eq!(resolved.srs_id, srs_id);
        assert_eq!(resolved.kind, LayerKind::Vector);
    }
    gpkg.close()?;

    // The descriptors survive reopening.
    let gpkg = Container::open_read_only(&path)?;
    let names: Vec<String> = gpkg.list_vector_layers()?.into_iter().map(|l| l.name).collect();
    assert_eq!(names, vec!["wells", "transects", "zones", "anything", "log"]);
    assert_eq!(gpkg.resolve("zones")?.fields, survey_fields());
    Ok(())
}

#[test]
fn duplicate_and_invalid_creation_change_nothing() -> Result<()> {
    let mut gpkg = Container::open_in_memory()?;
    gpkg.create_vector_layer("wells", &survey_fields(), 4326, GeometryType::Point, None)?;
    let before = gpkg.list_vector_layers()?;

    let err = gpkg
        .create_vector_layer("wells", &[], 4326, GeometryType::Polygon, None)
        .expect_err("duplicate");
    assert!(matches!(err, GpkgError::DuplicateLayer { .. }));

    let err = gpkg
        .create_vector_layer("other", &survey_fields(), 4326, GeometryType::Point, Some("id"))
        .expect_err("primary key not among the fields");
    assert!(matches!(err, GpkgError::InvalidSchema(_)));
    assert!(gpkg.find("other")?.is_none());

    assert_eq!(gpkg.list_vector_layers()?, before);
    Ok(())
}

#[test]
fn one_bad_feature_rejects_the_whole_batch() -> Result<()> {
    let mut gpkg = Container::open_in_memory()?;
    gpkg.create_vector_layer("wells", &survey_fields(), 4326, GeometryType::Point, None)?;

    let mut features = (0..5)
        .map(|i| {
            Feature::with_geometry(
                [
                    Value::from(format!("well {i}")),
                    Value::Null,
                    Value::Null,
                    Value::Null,
                    Value::Null,
                ],
                Point::new(i as f64, 0.0),
            )
        })
        .collect::<Result<Vec<_>>>()?;
    features[3].properties[2] = Value::from("many");

    let err = gpkg.append_features("wells", features).expect_err("bad feature");
    match err {
        GpkgError::PartialWriteRejected { index, source } => {
            assert_eq!(index, 3);
            assert!(matches!(*source, GpkgError::ValueTypeMismatch { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(gpkg.read_features("wells")?.count(), 0);
    Ok(())
}

#[test]
fn round_trip_preserves_values_and_geometry() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("roundtrip.gpkg");
    let mut gpkg = Container::open_or_create(&path)?;
    gpkg.create_vector_layer("zones", &survey_fields(), 4326, GeometryType::Polygon, None)?;

    let square = Polygon::new(
        LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]),
        vec![],
    );
    let input = vec![
        Feature::with_geometry(
            [
                Value::from("north"),
                Value::from(12.25),
                Value::from(3),
                Value::from("2023-06-01"),
                Value::from(vec![0_u8, 1, 2, 255]),
            ],
            square,
        )?,
        Feature::new(
            [
                Value::from("south"),
                Value::Null,
                Value::Null,
                Value::Null,
                Value::Null,
            ],
            Some(wkb_of("POLYGON ((10 10, 12 10, 11 13, 10 10), (10.5 10.5, 11 10.5, 11 11, 10.5 10.5))")),
        ),
        Feature::new(
            [
                Value::from("east"),
                Value::from(-0.5),
                Value::from(0),
                Value::from("1999-12-31T23:59:59Z"),
                Value::from(Vec::<u8>::new()),
            ],
            Some(wkb_of("POLYGON ((20 0, 21 0, 21 1, 20 0))")),
        ),
    ];
    assert_eq!(gpkg.append_features("zones", input.clone())?, 3);
    gpkg.close()?;

    let gpkg = Container::open_read_only(&path)?;
    let output = gpkg.read_features("zones")?.collect::<Result<Vec<_>>>()?;
    assert_eq!(output.len(), input.len());
    for (read, written) in output.iter().zip(&input) {
        assert!(read.id.is_some());
        assert_eq!(read.properties, written.properties);
        assert_eq!(read.geometry, written.geometry);
    }
    assert_eq!(gpkg.count_features("zones")?, 3);
    Ok(())
}

#[test]
fn removed_layers_disappear_and_removal_is_idempotent() -> Result<()> {
    let mut gpkg = Container::open_in_memory()?;
    gpkg.create_vector_layer("wells", &survey_fields(), 4326, GeometryType::Point, None)?;
    gpkg.create_tile_layer(
        "basemap",
        4326,
        TileMatrixSet {
            min_x: -180.0,
            min_y: -90.0,
            max_x: 180.0,
            max_y: 90.0,
        },
    )?;
    assert_eq!(gpkg.list_layers()?, vec!["wells", "basemap"]);

    gpkg.remove_layer("wells")?;
    gpkg.remove_layer("basemap")?;
    assert!(gpkg.list_vector_layers()?.is_empty());
    assert!(gpkg.list_raster_layers()?.is_empty());
    assert!(matches!(
        gpkg.resolve("wells"),
        Err(GpkgError::NotFound { .. })
    ));

    gpkg.remove_layer("wells")?;

    // The name is free again.
    gpkg.create_vector_layer("wells", &[], 4326, GeometryType::Point, None)?;
    Ok(())
}

#[test]
fn read_only_container_refuses_writes() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("locked.gpkg");
    Container::open_or_create(&path)?.close()?;

    let mut gpkg = Container::open_read_only(&path)?;
    let err = gpkg
        .create_vector_layer("points", &[], 4326, GeometryType::Point, None)
        .expect_err("read-only");
    assert!(matches!(err, GpkgError::ReadOnly));
    assert!(matches!(gpkg.remove_layer("points"), Err(GpkgError::ReadOnly)));
    Ok(())
}
