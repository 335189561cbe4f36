use std::path::PathBuf;

use dxfmesh_engine::fields;
use dxfmesh_engine::summary::{DetailLevel, summarize};
use dxfmesh_io::DxfMeshReader;

fn io_fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("../dxfmesh-io/tests/data");
    path.push(name);
    path
}

#[test]
fn detailed_summary_of_parsed_tetrahedron() {
    let mut reader = DxfMeshReader::new();
    let mesh = reader
        .read_file(io_fixture("unit_tetrahedron.dxf"))
        .expect("读取四面体 DXF 失败");
    assert_eq!(reader.last_entity_count(), 4);

    let summary = summarize(&mesh, DetailLevel::Detailed);
    assert_eq!(summary.triangle_count, 4);
    let volume = summary
        .number(fields::VOLUME_ESTIMATE)
        .expect("缺少 volume_estimate");
    assert!((volume - 1.0 / 6.0).abs() < 1e-9);

    let centroid = summary.centroid;
    assert!(centroid.x() > 0.0 && centroid.x() < 1.0);
    assert!((centroid.x() - centroid.y()).abs() < 1e-12);
    assert!((centroid.y() - centroid.z()).abs() < 1e-12);
}

#[test]
fn basic_summary_of_parsed_equilateral_triangle() {
    let mut reader = DxfMeshReader::new();
    let mesh = reader
        .read_file(io_fixture("single_triangle.dxf"))
        .expect("读取单三角形 DXF 失败");
    let summary = summarize(&mesh, DetailLevel::Basic);

    let expected_area = 3f64.sqrt() / 4.0 * 100.0;
    assert!((summary.total_surface_area - expected_area).abs() < 1e-3);
    assert!((summary.bounding_box.max().x() - 10.0).abs() < 1e-12);
    assert!((summary.bounding_box.max().y() - 8.660254).abs() < 1e-12);
    assert!((summary.centroid.x() - 5.0).abs() < 1e-9);
    assert!(summary.field(fields::VOLUME_ESTIMATE).is_none());
}

#[test]
fn summary_serializes_custom_fields_by_name() {
    let mut reader = DxfMeshReader::new();
    let mesh = reader
        .read_file(io_fixture("two_triangles.dxf"))
        .expect("读取双三角形 DXF 失败");
    let summary = summarize(&mesh, DetailLevel::Detailed);

    let json = serde_json::to_value(&summary).expect("serialize summary");
    assert_eq!(json["triangle_count"], 2);
    assert_eq!(json["custom_fields"]["small_triangles_count"], 0);
    assert_eq!(json["custom_fields"]["width"], 12.0);
    assert_eq!(json["bounding_box"]["max"]["z"], 4.0);
}
