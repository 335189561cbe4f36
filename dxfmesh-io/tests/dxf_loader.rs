use std::io::Write;
use std::path::PathBuf;

use dxfmesh_io::{DxfMeshReader, ReadError};

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    path
}

#[test]
fn load_single_triangle() {
    let mut reader = DxfMeshReader::new();
    let mut progress = Vec::new();
    let mesh = reader
        .read_file_with_progress(fixture("single_triangle.dxf"), &mut |value: f64| {
            progress.push(value)
        })
        .expect("读取单三角形 DXF 失败");

    assert_eq!(mesh.len(), 1);
    assert_eq!(reader.last_entity_count(), 1);
    assert_eq!(progress.last().copied(), Some(1.0));

    let triangle = mesh.triangles()[0];
    assert!((triangle.vertices[1].x() - 10.0).abs() < 1e-9);
    assert!((triangle.vertices[2].x() - 5.0).abs() < 1e-9);
    assert!((triangle.vertices[2].y() - 8.660254).abs() < 1e-9);

    let expected_area = 3f64.sqrt() / 4.0 * 100.0;
    assert!((mesh.total_surface_area() - expected_area).abs() < 1e-3);

    let bounds = mesh.bounds();
    assert!(bounds.min().x().abs() < 1e-12);
    assert!(bounds.min().y().abs() < 1e-12);
    assert!(bounds.min().z().abs() < 1e-12);
    assert!((bounds.max().x() - 10.0).abs() < 1e-12);
    assert!((bounds.max().y() - 8.660254).abs() < 1e-12);
    assert!(bounds.max().z().abs() < 1e-12);
}

#[test]
fn load_two_triangles() {
    let mut reader = DxfMeshReader::new();
    let mesh = reader
        .read_file(fixture("two_triangles.dxf"))
        .expect("读取双三角形 DXF 失败");
    assert_eq!(mesh.len(), 2);
    assert_eq!(reader.last_entity_count(), 2);
    assert!(reader.last_diagnostics().is_clean());
    assert!((mesh.total_surface_area() - 4.0).abs() < 1e-12);
}

#[test]
fn load_crlf_file() {
    let mut reader = DxfMeshReader::new();
    let mesh = reader
        .read_file(fixture("crlf_triangle.dxf"))
        .expect("读取 CRLF DXF 失败");
    assert_eq!(mesh.len(), 1);
    assert!((mesh.total_surface_area() - 0.5).abs() < 1e-12);
}

#[test]
fn entities_without_faces_is_an_error() {
    let mut reader = DxfMeshReader::new();
    let err = reader
        .read_file(fixture("no_faces.dxf"))
        .expect_err("期望无 3DFACE 时报错");
    assert!(matches!(err, ReadError::NoFacesFound { .. }));
    assert_eq!(reader.last_entity_count(), 0);
}

#[test]
fn empty_file_is_an_error() {
    let file = tempfile::NamedTempFile::new().expect("create temp file");
    let mut reader = DxfMeshReader::new();
    let err = reader.read_file(file.path()).expect_err("空文件应报错");
    assert!(matches!(err, ReadError::NoFacesFound { .. }));
}

#[test]
fn missing_file_is_reported() {
    let mut reader = DxfMeshReader::new();
    let err = reader
        .read_file(fixture("does_not_exist.dxf"))
        .expect_err("不存在的文件应报错");
    assert!(matches!(err, ReadError::FileNotFound { .. }));
}

#[test]
fn directory_is_not_a_regular_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let mut reader = DxfMeshReader::new();
    let err = reader.read_file(dir.path()).expect_err("目录应报错");
    assert!(matches!(err, ReadError::NotARegularFile { .. }));
}

#[test]
fn reader_is_reusable_and_deterministic() {
    let mut reader = DxfMeshReader::new();
    let first = reader
        .read_file(fixture("two_triangles.dxf"))
        .expect("第一次读取失败");
    let second = reader
        .read_file(fixture("two_triangles.dxf"))
        .expect("第二次读取失败");

    assert_eq!(first.len(), second.len());
    assert_eq!(
        first.total_surface_area().to_bits(),
        second.total_surface_area().to_bits()
    );
    assert_eq!(first.bounds(), second.bounds());

    reader
        .read_file(fixture("single_triangle.dxf"))
        .expect("第三次读取失败");
    assert_eq!(reader.last_entity_count(), 1);
}

#[test]
fn many_faces_report_monotonic_progress() {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    writeln!(file, "0\nSECTION\n2\nENTITIES").unwrap();
    for index in 0..1_000 {
        let offset = index as f64;
        writeln!(
            file,
            "0\n3DFACE\n10\n{offset}\n20\n0.0\n30\n0.0\n11\n{}\n21\n0.0\n31\n0.0\n12\n{offset}\n22\n1.0\n32\n0.0",
            offset + 1.0
        )
        .unwrap();
    }
    writeln!(file, "0\nENDSEC\n0\nEOF").unwrap();
    file.flush().unwrap();

    let mut reader = DxfMeshReader::new();
    let mut progress = Vec::new();
    let mesh = reader
        .read_file_with_progress(file.path(), &mut |value: f64| progress.push(value))
        .expect("读取大量 3DFACE 失败");

    assert_eq!(mesh.len(), 1_000);
    assert_eq!(reader.last_entity_count(), 1_000);
    assert_eq!(progress.len(), 11);
    assert!(progress.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(progress.iter().all(|value| (0.0..=1.0).contains(value)));
    assert_eq!(progress.last().copied(), Some(1.0));
    assert!((mesh.total_surface_area() - 500.0).abs() < 1e-9);
}

#[test]
fn malformed_coordinates_are_recovered_and_counted() {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    write!(
        file,
        "0\nSECTION\n2\nENTITIES\n0\n3DFACE\n10\n0.0\n20\n0.0\n30\nnot-a-number\n11\n4.0\n21\n0.0\n31\n0.0\n12\n0.0\n22\n3.0\n32\n0.0\n0\nENDSEC\n"
    )
    .unwrap();
    file.flush().unwrap();

    let mut reader = DxfMeshReader::new();
    let mesh = reader.read_file(file.path()).expect("容错读取失败");
    assert_eq!(mesh.len(), 1);
    assert!((mesh.total_surface_area() - 6.0).abs() < 1e-12);

    let diagnostics = reader.last_diagnostics();
    assert_eq!(diagnostics.coordinate_fallbacks.len(), 1);
    assert_eq!(diagnostics.coordinate_fallbacks[0].code, 30);
    assert_eq!(diagnostics.coordinate_fallbacks[0].raw, "not-a-number");
}
