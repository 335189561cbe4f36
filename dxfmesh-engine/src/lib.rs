/// 自定义字段名。与历史输出保持一致，`triangle_area_variance` 实为 `max - min`。
pub mod fields {
    pub const MESH_DENSITY: &str = "mesh_density";
    pub const AVERAGE_TRIANGLE_AREA: &str = "average_triangle_area";
    pub const BOUNDING_BOX_VOLUME: &str = "bounding_box_volume";
    pub const WIDTH: &str = "width";
    pub const HEIGHT: &str = "height";
    pub const DEPTH: &str = "depth";

    pub const VOLUME_ESTIMATE: &str = "volume_estimate";
    pub const MIN_TRIANGLE_AREA: &str = "min_triangle_area";
    pub const MAX_TRIANGLE_AREA: &str = "max_triangle_area";
    pub const TRIANGLE_AREA_VARIANCE: &str = "triangle_area_variance";
    pub const COMPACTNESS_RATIO: &str = "compactness_ratio";
    pub const AVERAGE_TRIANGLE_AREA_DETAILED: &str = "average_triangle_area_detailed";
    pub const SMALL_TRIANGLES_COUNT: &str = "small_triangles_count";
    pub const LARGE_TRIANGLES_COUNT: &str = "large_triangles_count";
    pub const SMALL_TRIANGLES_PERCENTAGE: &str = "small_triangles_percentage";
    pub const LARGE_TRIANGLES_PERCENTAGE: &str = "large_triangles_percentage";
}

pub mod summary {
    use std::collections::BTreeMap;
    use std::fmt;

    use dxfmesh_core::geometry::{Bounds3D, Point3};
    use dxfmesh_core::mesh::Mesh;
    use serde::Serialize;
    use tracing::{debug, info};

    use crate::fields;

    /// 面积低于均值该倍数视为“小三角形”。
    const SMALL_TRIANGLE_FACTOR: f64 = 0.5;
    /// 面积高于均值该倍数视为“大三角形”。
    const LARGE_TRIANGLE_FACTOR: f64 = 2.0;

    /// 统计详细程度。`Detailed` 在 `Basic` 的结果上追加字段。
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub enum DetailLevel {
        #[default]
        Basic,
        Detailed,
    }

    /// 自定义字段的取值。退化包围盒导致的 `inf`/`NaN` 原样保留。
    #[derive(Debug, Clone, PartialEq, Serialize)]
    #[serde(untagged)]
    pub enum FieldValue {
        Count(usize),
        Number(f64),
        Text(String),
    }

    impl FieldValue {
        pub fn as_f64(&self) -> Option<f64> {
            match self {
                FieldValue::Count(value) => Some(*value as f64),
                FieldValue::Number(value) => Some(*value),
                FieldValue::Text(_) => None,
            }
        }
    }

    impl fmt::Display for FieldValue {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                FieldValue::Count(value) => write!(f, "{value}"),
                FieldValue::Number(value) => write!(f, "{value:.6}"),
                FieldValue::Text(value) => f.write_str(value),
            }
        }
    }

    impl From<usize> for FieldValue {
        fn from(value: usize) -> Self {
            FieldValue::Count(value)
        }
    }

    impl From<f64> for FieldValue {
        fn from(value: f64) -> Self {
            FieldValue::Number(value)
        }
    }

    impl From<String> for FieldValue {
        fn from(value: String) -> Self {
            FieldValue::Text(value)
        }
    }

    /// 一次统计得到的快照。
    #[derive(Debug, Clone, Serialize)]
    pub struct Summary {
        pub triangle_count: usize,
        pub bounding_box: Bounds3D,
        pub total_surface_area: f64,
        /// 以面积加权的三角形中心均值；总面积为 0 时为原点。
        pub centroid: Point3,
        pub custom_fields: BTreeMap<String, FieldValue>,
    }

    impl Summary {
        pub fn field(&self, name: &str) -> Option<&FieldValue> {
            self.custom_fields.get(name)
        }

        pub fn number(&self, name: &str) -> Option<f64> {
            self.field(name).and_then(FieldValue::as_f64)
        }

        pub fn insert_field(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
            self.custom_fields.insert(name.into(), value.into());
        }
    }

    /// 对网格做统计。空网格不会报错：计数与面积为 0，质心为原点，不产生自定义字段。
    pub fn summarize(mesh: &Mesh, level: DetailLevel) -> Summary {
        let mut summary = summarize_basic(mesh);
        if level == DetailLevel::Detailed {
            extend_detailed(mesh, &mut summary);
        }
        info!(
            triangles = summary.triangle_count,
            area = summary.total_surface_area,
            fields = summary.custom_fields.len(),
            ?level,
            "网格统计完成"
        );
        summary
    }

    fn summarize_basic(mesh: &Mesh) -> Summary {
        let mut bounds = Bounds3D::empty();
        let mut total_area = 0.0;
        let mut weighted_center = Point3::ORIGIN;
        for triangle in mesh.triangles() {
            for vertex in triangle.vertices {
                bounds.include_point(vertex);
            }
            let area = triangle.area();
            total_area += area;
            weighted_center = weighted_center + triangle.center() * area;
        }

        let centroid = if total_area > 0.0 {
            weighted_center * (1.0 / total_area)
        } else {
            Point3::ORIGIN
        };

        let mut summary = Summary {
            triangle_count: mesh.len(),
            bounding_box: bounds,
            total_surface_area: total_area,
            centroid,
            custom_fields: BTreeMap::new(),
        };
        if mesh.is_empty() {
            return summary;
        }

        let count = summary.triangle_count as f64;
        let volume = bounds.volume();
        let size = bounds.size();
        if volume == 0.0 {
            debug!("包围盒体积为 0，密度类字段将为无穷大");
        }
        summary.insert_field(fields::MESH_DENSITY, count / volume);
        summary.insert_field(fields::AVERAGE_TRIANGLE_AREA, total_area / count);
        summary.insert_field(fields::BOUNDING_BOX_VOLUME, volume);
        summary.insert_field(fields::WIDTH, size.x());
        summary.insert_field(fields::HEIGHT, size.y());
        summary.insert_field(fields::DEPTH, size.z());
        summary
    }

    /// 有向体积公式仅对封闭且朝向一致的网格给出真实体积；开放网格照常输出但无实际意义。
    fn extend_detailed(mesh: &Mesh, summary: &mut Summary) {
        if mesh.is_empty() {
            return;
        }

        let count = summary.triangle_count as f64;
        let average = summary.total_surface_area / count;
        let small_limit = average * SMALL_TRIANGLE_FACTOR;
        let large_limit = average * LARGE_TRIANGLE_FACTOR;

        let mut signed_volume = 0.0;
        let mut min_area = f64::MAX;
        let mut max_area = f64::MIN;
        let mut small = 0_usize;
        let mut large = 0_usize;
        for triangle in mesh.triangles() {
            let area = triangle.area();
            signed_volume += triangle.signed_volume();
            min_area = min_area.min(area);
            max_area = max_area.max(area);
            if area < small_limit {
                small += 1;
            }
            if area > large_limit {
                large += 1;
            }
        }

        summary.insert_field(fields::VOLUME_ESTIMATE, signed_volume.abs());
        summary.insert_field(fields::MIN_TRIANGLE_AREA, min_area);
        summary.insert_field(fields::MAX_TRIANGLE_AREA, max_area);
        summary.insert_field(fields::TRIANGLE_AREA_VARIANCE, max_area - min_area);
        summary.insert_field(
            fields::COMPACTNESS_RATIO,
            summary.total_surface_area / summary.bounding_box.volume(),
        );
        summary.insert_field(fields::AVERAGE_TRIANGLE_AREA_DETAILED, average);
        summary.insert_field(fields::SMALL_TRIANGLES_COUNT, small);
        summary.insert_field(fields::LARGE_TRIANGLES_COUNT, large);
        summary.insert_field(
            fields::SMALL_TRIANGLES_PERCENTAGE,
            small as f64 / count * 100.0,
        );
        summary.insert_field(
            fields::LARGE_TRIANGLES_PERCENTAGE,
            large as f64 / count * 100.0,
        );
    }

}
