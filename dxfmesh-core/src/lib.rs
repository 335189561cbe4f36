pub mod geometry {
    use std::ops::{Add, Mul, Sub};

    use glam::DVec3;
    use serde::{Deserialize, Serialize};

    /// 点比较使用的绝对容差，逐轴判定 `|a - b| < POINT_EPSILON`。
    pub const POINT_EPSILON: f64 = 1e-9;

    /// 三维点，内部以 `glam::DVec3` 表示。边向量、法向量同样用该类型承载。
    ///
    /// 相等比较带容差（见 [`POINT_EPSILON`]），因此不满足传递性，不可作为哈希键。
    #[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
    #[serde(from = "PointRepr", into = "PointRepr")]
    pub struct Point3(pub DVec3);

    impl Point3 {
        pub const ORIGIN: Point3 = Point3(DVec3::ZERO);

        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }

        #[inline]
        pub fn dot(self, other: Point3) -> f64 {
            self.0.dot(other.0)
        }

        #[inline]
        pub fn cross(self, other: Point3) -> Point3 {
            Self(self.0.cross(other.0))
        }

        #[inline]
        pub fn magnitude(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn scale(self, factor: f64) -> Point3 {
            Self(self.0 * factor)
        }

        /// 逐轴容差比较。
        #[inline]
        pub fn approx_eq(self, other: Point3) -> bool {
            let delta = (self.0 - other.0).abs();
            delta.x < POINT_EPSILON && delta.y < POINT_EPSILON && delta.z < POINT_EPSILON
        }
    }

    impl PartialEq for Point3 {
        fn eq(&self, other: &Self) -> bool {
            self.approx_eq(*other)
        }
    }

    impl Add for Point3 {
        type Output = Point3;

        fn add(self, rhs: Point3) -> Point3 {
            Self(self.0 + rhs.0)
        }
    }

    impl Sub for Point3 {
        type Output = Point3;

        fn sub(self, rhs: Point3) -> Point3 {
            Self(self.0 - rhs.0)
        }
    }

    impl Mul<f64> for Point3 {
        type Output = Point3;

        fn mul(self, rhs: f64) -> Point3 {
            self.scale(rhs)
        }
    }

    #[derive(Serialize, Deserialize)]
    struct PointRepr {
        x: f64,
        y: f64,
        z: f64,
    }

    impl From<PointRepr> for Point3 {
        fn from(value: PointRepr) -> Self {
            Point3::new(value.x, value.y, value.z)
        }
    }

    impl From<Point3> for PointRepr {
        fn from(value: Point3) -> Self {
            Self {
                x: value.x(),
                y: value.y(),
                z: value.z(),
            }
        }
    }

    /// 三角面片。顶点顺序决定法向量方向与有向体积的符号。
    #[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
    pub struct Triangle {
        pub vertices: [Point3; 3],
    }

    impl Triangle {
        #[inline]
        pub fn new(a: Point3, b: Point3, c: Point3) -> Self {
            Self {
                vertices: [a, b, c],
            }
        }

        /// 未归一化的法向量，模长为面积的两倍。退化三角形得到零向量。
        pub fn normal(&self) -> Point3 {
            let edge1 = self.vertices[1] - self.vertices[0];
            let edge2 = self.vertices[2] - self.vertices[0];
            edge1.cross(edge2)
        }

        #[inline]
        pub fn area(&self) -> f64 {
            self.normal().magnitude() * 0.5
        }

        /// 三个顶点的算术平均。
        pub fn center(&self) -> Point3 {
            (self.vertices[0] + self.vertices[1] + self.vertices[2]) * (1.0 / 3.0)
        }

        /// 相对原点的有向四面体体积 `v0 · (v1 × v2) / 6`。
        pub fn signed_volume(&self) -> f64 {
            let [v0, v1, v2] = self.vertices;
            v0.dot(v1.cross(v2)) / 6.0
        }
    }

    /// 三维轴对齐边界框。初始为空（min = +∞，max = -∞），吸收第一个点后才有意义。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds3D {
        min: Point3,
        max: Point3,
    }

    impl Bounds3D {
        #[inline]
        pub fn new(min: Point3, max: Point3) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
                max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y() || self.min.z() > self.max.z()
        }

        #[inline]
        pub fn min(&self) -> Point3 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point3 {
            self.max
        }

        /// 逐轴更新最小/最大值。
        pub fn include_point(&mut self, point: Point3) {
            self.min = Point3(self.min.as_vec3().min(point.as_vec3()));
            self.max = Point3(self.max.as_vec3().max(point.as_vec3()));
        }

        /// `max - min`。为空时分量为负无穷，调用方需先检查 [`Bounds3D::is_empty`]。
        #[inline]
        pub fn size(&self) -> Point3 {
            self.max - self.min
        }

        #[inline]
        pub fn center(&self) -> Point3 {
            debug_assert!(!self.is_empty());
            (self.min + self.max) * 0.5
        }

        /// 包围盒体积，共面网格为 0。
        pub fn volume(&self) -> f64 {
            let size = self.size();
            size.x() * size.y() * size.z()
        }
    }

    impl Default for Bounds3D {
        fn default() -> Self {
            Self::empty()
        }
    }
}

pub mod mesh {
    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds3D, Triangle};

    /// 按插入顺序保存三角面片的网格。
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct Mesh {
        triangles: Vec<Triangle>,
    }

    impl Mesh {
        pub fn new() -> Self {
            Self::default()
        }

        #[inline]
        pub fn push(&mut self, triangle: Triangle) {
            self.triangles.push(triangle);
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.triangles.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.triangles.is_empty()
        }

        #[inline]
        pub fn triangles(&self) -> &[Triangle] {
            &self.triangles
        }

        /// 遍历所有顶点折叠出的边界框；空网格返回空边界框。
        pub fn bounds(&self) -> Bounds3D {
            self.triangles
                .iter()
                .flat_map(|triangle| triangle.vertices)
                .fold(Bounds3D::empty(), |mut bounds, vertex| {
                    bounds.include_point(vertex);
                    bounds
                })
        }

        pub fn total_surface_area(&self) -> f64 {
            self.triangles.iter().map(Triangle::area).sum()
        }
    }

    impl FromIterator<Triangle> for Mesh {
        fn from_iter<I: IntoIterator<Item = Triangle>>(iter: I) -> Self {
            Self {
                triangles: iter.into_iter().collect(),
            }
        }
    }

    impl Extend<Triangle> for Mesh {
        fn extend<I: IntoIterator<Item = Triangle>>(&mut self, iter: I) {
            self.triangles.extend(iter);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::geometry::{Bounds3D, POINT_EPSILON, Point3, Triangle};
    use super::mesh::Mesh;

    fn equilateral() -> Triangle {
        Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(5.0, 8.660254, 0.0),
        )
    }

    #[test]
    fn point_arithmetic() {
        let a = Point3::new(1.0, 2.0, 3.0);
        let b = Point3::new(4.0, 5.0, 6.0);
        assert_eq!(a + b, Point3::new(5.0, 7.0, 9.0));
        assert_eq!(b - a, Point3::new(3.0, 3.0, 3.0));
        assert_eq!(a * 2.0, Point3::new(2.0, 4.0, 6.0));
        assert!((a.dot(b) - 32.0).abs() < 1e-12);
        assert_eq!(a.cross(b), Point3::new(-3.0, 6.0, -3.0));
        assert!((Point3::new(3.0, 4.0, 0.0).magnitude() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn point_equality_uses_absolute_tolerance() {
        let base = Point3::new(1.0, 1.0, 1.0);
        assert_eq!(base, Point3::new(1.0 + POINT_EPSILON * 0.5, 1.0, 1.0));
        assert_ne!(base, Point3::new(1.0 + POINT_EPSILON * 2.0, 1.0, 1.0));
        assert_ne!(base, Point3::new(1.0, 1.0, 1.0 - 1e-6));
    }

    #[test]
    fn triangle_area_normal_and_center() {
        let triangle = equilateral();
        let expected = 3f64.sqrt() / 4.0 * 100.0;
        assert!((triangle.area() - expected).abs() < 1e-3);
        let normal = triangle.normal();
        assert!(normal.x().abs() < 1e-12);
        assert!(normal.y().abs() < 1e-12);
        assert!(normal.z() > 0.0);
        let center = triangle.center();
        assert!((center.x() - 5.0).abs() < 1e-9);
        assert!((center.y() - 8.660254 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn default_triangle_is_degenerate_without_failing() {
        let triangle = Triangle::default();
        assert_eq!(triangle.normal(), Point3::ORIGIN);
        assert_eq!(triangle.area(), 0.0);
        assert_eq!(triangle.center(), Point3::ORIGIN);
    }

    #[test]
    fn reversed_winding_flips_normal() {
        let triangle = equilateral();
        let [a, b, c] = triangle.vertices;
        let reversed = Triangle::new(a, c, b);
        assert_eq!(reversed.normal(), triangle.normal() * -1.0);
        assert!((reversed.area() - triangle.area()).abs() < 1e-12);
    }

    #[test]
    fn bounds_start_empty_and_absorb_points() {
        let mut bounds = Bounds3D::empty();
        assert!(bounds.is_empty());
        assert!(bounds.size().x() < 0.0);

        bounds.include_point(Point3::new(1.0, -2.0, 3.0));
        assert!(!bounds.is_empty());
        assert_eq!(bounds.volume(), 0.0);

        bounds.include_point(Point3::new(-1.0, 2.0, 5.0));
        assert_eq!(bounds.min(), Point3::new(-1.0, -2.0, 3.0));
        assert_eq!(bounds.max(), Point3::new(1.0, 2.0, 5.0));
        assert_eq!(bounds.size(), Point3::new(2.0, 4.0, 2.0));
        assert!((bounds.volume() - 16.0).abs() < 1e-12);
        assert_eq!(bounds.center(), Point3::new(0.0, 0.0, 4.0));
    }

    #[test]
    fn mesh_aggregates_bounds_and_area() {
        let mut mesh = Mesh::new();
        assert!(mesh.is_empty());
        assert!(mesh.bounds().is_empty());
        assert_eq!(mesh.total_surface_area(), 0.0);

        mesh.push(equilateral());
        mesh.push(Triangle::new(
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ));
        assert_eq!(mesh.len(), 2);

        let bounds = mesh.bounds();
        assert_eq!(bounds.min(), Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bounds.max(), Point3::new(10.0, 8.660254, 1.0));
        let expected = equilateral().area() + 0.5;
        assert!((mesh.total_surface_area() - expected).abs() < 1e-9);
    }

    #[test]
    fn point_serializes_as_named_axes() {
        let json = serde_json::to_value(Point3::new(1.0, 2.5, -3.0)).expect("serialize point");
        assert_eq!(json, serde_json::json!({ "x": 1.0, "y": 2.5, "z": -3.0 }));
    }
}
