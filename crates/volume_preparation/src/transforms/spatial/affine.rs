/// Affine map on centred voxel coordinates: `p' = M * p + t`.
///
/// Coordinates are measured from the volume centre `(n - 1) / 2` along each
/// spatial axis, so rotations and scalings act about the centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine3 {
    /// Row-major 3x3 linear part.
    pub matrix: [[f64; 3]; 3],
    pub translation: [f64; 3],
}

// Rotations by multiples of 90 degrees leave cos/sin residues around 1e-17.
const SNAP_EPS: f64 = 1e-12;

fn snap(v: f64) -> f64 {
    if v.abs() < SNAP_EPS {
        0.0
    } else {
        v
    }
}

impl Affine3 {
    #[inline]
    pub fn new(matrix: [[f64; 3]; 3], translation: [f64; 3]) -> Self {
        Self {
            matrix,
            translation,
        }
    }

    #[inline]
    pub fn identity() -> Self {
        Self::new([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]], [0.0; 3])
    }

    /// Rotation by `radians` in the plane of spatial axes `a` and `b`,
    /// turning axis `a` towards axis `b`.
    ///
    /// Callers guarantee `a != b` and both `< 3`.
    pub fn rotation(axes: (usize, usize), radians: f64) -> Self {
        let (a, b) = axes;
        let (sin, cos) = radians.sin_cos();
        let (sin, cos) = (snap(sin), snap(cos));
        let mut out = Self::identity();
        out.matrix[a][a] = cos;
        out.matrix[a][b] = -sin;
        out.matrix[b][a] = sin;
        out.matrix[b][b] = cos;
        out
    }

    /// Rotation about spatial axis 0, 1 or 2.
    pub fn rotation_about(axis: usize, radians: f64) -> Self {
        let plane = match axis {
            0 => (1, 2),
            1 => (2, 0),
            _ => (0, 1),
        };
        Self::rotation(plane, radians)
    }

    pub fn scaling(factors: [f64; 3]) -> Self {
        let mut out = Self::identity();
        for (i, f) in factors.iter().enumerate() {
            out.matrix[i][i] = *f;
        }
        out
    }

    pub fn translation(offset: [f64; 3]) -> Self {
        Self::new(Self::identity().matrix, offset)
    }

    /// Transform a point: M * p + t
    #[inline]
    pub fn apply_point(&self, p: [f64; 3]) -> [f64; 3] {
        let m = &self.matrix;
        let t = &self.translation;
        [
            m[0][0] * p[0] + m[0][1] * p[1] + m[0][2] * p[2] + t[0],
            m[1][0] * p[0] + m[1][1] * p[1] + m[1][2] * p[2] + t[1],
            m[2][0] * p[0] + m[2][1] * p[1] + m[2][2] * p[2] + t[2],
        ]
    }

    /// Compose: `other` applied first, then `self`.
    /// Result: (M1 * M2, M1 * t2 + t1)
    pub fn compose(&self, other: &Affine3) -> Affine3 {
        let mut matrix = [[0.0; 3]; 3];
        for (r, row) in matrix.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.matrix[r][k] * other.matrix[k][c]).sum();
            }
        }
        let moved = self.apply_point(other.translation);
        Affine3::new(matrix, moved)
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.matrix;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Inverse map, or `None` when the linear part is singular.
    pub fn inverse(&self) -> Option<Affine3> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < 1e-12 {
            return None;
        }
        let m = &self.matrix;
        // Adjugate over determinant
        let inv = [
            [
                (m[1][1] * m[2][2] - m[1][2] * m[2][1]) / det,
                (m[0][2] * m[2][1] - m[0][1] * m[2][2]) / det,
                (m[0][1] * m[1][2] - m[0][2] * m[1][1]) / det,
            ],
            [
                (m[1][2] * m[2][0] - m[1][0] * m[2][2]) / det,
                (m[0][0] * m[2][2] - m[0][2] * m[2][0]) / det,
                (m[0][2] * m[1][0] - m[0][0] * m[1][2]) / det,
            ],
            [
                (m[1][0] * m[2][1] - m[1][1] * m[2][0]) / det,
                (m[0][1] * m[2][0] - m[0][0] * m[2][1]) / det,
                (m[0][0] * m[1][1] - m[0][1] * m[1][0]) / det,
            ],
        ];
        let linear = Affine3::new(inv, [0.0; 3]);
        let t = linear.apply_point(self.translation);
        Some(Affine3::new(inv, [-t[0], -t[1], -t[2]]))
    }
}

impl Default for Affine3 {
    fn default() -> Self {
        Self::identity()
    }
}
