use nalgebra::{Matrix3, Point3, Rotation3, Unit, Vector3};

/// A rigid-body transform mapping one coordinate frame onto another.
#[derive(Debug, Clone, Copy)]
pub struct RigidTransform {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
}

impl RigidTransform {
    pub fn identity() -> Self {
        Self {
            rotation: Rotation3::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        self.rotation * point + self.translation
    }
}

/// Fits the rigid transform that best maps `from_points` onto `to_points`.
///
/// The two slices must be equally long and non-empty. With three or more
/// pairs the rotation is the least-squares (Kabsch/SVD) solution; with two
/// pairs the rotation takes the single pair direction onto its image; with
/// one pair the result is a pure translation. Bond lengths are preserved
/// exactly in all cases.
pub fn fit_alignment(from_points: &[Point3<f64>], to_points: &[Point3<f64>]) -> RigidTransform {
    debug_assert_eq!(from_points.len(), to_points.len());
    debug_assert!(!from_points.is_empty());

    match from_points.len() {
        1 => RigidTransform {
            rotation: Rotation3::identity(),
            translation: to_points[0] - from_points[0],
        },
        2 => {
            let from_dir = from_points[1] - from_points[0];
            let to_dir = to_points[1] - to_points[0];
            let rotation = rotation_between(&from_dir, &to_dir);
            RigidTransform {
                rotation,
                translation: to_points[0].coords - rotation * from_points[0].coords,
            }
        }
        _ => kabsch(from_points, to_points),
    }
}

/// Rotation taking `from` onto `to`, robust against antiparallel vectors.
fn rotation_between(from: &Vector3<f64>, to: &Vector3<f64>) -> Rotation3<f64> {
    match Rotation3::rotation_between(from, to) {
        Some(rotation) => rotation,
        None => {
            // Antiparallel case: rotate half a turn about any perpendicular axis.
            let axis = perpendicular_to(from);
            Rotation3::from_axis_angle(&Unit::new_normalize(axis), std::f64::consts::PI)
        }
    }
}

fn perpendicular_to(v: &Vector3<f64>) -> Vector3<f64> {
    let trial = if v.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    v.cross(&trial)
}

fn kabsch(from_points: &[Point3<f64>], to_points: &[Point3<f64>]) -> RigidTransform {
    let from_centroid_sum: Vector3<f64> = from_points.iter().map(|p| p.coords).sum();
    let from_centroid = Point3::from(from_centroid_sum / from_points.len() as f64);
    let to_centroid_sum: Vector3<f64> = to_points.iter().map(|p| p.coords).sum();
    let to_centroid = Point3::from(to_centroid_sum / to_points.len() as f64);

    let centered_from: Vec<_> = from_points.iter().map(|p| p - from_centroid).collect();
    let centered_to: Vec<_> = to_points.iter().map(|p| p - to_centroid).collect();

    let h = centered_from
        .iter()
        .zip(centered_to.iter())
        .fold(Matrix3::zeros(), |acc, (f, t)| acc + t * f.transpose());

    let svd = h.svd(true, true);
    let u = svd.u.unwrap();
    let v_t = svd.v_t.unwrap();

    let d = (u * v_t.transpose()).determinant();
    let mut correction = Matrix3::identity();
    if d < 0.0 {
        correction[(2, 2)] = -1.0;
    }

    let rotation_matrix = u * correction * v_t;
    let rotation = Rotation3::from_matrix(&rotation_matrix);
    let translation = to_centroid.coords - rotation * from_centroid.coords;

    RigidTransform {
        rotation,
        translation,
    }
}
