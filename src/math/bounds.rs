use glam::{Mat4, Vec3};

/// Finite stand-in for infinity used to seed an empty box, so that `center()`
/// of an empty box stays finite.
pub const SENTINEL: f32 = 1.0e30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    pub fn new(point1: Vec3, point2: Vec3) -> AABB {
        let min = point1.min(point2);
        let max = point1.max(point2);
        AABB { min, max }
    }

    /// The degenerate box every accumulation starts from: min at +SENTINEL, max at -SENTINEL.
    pub fn empty() -> AABB {
        AABB {
            min: Vec3::splat(SENTINEL),
            max: Vec3::splat(-SENTINEL),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> AABB {
        points.into_iter().fold(AABB::empty(), |mut aabb, point| {
            aabb.extend(point);
            aabb
        })
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// True when nothing was accumulated, i.e. the size is inverted or absurdly large.
    pub fn is_empty(&self, threshold: f32) -> bool {
        let size = self.size();
        size.min_element() < 0.0 || size.max_element() > threshold || !size.is_finite()
    }

    pub fn corners(&self) -> [Vec3; 8] {
        [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    /// Transforms only the `min` and `max` corners.
    ///
    /// This under-estimates the bounds of rotated boxes; use
    /// [`AABB::transformed_corners`] when the exact envelope is needed.
    pub fn transformed_extremes(&self, transform: &Mat4) -> [Vec3; 2] {
        [
            transform.transform_point3(self.min),
            transform.transform_point3(self.max),
        ]
    }

    pub fn transformed_corners(&self, transform: &Mat4) -> [Vec3; 8] {
        self.corners()
            .map(|corner| transform.transform_point3(corner))
    }
}
