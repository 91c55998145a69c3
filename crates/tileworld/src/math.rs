#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box in world pixels, inclusive of `min`, exclusive of `max`
/// for overlap purposes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn from_center_half(center: Vec2, half: Vec2) -> Self {
        Self {
            min: Vec2::new(center.x - half.x, center.y - half.y),
            max: Vec2::new(center.x + half.x, center.y + half.y),
        }
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: Vec2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Vec2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aabb_overlap_is_exclusive_at_shared_edge() {
        let a = Aabb::from_center_half(Vec2::new(0.0, 0.0), Vec2::new(8.0, 8.0));
        let b = Aabb::from_center_half(Vec2::new(16.0, 0.0), Vec2::new(8.0, 8.0));
        assert!(!a.overlaps(&b));
        let c = Aabb::from_center_half(Vec2::new(15.0, 0.0), Vec2::new(8.0, 8.0));
        assert!(a.overlaps(&c));
    }

    #[test]
    fn union_covers_both_boxes() {
        let a = Aabb::from_center_half(Vec2::new(0.0, 0.0), Vec2::new(4.0, 4.0));
        let b = Aabb::from_center_half(Vec2::new(20.0, -10.0), Vec2::new(4.0, 4.0));
        let u = a.union(&b);
        assert_eq!(u.min, Vec2::new(-4.0, -14.0));
        assert_eq!(u.max, Vec2::new(24.0, 4.0));
    }
}
