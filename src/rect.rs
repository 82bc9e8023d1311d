/// Axis-aligned rectangle in level space. The y axis grows downward, so
/// `bottom()` is the numerically largest edge and gravity is positive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.w / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.h / 2.0
    }

    /// Strict overlap: rectangles that merely share an edge do not collide.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }
}

pub fn lerp(start: f32, end: f32, t: f32) -> f32 {
    start * (1.0 - t) + end * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_requires_strict_intersection() {
        let a = Rect::new(0.0, 0.0, 40.0, 40.0);
        let touching = Rect::new(40.0, 0.0, 40.0, 40.0);
        let inside = Rect::new(39.0, 39.0, 10.0, 10.0);
        assert!(!a.overlaps(&touching));
        assert!(!touching.overlaps(&a));
        assert!(a.overlaps(&inside));
        assert!(inside.overlaps(&a));
    }

    #[test]
    fn overlap_respects_vertical_separation() {
        let a = Rect::new(0.0, 0.0, 40.0, 40.0);
        let below = Rect::new(0.0, 40.0, 40.0, 40.0);
        assert!(!a.overlaps(&below));
    }

    #[test]
    fn lerp_interpolates_endpoints() {
        assert_eq!(lerp(10.0, 20.0, 0.0), 10.0);
        assert_eq!(lerp(10.0, 20.0, 1.0), 20.0);
        assert!((lerp(10.0, 20.0, 0.5) - 15.0).abs() < f32::EPSILON);
    }
}
