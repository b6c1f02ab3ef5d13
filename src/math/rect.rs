use num_traits::{Bounded, Num};

use super::Vector2;

/// Axis-aligned rectangle in a y-down space: `top <= bottom`, `left <= right`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect<T> {
    pub top: T,
    pub bottom: T,
    pub left: T,
    pub right: T,
}

impl<T> Rect<T> {
    pub const fn new(top: T, bottom: T, left: T, right: T) -> Self {
        Self { top, bottom, left, right }
    }
}

impl<T: Copy + PartialOrd + Num> Rect<T> {
    /// Smallest rectangle containing every point.
    pub fn from_points(points: impl IntoIterator<Item = Vector2<T>>) -> Self
    where
        T: Bounded,
    {
        let mut rect = Self::new(T::max_value(), T::min_value(), T::max_value(), T::min_value());
        rect.include_all(points);
        rect
    }

    /// Grows the rectangle to contain `point`.
    pub fn include(&mut self, point: Vector2<T>) {
        if self.left > point.x {
            self.left = point.x;
        }
        if self.right < point.x {
            self.right = point.x;
        }
        if self.top > point.y {
            self.top = point.y;
        }
        if self.bottom < point.y {
            self.bottom = point.y;
        }
    }

    pub fn include_all(&mut self, points: impl IntoIterator<Item = Vector2<T>>) {
        for point in points {
            self.include(point);
        }
    }

    pub fn translate(&mut self, dx: T, dy: T) {
        self.top = self.top + dy;
        self.bottom = self.bottom + dy;
        self.left = self.left + dx;
        self.right = self.right + dx;
    }

    /// Inclusive on all four edges.
    pub fn contains(&self, point: Vector2<T>) -> bool {
        point.x >= self.left && point.x <= self.right && point.y <= self.bottom && point.y >= self.top
    }

    pub fn contains_rect(&self, rect: &Self) -> bool {
        self.contains(Vector2::new(rect.left, rect.top)) && self.contains(Vector2::new(rect.right, rect.bottom))
    }

    /// True when the interiors overlap; touching edges do not count.
    pub fn intersects(&self, rect: &Self) -> bool {
        self.left < rect.right && self.right > rect.left && self.top < rect.bottom && self.bottom > rect.top
    }

    /// True when the segment `begin..end` crosses the rectangle's outline.
    ///
    /// A segment lying entirely inside the rectangle touches no edge and
    /// reports false.
    pub fn line_intersects(&self, begin: Vector2<T>, end: Vector2<T>) -> bool {
        let begin_inside = self.contains(begin);
        let end_inside = self.contains(end);
        if begin_inside != end_inside {
            return true;
        }
        if begin_inside && end_inside {
            return false;
        }

        let zero = T::zero();
        let one = T::one();

        let top_left = Vector2::new(self.left, self.top);
        let top_right = Vector2::new(self.right, self.top);
        let bottom_left = Vector2::new(self.left, self.bottom);
        let bottom_right = Vector2::new(self.right, self.bottom);
        let edges = [
            (top_left, top_right),
            (top_right, bottom_right),
            (bottom_right, bottom_left),
            (bottom_left, top_left),
        ];

        let r = end - begin;
        for (start, stop) in edges {
            let to_edge = start - begin;
            let s = stop - start;

            let to_edge_x_r = to_edge.cross(r);
            let to_edge_x_s = to_edge.cross(s);
            let r_x_s = r.cross(s);

            if to_edge_x_r == zero {
                // collinear: overlapping when the edge start falls between the endpoints
                let straddles_x = (start.x < begin.x) != (start.x < end.x);
                let straddles_y = (start.y < begin.y) != (start.y < end.y);
                if straddles_x || straddles_y {
                    return true;
                }
            }

            if r_x_s == zero {
                continue;
            }

            let t = to_edge_x_s / r_x_s;
            let u = to_edge_x_r / r_x_s;
            if t >= zero && t <= one && u >= zero && u <= one {
                return true;
            }
        }

        false
    }

    pub fn width(&self) -> T {
        self.right - self.left
    }

    pub fn height(&self) -> T {
        self.bottom - self.top
    }

    pub fn center(&self) -> Vector2<T> {
        let two = T::one() + T::one();
        Vector2::new(
            self.left + (self.right - self.left) / two,
            self.top + (self.bottom - self.top) / two,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector2f;

    fn unit() -> Rect<f32> {
        Rect::new(0.0, 10.0, 0.0, 10.0)
    }

    #[test]
    fn from_points_bounds_everything() {
        let r = Rect::from_points([Vector2::new(3, -1), Vector2::new(-2, 4), Vector2::new(0, 0)]);
        assert_eq!(r, Rect::new(-1, 4, -2, 3));
        assert_eq!(r.width(), 5);
        assert_eq!(r.height(), 5);
    }

    #[test]
    fn containment_is_inclusive() {
        let r = unit();
        assert!(r.contains(Vector2f::new(0.0, 10.0)));
        assert!(!r.contains(Vector2f::new(-0.1, 5.0)));
        assert!(r.contains_rect(&Rect::new(2.0, 3.0, 2.0, 3.0)));
        assert!(!r.contains_rect(&Rect::new(2.0, 13.0, 2.0, 3.0)));
    }

    #[test]
    fn touching_rects_do_not_intersect() {
        let r = unit();
        assert!(r.intersects(&Rect::new(5.0, 15.0, 5.0, 15.0)));
        assert!(!r.intersects(&Rect::new(10.0, 20.0, 0.0, 10.0)));
    }

    #[test]
    fn translate_and_center() {
        let mut r = unit();
        r.translate(5.0, -5.0);
        assert_eq!(r, Rect::new(-5.0, 5.0, 5.0, 15.0));
        assert_eq!(r.center(), Vector2f::new(10.0, 0.0));
    }

    #[test]
    fn segment_crossing_the_outline() {
        let r = unit();
        // one end inside
        assert!(r.line_intersects(Vector2f::new(5.0, 5.0), Vector2f::new(20.0, 5.0)));
        // both ends inside
        assert!(!r.line_intersects(Vector2f::new(2.0, 2.0), Vector2f::new(8.0, 8.0)));
        // passes straight through
        assert!(r.line_intersects(Vector2f::new(-5.0, 5.0), Vector2f::new(15.0, 5.0)));
        // misses entirely
        assert!(!r.line_intersects(Vector2f::new(-5.0, -5.0), Vector2f::new(15.0, -1.0)));
    }
}
