use float_cmp::ApproxEq;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, PartialOrd, Serialize, Default)]
pub struct Coordinate2D {
    pub x: f64,
    pub y: f64,
}

impl Coordinate2D {
    /// Creates a new coordinate
    ///
    /// # Examples
    ///
    /// ```
    /// use rasterlite_datatypes::primitives::Coordinate2D;
    ///
    /// let c = Coordinate2D::new(1.0, 0.0);
    ///
    /// assert_eq!(c.x, 1.0);
    /// assert_eq!(c.y, 0.0);
    /// ```
    ///
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn min_elements(&self, other: Self) -> Self {
        Coordinate2D {
            x: self.x.min(other.x),
            y: self.y.min(other.y),
        }
    }

    #[must_use]
    pub fn max_elements(&self, other: Self) -> Self {
        Coordinate2D {
            x: self.x.max(other.x),
            y: self.y.max(other.y),
        }
    }
}

impl fmt::Display for Coordinate2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(f64, f64)> for Coordinate2D {
    /// # Examples
    ///
    /// ```
    /// use rasterlite_datatypes::primitives::Coordinate2D;
    ///
    /// let c: Coordinate2D = (5.1, -3.0).into();
    ///
    /// assert_eq!(c.x, 5.1);
    /// assert_eq!(c.y, -3.0);
    /// ```
    ///
    fn from(tuple: (f64, f64)) -> Self {
        let (x, y) = tuple;
        Self { x, y }
    }
}

impl From<Coordinate2D> for (f64, f64) {
    fn from(coordinate: Coordinate2D) -> (f64, f64) {
        (coordinate.x, coordinate.y)
    }
}

impl From<Coordinate2D> for geo::Coord<f64> {
    fn from(coordinate: Coordinate2D) -> geo::Coord<f64> {
        geo::Coord::from((coordinate.x, coordinate.y))
    }
}

impl From<geo::Coord<f64>> for Coordinate2D {
    fn from(coordinate: geo::Coord<f64>) -> Coordinate2D {
        Coordinate2D {
            x: coordinate.x,
            y: coordinate.y,
        }
    }
}

impl ApproxEq for Coordinate2D {
    type Margin = float_cmp::F64Margin;

    fn approx_eq<M>(self, other: Self, margin: M) -> bool
    where
        M: Into<Self::Margin>,
    {
        let m = margin.into();
        self.x.approx_eq(other.x, m) && self.y.approx_eq(other.y, m)
    }
}
