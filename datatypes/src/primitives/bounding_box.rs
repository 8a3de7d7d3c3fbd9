use super::Coordinate2D;
use crate::error;
use crate::util::Result;
use serde::{Deserialize, Serialize};
use snafu::ensure;

#[derive(Copy, Clone, Serialize, Deserialize, PartialEq, Debug)]
/// The bounding box of a geometry.
/// Note: may degenerate to a point!
pub struct BoundingBox2D {
    lower_left_coordinate: Coordinate2D,
    upper_right_coordinate: Coordinate2D,
}

impl BoundingBox2D {
    /// Creates a new bounding box
    ///
    /// # Examples
    ///
    /// ```
    /// use rasterlite_datatypes::primitives::{Coordinate2D, BoundingBox2D};
    ///
    /// let ll = Coordinate2D::new(1.0, 1.0);
    /// let ur = Coordinate2D::new(2.0, 2.0);
    /// let bbox = BoundingBox2D::new(ll, ur).unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// This constructor fails if the coordinate's values are not in order
    ///
    pub fn new(
        lower_left_coordinate: Coordinate2D,
        upper_right_coordinate: Coordinate2D,
    ) -> Result<Self> {
        ensure!(
            lower_left_coordinate.x <= upper_right_coordinate.x
                && lower_left_coordinate.y <= upper_right_coordinate.y,
            error::InvalidBoundingBox {
                lower_left_coordinate,
                upper_right_coordinate
            }
        );
        Ok(Self {
            lower_left_coordinate,
            upper_right_coordinate,
        })
    }

    pub fn new_unchecked(
        lower_left_coordinate: Coordinate2D,
        upper_right_coordinate: Coordinate2D,
    ) -> Self {
        Self {
            lower_left_coordinate,
            upper_right_coordinate,
        }
    }

    /// Creates a bounding box from two arbitrary corners, sorting their components.
    /// Raster footprints are computed from a geotransform whose y pixel size is usually negative,
    /// so the corner that starts a block is the upper one.
    ///
    /// # Examples
    ///
    /// ```
    /// use rasterlite_datatypes::primitives::{Coordinate2D, BoundingBox2D};
    ///
    /// let bbox = BoundingBox2D::from_corners((1.0, 2.0).into(), (2.0, 1.0).into());
    ///
    /// assert_eq!(bbox.lower_left(), Coordinate2D::new(1.0, 1.0));
    /// assert_eq!(bbox.upper_right(), Coordinate2D::new(2.0, 2.0));
    /// ```
    ///
    pub fn from_corners(a: Coordinate2D, b: Coordinate2D) -> Self {
        Self::new_unchecked(a.min_elements(b), a.max_elements(b))
    }

    /// Returns the `Coordinate2D` representing the lower left edge of the bounding box
    pub fn lower_left(&self) -> Coordinate2D {
        self.lower_left_coordinate
    }

    /// Returns the `Coordinate2D` representing the upper right edge of the bounding box
    pub fn upper_right(&self) -> Coordinate2D {
        self.upper_right_coordinate
    }

    pub fn size_x(&self) -> f64 {
        self.upper_right_coordinate.x - self.lower_left_coordinate.x
    }

    pub fn size_y(&self) -> f64 {
        self.upper_right_coordinate.y - self.lower_left_coordinate.y
    }

    pub fn area(&self) -> f64 {
        self.size_x() * self.size_y()
    }

    /// Returns `Some(intersection)` with `other_bbox` or `None` if they do not intersect.
    /// Boxes that only share an edge intersect in a degenerate box of zero area.
    ///
    /// # Examples
    ///
    /// ```
    /// use rasterlite_datatypes::primitives::BoundingBox2D;
    ///
    /// let bbox = BoundingBox2D::new((0.0, 0.0).into(), (10.0, 10.0).into()).unwrap();
    /// let bbox2 = BoundingBox2D::new((5.0, 5.0).into(), (15.0, 15.0).into()).unwrap();
    ///
    /// let intersection = BoundingBox2D::new((5.0, 5.0).into(), (10.0, 10.0).into()).unwrap();
    ///
    /// assert_eq!(bbox.intersection(&bbox2), Some(intersection));
    /// ```
    ///
    pub fn intersection(&self, other_bbox: &Self) -> Option<Self> {
        let lower_left = self
            .lower_left_coordinate
            .max_elements(other_bbox.lower_left_coordinate);
        let upper_right = self
            .upper_right_coordinate
            .min_elements(other_bbox.upper_right_coordinate);

        if lower_left.x <= upper_right.x && lower_left.y <= upper_right.y {
            Some(BoundingBox2D::new_unchecked(lower_left, upper_right))
        } else {
            None
        }
    }

    pub fn extend_with_bbox(&mut self, other_bbox: &Self) {
        self.lower_left_coordinate = self
            .lower_left_coordinate
            .min_elements(other_bbox.lower_left_coordinate);
        self.upper_right_coordinate = self
            .upper_right_coordinate
            .max_elements(other_bbox.upper_right_coordinate);
    }

    /// The closed ring of the box as a polygon, starting and ending at the lower left corner
    /// and running up the left edge first.
    pub fn to_polygon(&self) -> geo::Polygon<f64> {
        let (min_x, min_y) = self.lower_left_coordinate.into();
        let (max_x, max_y) = self.upper_right_coordinate.into();

        geo::Polygon::new(
            geo::LineString::from(vec![
                (min_x, min_y),
                (min_x, max_y),
                (max_x, max_y),
                (max_x, min_y),
                (min_x, min_y),
            ]),
            vec![],
        )
    }
}

impl From<geo::Rect<f64>> for BoundingBox2D {
    fn from(rect: geo::Rect<f64>) -> BoundingBox2D {
        BoundingBox2D::new_unchecked(rect.min().into(), rect.max().into())
    }
}

impl From<BoundingBox2D> for geo::Rect<f64> {
    fn from(bbox: BoundingBox2D) -> geo::Rect<f64> {
        geo::Rect::new(
            geo::Coord::from(bbox.lower_left_coordinate),
            geo::Coord::from(bbox.upper_right_coordinate),
        )
    }
}
