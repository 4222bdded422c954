//! Fixed-point coordinates and bounding boxes
//!
//! Coordinates are stored as integer multiples of 1e-7 degrees, so repeated
//! conversions and comparisons never drift. The maximum `i32` value is used as
//! a sentinel for "no coordinate".

use crate::{DataError, Result};
use geo::{Coord, Rect};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Scale factor between degrees and the stored integer representation
const COORDINATE_SCALE: f64 = 10_000_000.0;

/// Sentinel value marking an invalid coordinate component
const INVALID: i32 = i32::MAX;

/// A latitude/longitude pair stored as 1e-7 degrees
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coordinate {
    pub latitude: i32,
    pub longitude: i32,
}

impl Default for Coordinate {
    fn default() -> Self {
        Self::INVALID
    }
}

impl Coordinate {
    /// The invalid coordinate, used as "not set"
    pub const INVALID: Coordinate = Coordinate {
        latitude: INVALID,
        longitude: INVALID,
    };

    /// Create a coordinate from degrees without range checking
    ///
    /// Values of about ±214.75 degrees or more saturate to the invalid
    /// sentinel. Use [`Coordinate::try_new`] for untrusted input.
    #[inline]
    pub fn new(lat: f64, lon: f64) -> Self {
        debug_assert!(
            !(lat.abs() * COORDINATE_SCALE >= INVALID as f64
                || lon.abs() * COORDINATE_SCALE >= INVALID as f64),
            "coordinate ({lat}, {lon}) out of fixed-point range"
        );
        Self {
            latitude: (lat * COORDINATE_SCALE).round() as i32,
            longitude: (lon * COORDINATE_SCALE).round() as i32,
        }
    }

    /// Create a coordinate from degrees, rejecting out of range or non-finite input
    pub fn try_new(lat: f64, lon: f64) -> Result<Self> {
        // Range checks are false for NaN, so this also rejects non-finite input
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(DataError::InvalidCoordinate { lat, lon });
        }
        Ok(Self::new(lat, lon))
    }

    /// Create a coordinate from the raw fixed-point representation
    #[inline]
    pub const fn from_raw(latitude: i32, longitude: i32) -> Self {
        Self { latitude, longitude }
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.latitude != INVALID && self.longitude != INVALID
    }

    /// Latitude in degrees
    #[inline]
    pub fn lat_f(&self) -> f64 {
        self.latitude as f64 / COORDINATE_SCALE
    }

    /// Longitude in degrees
    #[inline]
    pub fn lon_f(&self) -> f64 {
        self.longitude as f64 / COORDINATE_SCALE
    }

    /// Convert to a `geo` coordinate (x = longitude, y = latitude, in degrees)
    ///
    /// Returns `None` for the invalid coordinate.
    pub fn to_geo(&self) -> Option<Coord<f64>> {
        self.is_valid().then(|| Coord {
            x: self.lon_f(),
            y: self.lat_f(),
        })
    }
}

/// An axis-aligned box spanned by two coordinates
///
/// The default box is invalid and acts as the identity for [`BoundingBox::unite`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundingBox {
    pub min: Coordinate,
    pub max: Coordinate,
}

impl BoundingBox {
    #[inline]
    pub const fn new(min: Coordinate, max: Coordinate) -> Self {
        Self { min, max }
    }

    /// A degenerate box covering a single coordinate
    #[inline]
    pub const fn from_coordinate(coord: Coordinate) -> Self {
        Self {
            min: coord,
            max: coord,
        }
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.min.is_valid() && self.max.is_valid()
    }

    /// Midpoint of the box, or the invalid coordinate for an invalid box
    pub fn center(&self) -> Coordinate {
        if !self.is_valid() {
            return Coordinate::INVALID;
        }
        // i64 to avoid overflow near the antimeridian
        Coordinate::from_raw(
            ((self.min.latitude as i64 + self.max.latitude as i64) / 2) as i32,
            ((self.min.longitude as i64 + self.max.longitude as i64) / 2) as i32,
        )
    }

    /// Height in degrees
    pub fn height(&self) -> f64 {
        if !self.is_valid() {
            return 0.0;
        }
        self.max.lat_f() - self.min.lat_f()
    }

    /// Width in degrees
    pub fn width(&self) -> f64 {
        if !self.is_valid() {
            return 0.0;
        }
        self.max.lon_f() - self.min.lon_f()
    }

    pub fn contains(&self, coord: Coordinate) -> bool {
        self.is_valid()
            && coord.is_valid()
            && (self.min.latitude..=self.max.latitude).contains(&coord.latitude)
            && (self.min.longitude..=self.max.longitude).contains(&coord.longitude)
    }

    /// Smallest box containing both boxes; an invalid operand is ignored
    pub fn unite(self, other: BoundingBox) -> BoundingBox {
        if !self.is_valid() {
            return other;
        }
        if !other.is_valid() {
            return self;
        }
        BoundingBox {
            min: Coordinate::from_raw(
                self.min.latitude.min(other.min.latitude),
                self.min.longitude.min(other.min.longitude),
            ),
            max: Coordinate::from_raw(
                self.max.latitude.max(other.max.latitude),
                self.max.longitude.max(other.max.longitude),
            ),
        }
    }

    /// Overlapping part of both boxes
    ///
    /// Invalid if either operand is invalid or the boxes are disjoint.
    pub fn intersection(self, other: BoundingBox) -> BoundingBox {
        if !self.is_valid() || !other.is_valid() {
            return BoundingBox::default();
        }
        let min = Coordinate::from_raw(
            self.min.latitude.max(other.min.latitude),
            self.min.longitude.max(other.min.longitude),
        );
        let max = Coordinate::from_raw(
            self.max.latitude.min(other.max.latitude),
            self.max.longitude.min(other.max.longitude),
        );
        if min.latitude > max.latitude || min.longitude > max.longitude {
            return BoundingBox::default();
        }
        BoundingBox { min, max }
    }

    /// Whether the boxes share at least one coordinate (edges included)
    #[inline]
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.intersection(*other).is_valid()
    }

    /// Convert to a `geo` rectangle in degrees (x = longitude)
    pub fn to_rect(&self) -> Option<Rect<f64>> {
        Some(Rect::new(self.min.to_geo()?, self.max.to_geo()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> BoundingBox {
        BoundingBox::new(
            Coordinate::new(min_lat, min_lon),
            Coordinate::new(max_lat, max_lon),
        )
    }

    #[test]
    fn test_default_coordinate_is_invalid() {
        assert!(!Coordinate::default().is_valid());
        assert!(Coordinate::new(52.5, 13.4).is_valid());
    }

    #[test]
    fn test_fixed_point_precision() {
        let coord = Coordinate::new(52.5251, 13.3694);
        assert_eq!(coord.latitude, 525_251_000);
        assert_eq!(coord.longitude, 133_694_000);
        assert!((coord.lat_f() - 52.5251).abs() < 1e-9);
    }

    #[test]
    fn test_try_new_rejects_out_of_range() {
        assert!(Coordinate::try_new(91.0, 0.0).is_err());
        assert!(Coordinate::try_new(0.0, f64::NAN).is_err());
        // Would saturate to the invalid sentinel through `new`
        assert!(Coordinate::try_new(0.0, 214.75).is_err());
        assert!(Coordinate::try_new(-214.75, 0.0).is_err());
        assert!(Coordinate::try_new(-33.9, 151.2).is_ok());
    }

    #[test]
    fn test_unite_with_invalid_is_identity() {
        let a = bbox(1.0, 1.0, 2.0, 2.0);
        assert_eq!(a.unite(BoundingBox::default()), a);
        assert_eq!(BoundingBox::default().unite(a), a);

        let b = bbox(0.0, 1.5, 1.5, 3.0);
        let u = a.unite(b);
        assert_eq!(u, bbox(0.0, 1.0, 2.0, 3.0));
    }

    #[test]
    fn test_intersection() {
        let a = bbox(0.0, 0.0, 2.0, 2.0);
        let b = bbox(1.0, 1.0, 3.0, 3.0);
        assert_eq!(a.intersection(b), bbox(1.0, 1.0, 2.0, 2.0));
        assert!(a.intersects(&b));

        let far = bbox(10.0, 10.0, 11.0, 11.0);
        assert!(!a.intersection(far).is_valid());
        assert!(!a.intersects(&far));
        assert!(!a.intersects(&BoundingBox::default()));
    }

    #[test]
    fn test_center_and_contains() {
        let a = bbox(0.0, 0.0, 2.0, 4.0);
        assert_eq!(a.center(), Coordinate::new(1.0, 2.0));
        assert!(a.contains(Coordinate::new(1.0, 3.0)));
        assert!(!a.contains(Coordinate::new(3.0, 3.0)));
        assert!(!BoundingBox::default().center().is_valid());
    }

    #[test]
    fn test_to_rect() {
        let rect = bbox(1.0, 2.0, 3.0, 5.0).to_rect().unwrap();
        assert!((rect.width() - 3.0).abs() < 1e-9);
        assert!((rect.height() - 2.0).abs() < 1e-9);
        assert!(BoundingBox::default().to_rect().is_none());
    }
}
