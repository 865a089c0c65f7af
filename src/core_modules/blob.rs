// THEORY:
// The `blob` module defines the data handed to this stage by the upstream blob
// detector. A `Region` is a "dumb" data container describing one connected set of
// pixels in a single frame: its area, its raw geometric moments and, when the
// detector computed one, its bounding ellipse. A `BlobSet` is the ordered list of
// every candidate region found in one frame.
//
// Key architectural principles:
// 1.  **Snapshot Semantics**: A `BlobSet` describes exactly one frame. The decision
//     stage keeps only the most recent one; nothing here carries history.
// 2.  **Raw Moments Only**: Regions store the raw (non-central) moments up to second
//     order. Re-centering them is the fitter's job, so a region can be built cheaply
//     by any detector that can sum pixel coordinates.
// 3.  **Stable Ordering**: The order of regions is the detector's order. Selection
//     ties are broken by that order, so it is preserved exactly.

use crate::core_modules::geometry::Ellipse;
use serde::{Deserialize, Serialize};

/// Raw geometric moments `m_pq = Σ x^p · y^q` of a region, up to second order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RegionMoments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub m11: f64,
    pub m20: f64,
    pub m02: f64,
}

impl RegionMoments {
    /// Accumulates the raw moments of a set of unit-weight pixels.
    pub fn from_pixels<I>(pixels: I) -> Self
    where
        I: IntoIterator<Item = (u32, u32)>,
    {
        let mut moments = Self::default();
        for (x, y) in pixels {
            let (x, y) = (x as f64, y as f64);
            moments.m00 += 1.0;
            moments.m10 += x;
            moments.m01 += y;
            moments.m11 += x * y;
            moments.m20 += x * x;
            moments.m02 += y * y;
        }
        moments
    }

    /// The centroid `(m10/m00, m01/m00)`, or `None` for an empty region.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.m00 > 0.0 {
            Some((self.m10 / self.m00, self.m01 / self.m00))
        } else {
            None
        }
    }

    pub fn is_finite(&self) -> bool {
        [self.m00, self.m10, self.m01, self.m11, self.m20, self.m02]
            .iter()
            .all(|m| m.is_finite())
    }
}

/// A single candidate region reported by the blob detector for the current frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Pixel count. This is the ranking key used to pick the ball candidate.
    pub area: f64,
    /// Raw moments of the region's pixels.
    pub moments: RegionMoments,
    /// The bounding ellipse computed by the detector, if it provided one.
    pub ellipse: Option<Ellipse>,
}

impl Region {
    pub fn new(area: f64, moments: RegionMoments, ellipse: Option<Ellipse>) -> Self {
        Self { area, moments, ellipse }
    }

    /// Builds a region straight from its pixel coordinates. No detector ellipse is
    /// attached; the fitter derives one from the moments.
    pub fn from_pixels<I>(pixels: I) -> Self
    where
        I: IntoIterator<Item = (u32, u32)>,
    {
        let moments = RegionMoments::from_pixels(pixels);
        Self {
            area: moments.m00,
            moments,
            ellipse: None,
        }
    }

    /// A filled disk of `radius` around `(cx, cy)`, clipped at the image origin.
    pub fn disk(cx: u32, cy: u32, radius: u32) -> Self {
        let (cx, cy, r) = (cx as i64, cy as i64, radius as i64);
        let pixels = ((cy - r).max(0)..=cy + r).flat_map(move |y| {
            ((cx - r).max(0)..=cx + r)
                .filter(move |x| (x - cx).pow(2) + (y - cy).pow(2) <= r * r)
                .map(move |x| (x as u32, y as u32))
        });
        Self::from_pixels(pixels)
    }
}

/// Every candidate region detected in one frame, in detector order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlobSet {
    pub regions: Vec<Region>,
}

impl BlobSet {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Returns the index and region with the largest area among those with
    /// `area >= min_area`. Exact ties go to the region seen first; non-finite
    /// areas are never selected.
    pub fn largest(&self, min_area: f64) -> Option<(usize, &Region)> {
        let mut best: Option<(usize, &Region)> = None;
        for (i, region) in self.regions.iter().enumerate() {
            if !region.area.is_finite() || region.area < min_area {
                continue;
            }
            match best {
                // Strictly greater, so the earlier region keeps a tie.
                Some((_, current)) if region.area <= current.area => {}
                _ => best = Some((i, region)),
            }
        }
        best
    }
}

impl From<Vec<Region>> for BlobSet {
    fn from(regions: Vec<Region>) -> Self {
        Self::new(regions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(area: f64) -> Region {
        Region::new(
            area,
            RegionMoments {
                m00: area,
                ..Default::default()
            },
            None,
        )
    }

    #[test]
    fn from_pixels_accumulates_raw_moments() {
        let m = RegionMoments::from_pixels([(1, 2), (3, 4)]);
        assert_eq!(m.m00, 2.0);
        assert_eq!(m.m10, 4.0);
        assert_eq!(m.m01, 6.0);
        assert_eq!(m.m11, 1.0 * 2.0 + 3.0 * 4.0);
        assert_eq!(m.m20, 1.0 + 9.0);
        assert_eq!(m.m02, 4.0 + 16.0);
        assert_eq!(m.centroid(), Some((2.0, 3.0)));
    }

    #[test]
    fn disk_is_centered_and_clipped() {
        let disk = Region::disk(10, 10, 2);
        // Rows of 1, 3, 5, 3, 1 pixels.
        assert_eq!(disk.area, 13.0);
        assert_eq!(disk.moments.centroid(), Some((10.0, 10.0)));

        let clipped = Region::disk(0, 0, 2);
        assert_eq!(clipped.area, 6.0);
        assert!(clipped.ellipse.is_none());
    }

    #[test]
    fn empty_region_has_no_centroid() {
        assert_eq!(RegionMoments::default().centroid(), None);
    }

    #[test]
    fn largest_picks_maximum_area() {
        let set = BlobSet::new(vec![region(10.0), region(50.0), region(20.0)]);
        let (index, best) = set.largest(0.0).expect("non-empty set");
        assert_eq!(index, 1);
        assert_eq!(best.area, 50.0);
    }

    #[test]
    fn largest_keeps_first_on_tie() {
        let set = BlobSet::new(vec![region(5.0), region(30.0), region(30.0)]);
        assert_eq!(set.largest(0.0).map(|(i, _)| i), Some(1));
    }

    #[test]
    fn largest_respects_min_area() {
        let set = BlobSet::new(vec![region(5.0), region(8.0)]);
        assert!(set.largest(10.0).is_none());
        assert_eq!(set.largest(6.0).map(|(i, _)| i), Some(1));
    }

    #[test]
    fn largest_of_empty_set_is_none() {
        assert!(BlobSet::default().largest(0.0).is_none());
    }
}
