// THEORY:
// The `EllipseFitter` is the numeric core of the decision stage. It turns the raw
// moments of the strongest candidate region into a measure of how round that region
// is, and, when the blob detector did not supply one, into a full ellipse.
//
// Key architectural principles & algorithm steps:
// 1.  **Re-centering**: Raw second-order moments depend on where the region sits in
//     the image. Subtracting the centroid terms yields the central moments M20, M02
//     and M11, which describe only spread and orientation.
// 2.  **Axis Proxies**: From the central moments two axis proxies are formed,
//     `a = sqrt(2(M20 + M02 + d))` and `b = sqrt(2(M20 + M02 - d))` with
//     `d = sqrt(M11² + (M20 - M02)²)`. Their ratio `b / a` is the shape ratio: 1.0 for
//     a perfectly round region, falling towards 0 as the region stretches.
// 3.  **Roundness Indicator**: `(M20·M02 - M11²) / m00⁴` is reported alongside. For
//     a filled disk it sits near 1/(16π²) ≈ 0.0063. It is informational only and never
//     gates a decision.
// 4.  **Ellipse Fallback**: If the detector left the ellipse out, one is derived from
//     the eigenvalues of the normalized covariance matrix. A filled ellipse with
//     semi-axis `s` has variance `s²/4` along that axis, so each full axis length
//     is `4·sqrt(λ)`.
// 5.  **Stateless Utility**: Every function here is pure. Empty or non-finite input
//     is rejected with a `FitError` before any division happens.

use crate::core_modules::blob::{Region, RegionMoments};
use crate::core_modules::error::FitError;
use crate::core_modules::geometry::Ellipse;

pub mod ellipse_fitter {
    use super::*;

    /// Second-order moments re-centered on the region centroid.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct CentralMoments {
        pub mu20: f64,
        pub mu02: f64,
        pub mu11: f64,
    }

    /// Everything the fitter derives from a region's moments.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct ShapeFit {
        pub central: CentralMoments,
        /// `(M20·M02 - M11²) / m00⁴`.
        pub roundness: f64,
        /// Major axis proxy `a`.
        pub major: f64,
        /// Minor axis proxy `b`.
        pub minor: f64,
        /// `b / a`, in `[0, 1]`.
        pub shape_ratio: f64,
    }

    /// Re-centers the second-order moments. Requires a non-empty, finite region.
    pub fn central_moments(m: &RegionMoments) -> Result<CentralMoments, FitError> {
        if !m.is_finite() {
            return Err(FitError::NonFiniteMoments);
        }
        if m.m00 <= 0.0 {
            return Err(FitError::EmptyRegion {
                area: m.m00,
                m00: m.m00,
            });
        }

        Ok(CentralMoments {
            mu11: m.m11 - (m.m10 * m.m01) / m.m00,
            mu02: m.m02 - (m.m01 * m.m01) / m.m00,
            mu20: m.m20 - (m.m10 * m.m10) / m.m00,
        })
    }

    /// Computes the axis proxies, shape ratio and roundness of a region.
    pub fn fit_shape(m: &RegionMoments) -> Result<ShapeFit, FitError> {
        let central = central_moments(m)?;
        let CentralMoments { mu20, mu02, mu11 } = central;

        let roundness = (mu20 * mu02 - mu11 * mu11) / m.m00.powi(4);

        let spread = mu20 + mu02;
        let d = (mu11 * mu11 + (mu20 - mu02) * (mu20 - mu02)).sqrt();
        let major = (2.0 * (spread + d)).sqrt();
        // Rounding can push the minor term a hair below zero for thin regions.
        let minor = (2.0 * (spread - d)).max(0.0).sqrt();

        if !major.is_finite() || !minor.is_finite() {
            return Err(FitError::DegenerateAxes { major, minor });
        }

        // A single point has no extent in any direction; treat it as round.
        let shape_ratio = if major > 0.0 {
            (minor / major).clamp(0.0, 1.0)
        } else {
            1.0
        };

        Ok(ShapeFit {
            central,
            roundness,
            major,
            minor,
            shape_ratio,
        })
    }

    /// Derives a pixel-space ellipse from the moments alone.
    pub fn ellipse_from_moments(m: &RegionMoments) -> Result<Ellipse, FitError> {
        let CentralMoments { mu20, mu02, mu11 } = central_moments(m)?;
        let (mu20, mu02, mu11) = (mu20 / m.m00, mu02 / m.m00, mu11 / m.m00);

        let half_trace = (mu20 + mu02) / 2.0;
        let root = (4.0 * mu11 * mu11 + (mu20 - mu02) * (mu20 - mu02)).sqrt() / 2.0;
        let lambda_major = half_trace + root;
        let lambda_minor = (half_trace - root).max(0.0);

        let width = 4.0 * lambda_major.sqrt();
        let height = 4.0 * lambda_minor.sqrt();
        if !width.is_finite() || width <= 0.0 {
            return Err(FitError::DegenerateAxes {
                major: width,
                minor: height,
            });
        }

        let angle = (0.5 * (2.0 * mu11).atan2(mu20 - mu02)).to_degrees();

        Ok(Ellipse::new(
            m.m10 / m.m00,
            m.m01 / m.m00,
            width,
            height,
            angle,
        ))
    }

    /// Fits the selected region: the detector's ellipse (or a moment-derived one)
    /// together with the moment-based shape metrics.
    pub fn fit_region(region: &Region) -> Result<(Ellipse, ShapeFit), FitError> {
        if region.area <= 0.0 || region.moments.m00 <= 0.0 {
            return Err(FitError::EmptyRegion {
                area: region.area,
                m00: region.moments.m00,
            });
        }

        let shape = fit_shape(&region.moments)?;
        let ellipse = match region.ellipse {
            Some(ellipse) => ellipse,
            None => ellipse_from_moments(&region.moments)?,
        };

        Ok((ellipse, shape))
    }
}
