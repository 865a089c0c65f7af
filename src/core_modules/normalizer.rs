// THEORY:
// The `normalizer` converts a pixel-space ellipse into a camera-independent position.
// Coordinates are re-centered on the middle of the frame and divided by the larger
// frame dimension, so a ball anywhere inside the frame lands in [-1, 1] regardless of
// the camera's resolution or aspect ratio. A ball whose center is outside the frame
// simply produces a value outside that range; that is valid output, not an error.

use crate::core_modules::camera_info::CameraInfo;
use crate::core_modules::error::NormalizeError;
use crate::core_modules::geometry::{Ellipse, ImagePosition};

pub mod normalizer {
    use super::*;

    /// Builds `[x, y, size_ratio, shape_ratio]` for `ellipse` within `camera`.
    pub fn normalize(
        ellipse: &Ellipse,
        camera: &CameraInfo,
        shape_ratio: f64,
    ) -> Result<ImagePosition, NormalizeError> {
        let max_pixels = camera.max_pixels();
        if max_pixels == 0 {
            return Err(NormalizeError::ZeroSizeFrame {
                width: camera.width,
                height: camera.height,
            });
        }
        if !ellipse.is_valid() {
            return Err(NormalizeError::InvalidEllipse(*ellipse));
        }

        let max_pixels = max_pixels as f64;
        let (center_x, center_y) = camera.center();

        Ok(ImagePosition::new(
            (ellipse.cx - center_x) / max_pixels,
            (ellipse.cy - center_y) / max_pixels,
            ellipse.major_axis() / max_pixels,
            shape_ratio.max(0.0),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::normalizer::*;
    use super::*;
    use proptest::prelude::*;

    fn ball_at(cx: f64, cy: f64) -> Ellipse {
        Ellipse::new(cx, cy, 20.0, 16.0, 0.0)
    }

    #[test]
    fn frame_center_maps_to_origin() {
        let camera = CameraInfo::new(320, 240);
        let p = normalize(&ball_at(160.0, 120.0), &camera, 1.0).unwrap();
        assert_eq!((p.x(), p.y()), (0.0, 0.0));
        assert_eq!(p.size_ratio(), 20.0 / 320.0);
        assert_eq!(p.shape_ratio(), 1.0);
    }

    #[test]
    fn corners_use_the_larger_dimension() {
        let camera = CameraInfo::new(320, 240);
        let p = normalize(&ball_at(0.0, 0.0), &camera, 0.5).unwrap();
        assert_eq!(p.x(), -0.5);
        assert_eq!(p.y(), -120.0 / 320.0);

        let p = normalize(&ball_at(320.0, 240.0), &camera, 0.5).unwrap();
        assert_eq!(p.x(), 0.5);
        assert_eq!(p.y(), 120.0 / 320.0);
    }

    #[test]
    fn portrait_frames_normalize_by_height() {
        let camera = CameraInfo::new(240, 320);
        let p = normalize(&ball_at(120.0, 320.0), &camera, 1.0).unwrap();
        assert_eq!(p.x(), 0.0);
        assert_eq!(p.y(), 0.5);
    }

    #[test]
    fn centers_outside_the_frame_are_allowed() {
        let camera = CameraInfo::new(100, 100);
        let p = normalize(&ball_at(250.0, -50.0), &camera, 1.0).unwrap();
        assert_eq!(p.x(), 2.0);
        assert_eq!(p.y(), -1.0);
    }

    #[test]
    fn zero_size_frame_is_rejected() {
        let err = normalize(&ball_at(1.0, 1.0), &CameraInfo::new(0, 0), 1.0).unwrap_err();
        assert_eq!(err, NormalizeError::ZeroSizeFrame { width: 0, height: 0 });
    }

    #[test]
    fn non_finite_ellipse_is_rejected() {
        let camera = CameraInfo::new(320, 240);
        assert!(matches!(
            normalize(&ball_at(f64::NAN, 1.0), &camera, 1.0),
            Err(NormalizeError::InvalidEllipse(_))
        ));
    }

    proptest! {
        #[test]
        fn normalization_is_linear_and_monotonic(
            w in 1u32..4000,
            h in 1u32..4000,
            x in -1000.0f64..5000.0,
            y in -1000.0f64..5000.0,
            dx in 0.001f64..500.0,
        ) {
            let camera = CameraInfo::new(w, h);
            let a = normalize(&ball_at(x, y), &camera, 1.0).unwrap();
            let b = normalize(&ball_at(x + dx, y + dx), &camera, 1.0).unwrap();
            prop_assert!(b.x() > a.x());
            prop_assert!(b.y() > a.y());

            let scale = w.max(h) as f64;
            prop_assert!(((b.x() - a.x()) - dx / scale).abs() < 1e-9);
            prop_assert!(((b.y() - a.y()) - dx / scale).abs() < 1e-9);
        }

        #[test]
        fn normalization_is_deterministic(
            w in 0u32..4000,
            h in 0u32..4000,
            x in -1000.0f64..5000.0,
            y in -1000.0f64..5000.0,
            ratio in 0.0f64..=1.0,
        ) {
            let camera = CameraInfo::new(w, h);
            let first = normalize(&ball_at(x, y), &camera, ratio);
            let second = normalize(&ball_at(x, y), &camera, ratio);
            match (first, second) {
                (Ok(a), Ok(b)) => {
                    for (l, r) in a.elements.iter().zip(b.elements.iter()) {
                        prop_assert_eq!(l.to_bits(), r.to_bits());
                    }
                }
                (Err(a), Err(b)) => prop_assert_eq!(a, b),
                _ => prop_assert!(false, "normalize disagreed with itself"),
            }
        }
    }
}
