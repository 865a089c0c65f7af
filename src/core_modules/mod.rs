pub mod blob;
pub mod camera_info;
pub mod ellipse_fitter;
pub mod error;
pub mod geometry;
pub mod normalizer;
