// THEORY:
// This file is the main entry point for the `ball_decide` library crate.
//
// The primary export is the `BallDecider` in `pipeline`: a readiness-gated stage that
// takes the blob sets and camera info arriving from upstream, picks the largest
// region, fits it, and publishes a normalized ball position together with
// found / not-found / cycle-complete signals. The numeric pieces it relies on
// (`core_modules::ellipse_fitter`, `core_modules::normalizer`) are public as well,
// since they are pure functions useful on their own. `bus` holds the output sinks
// and `runner` a small async host that serializes notifications for one stage.

pub mod bus;
pub mod core_modules;
pub mod pipeline;
pub mod runner;
