//! Core building blocks: run parameters and typed option values, the phantom
//! study with its pipeline factories, the per-phantom pipeline, and the
//! metrics backend hand-off. Consumed by the high-level `api` module.
pub mod metrics;
pub mod params;
pub mod pipeline;
pub mod study;
