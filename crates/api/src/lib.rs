//! HTTP surface of the job processor: one invoke endpoint plus health.

pub mod app;
