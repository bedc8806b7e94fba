//! Domain layer: coordinate algebra, canonical payloads, and the watermark
//! engine.

pub mod canonical;
pub mod coordinate;
pub mod watermark;
