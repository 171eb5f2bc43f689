// Face blurring pipeline

pub mod blur;
pub mod detection;
pub mod geometry;
pub mod orchestrator;
pub mod types;
