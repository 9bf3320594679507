pub mod candidates;
pub mod classify;
pub mod manager;
pub mod normalize;
pub mod scoring;
pub mod zone_report;
