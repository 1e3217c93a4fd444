pub mod attributes;
pub mod color;
pub mod detection;
pub mod pipeline;
pub mod region;
pub mod report;
pub mod session;
pub mod taxonomy;
