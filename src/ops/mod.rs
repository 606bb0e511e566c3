pub mod ai;
pub mod export;
pub mod jobs;
