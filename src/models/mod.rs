pub mod api;
pub mod job;
pub mod report;
pub mod submission;
