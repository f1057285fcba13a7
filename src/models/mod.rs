pub mod audit_log;
pub mod cv;
pub mod interview;
pub mod job_posting;
pub mod message;
