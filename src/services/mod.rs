pub mod audit_service;
pub mod cv_service;
pub mod dashboard_service;
pub mod export_service;
pub mod interview_service;
pub mod job_service;
pub mod maintenance;
pub mod message_service;
pub mod realtime;
pub mod scoring;
pub mod storage;
