pub mod cv_dto;
pub mod interview_dto;
pub mod job_dto;
pub mod message_dto;
