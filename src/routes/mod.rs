pub mod audit;
pub mod cvs;
pub mod dashboard;
pub mod events;
pub mod health;
pub mod interviews;
pub mod jobs;
pub mod me;
pub mod messages;
pub mod openapi;
