pub mod submission;
pub mod submission_repository;
pub mod submission_stats;
pub mod upload_store;
pub mod verification_service;
