pub mod fs_upload_store;
pub mod http_verification_service;
pub mod sqlite_submission_repository;
