pub mod infrastructure;
pub mod list_submissions_use_case;
pub mod liveness_pipeline;
pub mod pipeline_logger;
pub mod submit_kyc_use_case;
