pub mod package;
pub mod package_plan;
pub mod payment;
pub mod project;
pub mod project_table;
pub mod purchase;
pub mod status;
pub mod token_log;
pub mod user;
