pub mod dashboard;
pub mod plan_validation;
pub mod pricing;
pub mod provisioning;
pub mod purchase;
