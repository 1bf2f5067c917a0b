//! ProjectDock API - Backend for quota-bounded project workspaces
//!
//! This crate provides the REST API for ProjectDock, enabling:
//! - Package and plan management for administrators
//! - Plan purchases that grant time-limited project quotas
//! - Project and table provisioning within those quotas
//! - Admin and customer dashboards

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod validation;
