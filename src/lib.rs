//! # Metricly API Library
//!
//! Multi-tenant e-commerce analytics backend: accounts and teams, platform
//! integrations, metrics aggregation, reporting and Stripe billing.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod cursor;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod scheduler;
pub mod seeds;
pub mod server;
pub mod services;
pub mod telemetry;
pub mod webhook_verification;
pub use migration;
