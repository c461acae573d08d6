//! Database seeding functionality
//!
//! Populates reference data the application expects at startup. Every seed
//! is idempotent and safe to run on each boot.

pub mod report_templates;

pub use report_templates::seed_report_templates;
