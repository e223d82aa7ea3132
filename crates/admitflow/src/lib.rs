//! Admission pipeline tracking for an education-consulting CRM.
//!
//! [`progress`] holds the phase progress engine; [`server`] exposes it over
//! HTTP for the CRM front end.

pub mod progress;
pub mod server;
pub mod types;
