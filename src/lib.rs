//! CRM ML Serving API Library
//!
//! This library provides the serving layer for three pre-trained CRM models
//! (lead scoring, sales forecasting, customer segmentation): artifact
//! loading, feature encoding, prediction post-processing, and the HTTP
//! handlers that wrap them.
//!
//! # Modules
//!
//! - `artifacts`: Serialized model artifact types and the model registry.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers and router.
//! - `models`: Request/response data models.
//! - `services`: Feature encoding and prediction services.

pub mod artifacts;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
