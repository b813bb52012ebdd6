//! Satellite positions, ground tracks and visibility passes computed from
//! cached two-line element sets.

pub mod catalog;
pub mod config;
pub mod elements;
pub mod error;
pub mod orbit;
pub mod resolver;
pub mod service;
pub mod time;
pub mod web;

pub use config::Config;
pub use error::{ServiceError, ServiceResult};
pub use service::Service;
