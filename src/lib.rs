pub mod app;
pub mod catalog;
pub mod config;
pub mod convert;
pub mod domain;
pub mod error;
pub mod output;
pub mod readiness;
pub mod remote;
pub mod store;
pub mod sync;
