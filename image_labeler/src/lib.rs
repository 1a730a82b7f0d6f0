pub mod annotation;
pub mod app;
pub mod config;
pub mod cv_utils;
pub mod detector;
pub mod fetcher;
pub mod label;
pub mod render;

pub use app::{start_app, Outcome};
