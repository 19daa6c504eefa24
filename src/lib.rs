pub mod ai;
pub mod api;
pub mod config;
pub mod controllers;
pub mod dashboard;
pub mod logging;
pub mod page;
pub mod render;
pub mod session;
pub mod upload;
