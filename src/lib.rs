pub mod app;
pub mod completion;
pub mod config;
pub mod device;
pub mod models;
pub mod parser;
pub mod query;
pub mod render;
