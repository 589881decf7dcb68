pub mod aggregator;
pub mod api;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod data_models;
pub mod db;
pub mod error;
pub mod grid;
pub mod provider;
pub mod radar;
