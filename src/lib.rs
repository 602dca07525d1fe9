pub mod app;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod persistence;
pub mod search;
pub mod watchlist;
