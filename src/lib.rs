pub mod app;
pub mod config;
pub mod fetch_error;
pub mod fetcher;
pub mod normalizer;
pub mod presentation;
pub mod view_state;
