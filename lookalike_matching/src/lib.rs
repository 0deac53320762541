// src/lib.rs
pub mod cache;
pub mod matching;
pub mod models;
pub mod sources;
pub mod utils;
