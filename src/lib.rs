pub mod ai;
pub mod auth;
pub mod binding;
pub mod client;
pub mod config;
pub mod cycle;
pub mod error;
pub mod firestore;
pub mod logging;
pub mod models;
pub mod nutrition;
pub mod paths;
pub mod plan;
pub mod progress;
pub mod sync;
pub mod timer;
pub mod writer;

pub use client::FitFemClient;
