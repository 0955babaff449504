//! Library exports for photondam, shared between the binary and tests.

pub mod api;
pub mod config;
pub mod flows;
pub mod models;
pub mod navigation;
pub mod notify;
pub mod session;
pub mod startup;
pub mod utils;

#[cfg(test)]
mod testing;
