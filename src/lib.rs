//! Library crate for spectator-sync-back, exposing modules for binaries and tests.

pub mod config;
pub mod dao;
mod dto;
mod error;
pub mod routes;
pub mod services;
pub mod state;
