//! NO₂ forecast client, risk aggregator and dashboard backend.

pub mod clients;
pub mod config;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod notify;
pub mod routes;
pub mod services;
pub mod states;
pub mod utils;
