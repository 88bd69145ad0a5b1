//! optica - HTTP API for optical prescriptions
//!
//! Request handlers validate input, call the hosted database through the
//! [`data_service::DataService`] contract and shape JSON responses. Stored
//! procedures and schema belong to the database and are not modelled here.

pub mod cli;
pub mod config;
pub mod data_service;
pub mod http_server;
pub mod models;
pub mod observability;
