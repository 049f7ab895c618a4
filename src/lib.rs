//! MarkChain Backend Library
//!
//! Wallet-signature authentication for MarkChain: challenge issuance, EIP-191
//! signature verification, identity records and session tokens, served over
//! an axum HTTP API.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
