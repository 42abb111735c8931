//! Salon walk-in queue service.
//!
//! This library provides the core functionality for the salon-queue
//! system: per-salon ordered queues with strict position invariants,
//! wait-time estimation, a status state machine, geolocation-based
//! arrival verification, and real-time fanout of queue changes to
//! connected clients.

pub mod app_state;
pub mod auth;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
