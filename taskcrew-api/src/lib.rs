//! # Taskcrew API Server Library
//!
//! This library provides the Taskcrew HTTP API: REST endpoints for
//! authentication, teams, and tasks, plus the WebSocket endpoint for live
//! task events.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `response`: The success response envelope
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod response;
pub mod routes;
