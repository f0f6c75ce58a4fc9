/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, and profile
/// - `tasks`: Task CRUD, listings, statistics, and comments
/// - `teams`: Team CRUD, membership, invites, and join-by-code
/// - `ws`: WebSocket endpoint for live task events

pub mod auth;
pub mod health;
pub mod tasks;
pub mod teams;
pub mod ws;
