//! Domain services used by HTTP and websocket routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence so route handlers stay
//! focused on extraction, auth plumbing, and mapping errors to statuses.
//! `triage` and `chunker` are pure; everything else takes a pool or the
//! shared `AppState`.

pub mod audit;
pub mod auth;
pub mod chunker;
pub mod connections;
pub mod conversation;
pub mod documents;
pub mod health;
pub mod page;
pub mod rag;
pub mod session;
pub mod triage;
pub mod users;
