//! Client library for the Vaidya API: token storage, the HTTP client with
//! refresh-and-retry, and the interactive chat session used by `vaidya-cli`.

pub mod chat;
pub mod client;
pub mod token_store;
