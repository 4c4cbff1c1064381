//! WebSocket client for the SecureAWS chat server.
//!
//! [`ChatApi`] creates the conversation over REST, [`ChatClient`] owns the
//! socket, and [`ChatView`] is the state it renders from.

pub mod api;
pub mod connection;
pub mod view;

pub use api::ChatApi;
pub use connection::ChatClient;
pub use view::{ChatView, ConnectionState};
