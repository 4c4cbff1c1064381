//! WebSocket session protocol: one [`session::Session`] per server, one
//! [`connection::handle_connection`] task per socket.

pub mod connection;
pub mod session;

pub use session::Session;
