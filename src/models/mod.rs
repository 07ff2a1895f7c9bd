//! Data models shared by the REST client, the relay and the panel

mod message;
mod user;

pub use message::*;
pub use user::*;
