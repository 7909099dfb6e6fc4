//! Data models shared by the router and its collaborators.
//!
//! - `Request`: an intercepted request (method, URL, headers)
//! - `StoredResponse`: a response as it is kept in a cache store
//! - Message payloads exchanged with open pages

pub mod message;
pub mod request;
pub mod response;

pub use message::{InboundMessage, OutboundMessage, StatusUpdate};
pub use request::Request;
pub use response::StoredResponse;
