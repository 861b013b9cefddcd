pub mod responder;
pub mod rest;
pub mod transport;

pub use responder::DiscordResponder;
pub use rest::{DEFAULT_API_BASE, RestClient};
pub use transport::DiscordTransport;
