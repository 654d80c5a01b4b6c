mod client;
mod errors;
mod query;
pub mod types;
mod user_agent;
pub use self::client::{Client, API_BASE_URL};
pub use self::errors::Error;
pub use self::query::{MessageQuery, Query};
