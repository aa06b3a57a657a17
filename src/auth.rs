//! Auth-domain models: client credentials, redacted secrets, and issued token records.

pub mod credentials;
pub mod secret;
pub mod token;

pub use credentials::*;
pub use secret::*;
pub use token::*;
