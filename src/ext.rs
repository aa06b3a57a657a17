//! Extension points for attaching manager-issued tokens to outbound requests.

pub mod request_signer;

pub use request_signer::*;
