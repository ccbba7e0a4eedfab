//! Client credentials, environment indicator, and bearer token state.

pub mod credentials;
pub mod token;

pub use credentials::*;
pub use token::*;
