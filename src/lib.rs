//! Authenticated, retrying HTTP client for scripts that page through vendor cloud APIs.
//!
//! [`client::ApiClient`] owns the OAuth 2.0 client-credentials token, refreshes it before it
//! goes stale, and wraps every outbound call in a bounded retry state machine. The
//! [`output`] module carries the filesystem and file-naming helpers used when paginated
//! responses are written to disk.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod output;
pub mod retry;

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;

#[cfg(test)] use {color_eyre as _, httpmock as _, tempfile as _, tracing_subscriber as _};
