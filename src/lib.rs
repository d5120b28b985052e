//! `okta-http` is the HTTP request execution core of an identity-provider
//! API client. It turns one abstract request into one or more network
//! exchanges: request authentication, a pooled blocking transport, automatic
//! retries with backoff, rate-limit honoring, and normalized response
//! decoding.
//!
//! # Quick Start
//!
//! ```no_run
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use http::Method;
//! use okta_http::{
//!     ClientConfiguration, ClientCredentials, Request, RequestExecutor, request_executor,
//! };
//!
//!     let configuration = ClientConfiguration {
//!         client_credentials: Some(ClientCredentials::new("00a...token")),
//!         retry_max_attempts: 4,
//!         retry_max_elapsed_secs: 30,
//!         ..ClientConfiguration::default()
//!     };
//!     let executor = request_executor(&configuration)?;
//!
//!     let mut request = Request::new(
//!         Method::GET,
//!         "https://example.okta.com/api/v1/users?limit=25".parse()?,
//!     );
//!     let response = executor.execute(&mut request)?;
//!
//!     println!("{} {}", response.status(), response.text_lossy());
//!     Ok(())
//! # }
//! ```
//!
//! # Retry behavior
//!
//! Responses with status 429, 503, or 504 and socket-level transport
//! failures are retried while the attempt cap and the elapsed budget both
//! permit. A 429 carrying `X-Rate-Limit-Reset` and `Date` is honored to the
//! second; everything else follows an exponential schedule capped at 20
//! seconds, overridable through [`BackoffStrategy`]. Retried attempts carry
//! `X-Okta-Retry-For` and `X-Okta-Retry-Count` so the server can correlate
//! them.

mod authc;
mod core;
mod http;
mod transport;

pub(crate) use crate::core::backoff;
pub(crate) use crate::core::config;
pub(crate) use crate::core::error;
pub(crate) use crate::core::execution;
pub(crate) use crate::core::retry;
pub(crate) use crate::http::headers;
pub(crate) use crate::http::query;
pub(crate) use crate::http::request;
pub(crate) use crate::http::response;

pub use crate::authc::{
    BearerAuthenticator, DisabledAuthenticator, RequestAuthenticator, SswsAuthenticator,
    authenticator_for,
};
pub use crate::backoff::BackoffStrategy;
pub use crate::config::{
    AuthenticationScheme, ClientConfiguration, ClientCredentials,
    DEFAULT_MAX_CONNECTIONS_PER_ROUTE, DEFAULT_MAX_CONNECTIONS_TOTAL, PoolSettings, Proxy,
};
pub use crate::error::{TransportError, TransportErrorKind};
pub use crate::execution::RequestExecutor;
pub use crate::headers::{
    Headers, OKTA_REQUEST_ID, OKTA_RETRY_COUNT, OKTA_RETRY_FOR, RATE_LIMIT_RESET,
};
pub use crate::query::QueryString;
pub use crate::request::{Request, RequestBody};
pub use crate::response::Response;
pub use crate::retry::{CancelToken, RetryRequestExecutor};
pub use crate::transport::{TransportRequestExecutor, request_executor};

pub type Result<T> = std::result::Result<T, TransportError>;
