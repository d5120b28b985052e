use crate::error::TransportError;
use crate::request::Request;
use crate::response::Response;

/// Executes one abstract request and produces one abstract response.
///
/// Implementations may mutate the request (authentication headers, retry
/// correlation headers, query restoration); the caller gets it back in
/// whatever state the final attempt left it.
pub trait RequestExecutor: Send + Sync {
    fn execute(&self, request: &mut Request) -> Result<Response, TransportError>;
}
