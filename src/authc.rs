use std::sync::Arc;

use http::HeaderValue;
use http::header::AUTHORIZATION;

use crate::config::{AuthenticationScheme, ClientCredentials};
use crate::error::TransportError;
use crate::request::Request;

/// Authenticates one outgoing request by mutating it, typically by setting
/// the `Authorization` header. Runs once per attempt, after the retry layer
/// has restored the request to its original shape.
pub trait RequestAuthenticator: Send + Sync {
    fn authenticate(&self, request: &mut Request) -> Result<(), TransportError>;
}

/// `Authorization: SSWS <token>`, the API-token scheme the identity API
/// expects.
pub struct SswsAuthenticator {
    credentials: ClientCredentials,
}

impl SswsAuthenticator {
    pub fn new(credentials: ClientCredentials) -> Self {
        Self { credentials }
    }
}

impl RequestAuthenticator for SswsAuthenticator {
    fn authenticate(&self, request: &mut Request) -> Result<(), TransportError> {
        let value = authorization_value("SSWS", self.credentials.token())?;
        request.headers_mut().set(AUTHORIZATION, value);
        Ok(())
    }
}

/// `Authorization: Bearer <token>`.
pub struct BearerAuthenticator {
    credentials: ClientCredentials,
}

impl BearerAuthenticator {
    pub fn new(credentials: ClientCredentials) -> Self {
        Self { credentials }
    }
}

impl RequestAuthenticator for BearerAuthenticator {
    fn authenticate(&self, request: &mut Request) -> Result<(), TransportError> {
        let value = authorization_value("Bearer", self.credentials.token())?;
        request.headers_mut().set(AUTHORIZATION, value);
        Ok(())
    }
}

/// Leaves requests untouched.
pub struct DisabledAuthenticator;

impl RequestAuthenticator for DisabledAuthenticator {
    fn authenticate(&self, _request: &mut Request) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Builds the authenticator for a configured scheme. Schemes other than
/// `Disabled` require credentials.
pub fn authenticator_for(
    scheme: AuthenticationScheme,
    credentials: Option<ClientCredentials>,
) -> Result<Arc<dyn RequestAuthenticator>, TransportError> {
    match scheme {
        AuthenticationScheme::Disabled => Ok(Arc::new(DisabledAuthenticator)),
        AuthenticationScheme::Ssws => {
            let credentials = require_credentials(credentials)?;
            Ok(Arc::new(SswsAuthenticator::new(credentials)))
        }
        AuthenticationScheme::Bearer => {
            let credentials = require_credentials(credentials)?;
            Ok(Arc::new(BearerAuthenticator::new(credentials)))
        }
    }
}

fn require_credentials(
    credentials: Option<ClientCredentials>,
) -> Result<ClientCredentials, TransportError> {
    credentials.ok_or_else(|| {
        TransportError::other("client credentials are required for the configured authentication scheme")
    })
}

fn authorization_value(scheme: &str, token: &str) -> Result<HeaderValue, TransportError> {
    let mut value = HeaderValue::from_str(&format!("{scheme} {token}")).map_err(|_| {
        TransportError::other("client credentials are not a valid Authorization header value")
    })?;
    value.set_sensitive(true);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;

    fn request() -> Request {
        Request::new(
            Method::GET,
            "https://example.okta.test/api/v1/users".parse().expect("uri"),
        )
    }

    #[test]
    fn ssws_sets_the_authorization_header() {
        let authenticator = SswsAuthenticator::new(ClientCredentials::new("token-1"));
        let mut request = request();
        authenticator
            .authenticate(&mut request)
            .expect("authenticate request");
        assert_eq!(
            request.headers().get_first(AUTHORIZATION),
            Some("SSWS token-1")
        );
    }

    #[test]
    fn bearer_sets_the_authorization_header() {
        let authenticator = BearerAuthenticator::new(ClientCredentials::new("token-2"));
        let mut request = request();
        authenticator
            .authenticate(&mut request)
            .expect("authenticate request");
        assert_eq!(
            request.headers().get_first(AUTHORIZATION),
            Some("Bearer token-2")
        );
    }

    #[test]
    fn enabled_schemes_require_credentials() {
        let missing = authenticator_for(AuthenticationScheme::Ssws, None);
        assert!(missing.is_err());
        let disabled = authenticator_for(AuthenticationScheme::Disabled, None);
        assert!(disabled.is_ok());
    }

    #[test]
    fn invalid_token_bytes_are_rejected() {
        let authenticator = SswsAuthenticator::new(ClientCredentials::new("bad\ntoken"));
        let mut request = request();
        assert!(authenticator.authenticate(&mut request).is_err());
    }
}
