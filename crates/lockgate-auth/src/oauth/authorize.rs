//! Authorization endpoint request and response types.
//!
//! Parsing works on the raw query string rather than a deserialized map
//! so that duplicated parameters can be detected; a request carrying the
//! same parameter twice is rejected before any other validation runs.

use serde::{Deserialize, Serialize};
use url::Url;
use url::form_urlencoded;

use crate::error::AuthError;

// =============================================================================
// Response Type / Response Mode
// =============================================================================

/// Supported `response_type` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseType {
    /// Authorization code flow.
    #[serde(rename = "code")]
    Code,
    /// Implicit flow: the access token is delivered in the fragment.
    #[serde(rename = "token")]
    Token,
}

impl ResponseType {
    /// Parses the `response_type` parameter.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "code" => Some(Self::Code),
            "token" => Some(Self::Token),
            _ => None,
        }
    }

    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Token => "token",
        }
    }

    /// Default response mode for this response type (OAuth 2.0 Multiple
    /// Response Type Encoding Practices Section 2.1).
    #[must_use]
    pub fn default_response_mode(&self) -> ResponseMode {
        match self {
            Self::Code => ResponseMode::Query,
            Self::Token => ResponseMode::Fragment,
        }
    }
}

/// Where authorization response parameters are placed on the redirect URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Parameters appended to the query component.
    Query,
    /// Parameters encoded into the fragment component.
    Fragment,
}

impl ResponseMode {
    /// Parses the `response_mode` parameter.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "query" => Some(Self::Query),
            "fragment" => Some(Self::Fragment),
            _ => None,
        }
    }
}

// =============================================================================
// Authorization Request
// =============================================================================

/// A parsed authorization endpoint request.
///
/// All fields are optional at this stage; the authorization request
/// processor enforces presence in its fixed validation order so that
/// the first failing check determines the error surfaced.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationRequest {
    /// OAuth 2.0 response type.
    pub response_type: Option<String>,
    /// Requested response mode, overriding the response type default.
    pub response_mode: Option<String>,
    /// Client identifier.
    pub client_id: Option<String>,
    /// Redirect URI for the response.
    pub redirect_uri: Option<String>,
    /// Requested scopes, space-delimited on the wire.
    pub scope: Option<String>,
    /// Opaque client state, echoed back verbatim.
    pub state: Option<String>,
    /// PKCE code challenge.
    pub code_challenge: Option<String>,
    /// PKCE code challenge method.
    pub code_challenge_method: Option<String>,
    /// OIDC nonce, bound into the ID token.
    pub nonce: Option<String>,
    /// OIDC prompt directive (`none` suppresses interaction).
    pub prompt: Option<String>,
}

impl AuthorizationRequest {
    /// Parses an authorization request from a raw query string.
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` when any parameter appears more than
    /// once, known or not, or when `response_mode` carries an unknown
    /// value.
    pub fn from_query(query: &str) -> Result<Self, AuthError> {
        let mut request = Self::default();
        let mut seen = std::collections::HashSet::new();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if !seen.insert(key.to_string()) {
                return Err(AuthError::invalid_request(format!(
                    "Duplicate parameter: {key}"
                )));
            }
            let slot = match key.as_ref() {
                "response_type" => &mut request.response_type,
                "response_mode" => &mut request.response_mode,
                "client_id" => &mut request.client_id,
                "redirect_uri" => &mut request.redirect_uri,
                "scope" => &mut request.scope,
                "state" => &mut request.state,
                "code_challenge" => &mut request.code_challenge,
                "code_challenge_method" => &mut request.code_challenge_method,
                "nonce" => &mut request.nonce,
                "prompt" => &mut request.prompt,
                _ => continue,
            };
            *slot = Some(value.into_owned());
        }

        if let Some(mode) = request.response_mode.as_deref() {
            if ResponseMode::parse(mode).is_none() {
                return Err(AuthError::invalid_request(
                    "Invalid parameter: response_mode",
                ));
            }
        }

        Ok(request)
    }

    /// Resolves the response mode for a request: the explicit
    /// `response_mode` parameter when present, the response type
    /// default otherwise. An access token never travels in the query
    /// component, so the implicit flow ignores a `query` override.
    #[must_use]
    pub fn selected_response_mode(&self, response_type: ResponseType) -> ResponseMode {
        match response_type {
            ResponseType::Token => ResponseMode::Fragment,
            ResponseType::Code => self
                .response_mode
                .as_deref()
                .and_then(ResponseMode::parse)
                .unwrap_or_else(|| response_type.default_response_mode()),
        }
    }

    /// Requested scopes split on whitespace.
    #[must_use]
    pub fn scopes(&self) -> Vec<String> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Whether the request asks for non-interactive processing.
    #[must_use]
    pub fn prompt_none(&self) -> bool {
        self.prompt.as_deref() == Some("none")
    }
}

// =============================================================================
// Redirect builders
// =============================================================================

/// Builds the success redirect for the authorization code flow.
///
/// The code lands in the query component by default, or in the
/// fragment when the request selected `response_mode=fragment`.
///
/// # Errors
///
/// Returns an error if `redirect_uri` cannot be parsed as a URL.
pub fn code_redirect_url(
    redirect_uri: &str,
    mode: ResponseMode,
    code: &str,
    state: Option<&str>,
) -> Result<String, AuthError> {
    let mut url = parse_redirect(redirect_uri)?;
    match mode {
        ResponseMode::Query => {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("code", code);
            if let Some(state) = state {
                pairs.append_pair("state", state);
            }
        }
        ResponseMode::Fragment => {
            let mut serializer = form_urlencoded::Serializer::new(String::new());
            serializer.append_pair("code", code);
            if let Some(state) = state {
                serializer.append_pair("state", state);
            }
            url.set_fragment(Some(&serializer.finish()));
        }
    }
    Ok(url.to_string())
}

/// Builds the implicit flow redirect with the token response encoded
/// into the fragment component.
///
/// # Errors
///
/// Returns an error if `redirect_uri` cannot be parsed as a URL.
pub fn implicit_redirect_url(
    redirect_uri: &str,
    access_token: &str,
    token_type: &str,
    expires_in: u64,
    scope: Option<&str>,
    state: Option<&str>,
) -> Result<String, AuthError> {
    let mut url = parse_redirect(redirect_uri)?;

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer.append_pair("access_token", access_token);
    serializer.append_pair("token_type", token_type);
    serializer.append_pair("expires_in", &expires_in.to_string());
    if let Some(scope) = scope {
        serializer.append_pair("scope", scope);
    }
    if let Some(state) = state {
        serializer.append_pair("state", state);
    }
    url.set_fragment(Some(&serializer.finish()));

    Ok(url.to_string())
}

/// Builds an error redirect back to the client.
///
/// Parameters land in the query or the fragment according to the
/// response mode of the flow that failed. `state` is echoed verbatim
/// when the request carried one.
///
/// # Errors
///
/// Returns an error if `redirect_uri` cannot be parsed as a URL.
pub fn error_redirect_url(
    redirect_uri: &str,
    mode: ResponseMode,
    error_code: &str,
    description: &str,
    state: Option<&str>,
) -> Result<String, AuthError> {
    let mut url = parse_redirect(redirect_uri)?;

    match mode {
        ResponseMode::Query => {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("error", error_code);
            pairs.append_pair("error_description", description);
            if let Some(state) = state {
                pairs.append_pair("state", state);
            }
        }
        ResponseMode::Fragment => {
            let mut serializer = form_urlencoded::Serializer::new(String::new());
            serializer.append_pair("error", error_code);
            serializer.append_pair("error_description", description);
            if let Some(state) = state {
                serializer.append_pair("state", state);
            }
            url.set_fragment(Some(&serializer.finish()));
        }
    }

    Ok(url.to_string())
}

/// Builds the gateway-local error page URL.
///
/// Used for failures detected before the redirect URI is trusted; the
/// user agent never reaches the client in this class. `state` is still
/// echoed on the page when the request carried one.
#[must_use]
pub fn error_page_url(
    error_path: &str,
    error_code: &str,
    description: &str,
    state: Option<&str>,
) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer.append_pair("error", error_code);
    serializer.append_pair("error_description", description);
    if let Some(state) = state {
        serializer.append_pair("state", state);
    }
    format!("{error_path}?{}", serializer.finish())
}

fn parse_redirect(redirect_uri: &str) -> Result<Url, AuthError> {
    Url::parse(redirect_uri)
        .map_err(|e| AuthError::invalid_request(format!("Invalid redirect_uri: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_request() {
        let request = AuthorizationRequest::from_query(
            "response_type=code&client_id=web&redirect_uri=http%3A%2F%2Flocalhost%3A4000%2F\
             &scope=openid%20scope1&state=xyz&code_challenge=abc&code_challenge_method=S256",
        )
        .unwrap();

        assert_eq!(request.response_type.as_deref(), Some("code"));
        assert_eq!(request.client_id.as_deref(), Some("web"));
        assert_eq!(
            request.redirect_uri.as_deref(),
            Some("http://localhost:4000/")
        );
        assert_eq!(request.scopes(), vec!["openid", "scope1"]);
        assert_eq!(request.state.as_deref(), Some("xyz"));
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let err =
            AuthorizationRequest::from_query("response_type=code&client_id=a&client_id=b")
                .unwrap_err();
        assert_eq!(err.error_description(), "Duplicate parameter: client_id");
        assert_eq!(err.oauth_error_code(), "invalid_request");
    }

    #[test]
    fn test_unknown_parameters_ignored() {
        let request =
            AuthorizationRequest::from_query("response_type=code&custom=1").unwrap();
        assert_eq!(request.response_type.as_deref(), Some("code"));
    }

    #[test]
    fn test_duplicate_unknown_parameter_rejected() {
        let err = AuthorizationRequest::from_query("response_type=code&custom=1&custom=2")
            .unwrap_err();
        assert_eq!(err.error_description(), "Duplicate parameter: custom");
    }

    #[test]
    fn test_duplicate_response_mode_rejected() {
        let err = AuthorizationRequest::from_query(
            "response_type=code&response_mode=query&response_mode=fragment",
        )
        .unwrap_err();
        assert_eq!(err.error_description(), "Duplicate parameter: response_mode");
    }

    #[test]
    fn test_unknown_response_mode_rejected() {
        let err =
            AuthorizationRequest::from_query("response_type=code&response_mode=form_post")
                .unwrap_err();
        assert_eq!(err.error_description(), "Invalid parameter: response_mode");
    }

    #[test]
    fn test_selected_response_mode() {
        let request = AuthorizationRequest::from_query("response_type=code").unwrap();
        assert_eq!(
            request.selected_response_mode(ResponseType::Code),
            ResponseMode::Query
        );

        let request =
            AuthorizationRequest::from_query("response_type=code&response_mode=fragment")
                .unwrap();
        assert_eq!(
            request.selected_response_mode(ResponseType::Code),
            ResponseMode::Fragment
        );

        // The implicit flow never downgrades to the query component.
        let request =
            AuthorizationRequest::from_query("response_type=token&response_mode=query").unwrap();
        assert_eq!(
            request.selected_response_mode(ResponseType::Token),
            ResponseMode::Fragment
        );
    }

    #[test]
    fn test_prompt_none() {
        let request = AuthorizationRequest::from_query("prompt=none").unwrap();
        assert!(request.prompt_none());
        let request = AuthorizationRequest::from_query("prompt=login").unwrap();
        assert!(!request.prompt_none());
    }

    #[test]
    fn test_default_response_modes() {
        assert_eq!(
            ResponseType::Code.default_response_mode(),
            ResponseMode::Query
        );
        assert_eq!(
            ResponseType::Token.default_response_mode(),
            ResponseMode::Fragment
        );
    }

    #[test]
    fn test_code_redirect_preserves_existing_query() {
        let url = code_redirect_url(
            "http://localhost:4000/cb?keep=1",
            ResponseMode::Query,
            "abc123",
            Some("xyz"),
        )
        .unwrap();
        assert_eq!(url, "http://localhost:4000/cb?keep=1&code=abc123&state=xyz");
    }

    #[test]
    fn test_code_redirect_without_state() {
        let url =
            code_redirect_url("http://localhost:4000/", ResponseMode::Query, "abc123", None)
                .unwrap();
        assert_eq!(url, "http://localhost:4000/?code=abc123");
        assert!(!url.contains("state"));
    }

    #[test]
    fn test_code_redirect_fragment_mode() {
        let url = code_redirect_url(
            "http://localhost:4000/",
            ResponseMode::Fragment,
            "abc123",
            Some("xyz"),
        )
        .unwrap();
        assert_eq!(url, "http://localhost:4000/#code=abc123&state=xyz");
    }

    #[test]
    fn test_implicit_redirect_fragment() {
        let url = implicit_redirect_url(
            "http://localhost:4000/",
            "tok",
            "bearer",
            7200,
            Some("openid"),
            Some("xyz"),
        )
        .unwrap();
        assert_eq!(
            url,
            "http://localhost:4000/#access_token=tok&token_type=bearer&expires_in=7200&scope=openid&state=xyz"
        );
    }

    #[test]
    fn test_error_redirect_query_mode() {
        let url = error_redirect_url(
            "http://localhost:4000/",
            ResponseMode::Query,
            "invalid_scope",
            "Invalid scope(s): bad",
            Some("xyz"),
        )
        .unwrap();
        assert!(url.starts_with("http://localhost:4000/?error=invalid_scope"));
        assert!(url.contains("error_description=Invalid+scope%28s%29%3A+bad"));
        assert!(url.ends_with("&state=xyz"));
    }

    #[test]
    fn test_error_redirect_fragment_mode() {
        let url = error_redirect_url(
            "http://localhost:4000/",
            ResponseMode::Fragment,
            "login_required",
            "Login required",
            None,
        )
        .unwrap();
        assert_eq!(
            url,
            "http://localhost:4000/#error=login_required&error_description=Login+required"
        );
    }

    #[test]
    fn test_error_page_url() {
        let url = error_page_url(
            "/oauth/error",
            "invalid_request",
            "Missing parameter: client_id",
            None,
        );
        assert_eq!(
            url,
            "/oauth/error?error=invalid_request&error_description=Missing+parameter%3A+client_id"
        );
    }

    #[test]
    fn test_error_page_url_echoes_state() {
        let url = error_page_url(
            "/oauth/error",
            "redirect_uri_mismatch",
            "Redirect URI mismatch.",
            Some("xyz"),
        );
        assert!(url.ends_with("&state=xyz"));
    }
}
