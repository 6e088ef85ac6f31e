//! Credentials attached to every source request.

use reqwest::RequestBuilder;

/// How a request authenticates against the source.
#[derive(Clone)]
pub enum Credential {
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// HTTP basic auth. Personal access tokens go in `password` with an
    /// empty `username`.
    Basic { username: String, password: String },
}

impl Credential {
    #[must_use]
    pub fn bearer(token: &str) -> Self {
        Credential::Bearer(token.to_owned())
    }

    /// Basic auth with an empty user name and the token as password.
    #[must_use]
    pub fn token_as_password(token: &str) -> Self {
        Credential::Basic {
            username: String::new(),
            password: token.to_owned(),
        }
    }

    pub(crate) fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credential::Bearer(token) => request.bearer_auth(token),
            Credential::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Bearer(_) => f.debug_tuple("Bearer").field(&"[redacted]").finish(),
            Credential::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[redacted]")
                .finish(),
        }
    }
}
