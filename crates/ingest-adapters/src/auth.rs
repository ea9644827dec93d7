//! Per-adapter credential shapes, applied as a request header by
//! [`crate::http::send_json`].

#[derive(Debug, Clone)]
pub enum AuthMode {
    Bearer(String),
    Basic { username: String, password: String },
}

impl AuthMode {
    pub(crate) fn apply(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            AuthMode::Bearer(token) => builder.bearer_auth(token),
            AuthMode::Basic { username, password } => builder.basic_auth(username, Some(password)),
        }
    }
}
