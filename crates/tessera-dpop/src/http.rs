//! HTTP method and URL checks shared by the prover and the verifier

use tessera_core::{Error, Result};

/// Methods a proof may be bound to
pub const HTTP_METHODS: [&str; 9] = [
    "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "CONNECT", "OPTIONS", "TRACE",
];

/// A request target after validation: upper-cased method and canonical URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    /// Upper-cased HTTP method (`htm`)
    pub method: String,
    /// `scheme://host[:port]/path` (`htu`)
    pub url: String,
}

impl RequestTarget {
    /// Validate and canonicalize a request method and URL
    ///
    /// # Errors
    /// Returns [`Error::Argument`] for a blank field, an unsupported method or
    /// a malformed URL
    pub fn new(method: &str, url: &str) -> Result<Self> {
        if method.trim().is_empty() {
            return Err(Error::argument("HTTP method must not be blank"));
        }
        if url.trim().is_empty() {
            return Err(Error::argument("HTTP URL must not be blank"));
        }

        let method = method.to_ascii_uppercase();
        if !is_valid_http_method(&method) {
            return Err(Error::argument(format!("Unsupported HTTP method: {method}")));
        }

        Ok(Self {
            method,
            url: canonicalize_url(url)?,
        })
    }
}

/// Validate HTTP method (case-insensitive)
#[must_use]
pub fn is_valid_http_method(method: &str) -> bool {
    HTTP_METHODS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(method))
}

/// Reduce a URL to `scheme://host[:port]/path`, dropping query and fragment
///
/// Default ports are omitted, so `https://a.example:443/x` and
/// `https://a.example/x` canonicalize identically.
///
/// # Errors
/// Returns [`Error::Argument`] if the URL does not parse, is not http(s), or
/// has no host
pub fn canonicalize_url(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url).map_err(|e| Error::Argument {
        reason: format!("Invalid URL format: {e}"),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::argument(format!(
            "Unsupported URL scheme: {}",
            parsed.scheme()
        )));
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| Error::argument("URL missing host"))?;

    let authority = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    Ok(format!("{}://{}{}", parsed.scheme(), authority, parsed.path()))
}
