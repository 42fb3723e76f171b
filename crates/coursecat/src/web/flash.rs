//! One-shot flash messages carried in a signed cookie.
//!
//! A redirect sets the `flash` cookie; the next rendered page shows the
//! message and clears the cookie. The cookie value is
//! `<category>.<hex message>.<mac>` where the MAC is a BLAKE3 keyed hash
//! under a key derived from `server.secret_key`. Cookies that fail to verify
//! are dropped silently.

use std::convert::Infallible;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};

use super::AppState;

/// Name of the cookie holding the pending flash message.
pub const COOKIE_NAME: &str = "flash";

/// Context string for deriving the cookie MAC key.
const KEY_CONTEXT: &str = "coursecat 2024-09-01 flash cookie mac";

/// Longest message, in bytes, carried in the cookie. Hex doubles it, so a
/// sealed cookie stays well under the 4096-byte browser limit.
pub const MAX_MESSAGE_BYTES: usize = 1024;

/// Kind of flash message, used for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashCategory {
    /// Something the user must fix.
    Error,
    /// Confirmation of a completed action.
    Success,
}

impl FlashCategory {
    /// The category's wire and CSS name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Success => "success",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "error" => Some(Self::Error),
            "success" => Some(Self::Success),
            _ => None,
        }
    }
}

/// A message to show once on the next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    /// How to style the message.
    pub category: FlashCategory,
    /// Text shown to the user.
    pub message: String,
}

impl Flash {
    /// An error message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Error,
            message: message.into(),
        }
    }

    /// A success message.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Success,
            message: message.into(),
        }
    }
}

/// MAC key for flash cookies.
#[derive(Clone)]
pub struct FlashKey([u8; 32]);

impl std::fmt::Debug for FlashKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FlashKey(..)")
    }
}

impl FlashKey {
    /// Derive the cookie key from the configured secret.
    #[must_use]
    pub fn derive(secret: &str) -> Self {
        Self(blake3::derive_key(KEY_CONTEXT, secret.as_bytes()))
    }

    /// Encode and sign a flash message as a cookie value.
    ///
    /// Messages longer than [`MAX_MESSAGE_BYTES`] are cut at a character
    /// boundary and end with `...`.
    #[must_use]
    pub fn seal(&self, flash: &Flash) -> String {
        let payload = format!(
            "{}.{}",
            flash.category.as_str(),
            hex::encode(truncate_message(&flash.message))
        );
        let mac = blake3::keyed_hash(&self.0, payload.as_bytes());
        format!("{payload}.{}", mac.to_hex())
    }

    /// Verify and decode a cookie value produced by [`FlashKey::seal`].
    #[must_use]
    pub fn open(&self, value: &str) -> Option<Flash> {
        let (payload, mac_hex) = value.rsplit_once('.')?;
        let provided = blake3::Hash::from_hex(mac_hex).ok()?;
        // blake3::Hash equality is constant-time.
        if blake3::keyed_hash(&self.0, payload.as_bytes()) != provided {
            return None;
        }

        let (category, message_hex) = payload.split_once('.')?;
        let message = String::from_utf8(hex::decode(message_hex).ok()?).ok()?;
        Some(Flash {
            category: FlashCategory::parse(category)?,
            message,
        })
    }
}

/// The flash message sent with the current request, if any.
#[derive(Debug, Clone, Default)]
pub struct IncomingFlash {
    /// The verified message.
    pub flash: Option<Flash>,
    /// Whether a flash cookie was sent at all, valid or not.
    pub present: bool,
}

impl IncomingFlash {
    /// Read and verify the flash cookie from request headers.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, key: &FlashKey) -> Self {
        match read_cookie(headers) {
            Some(value) => Self {
                flash: key.open(value),
                present: true,
            },
            None => Self::default(),
        }
    }

    /// The message to render, if one verified.
    #[must_use]
    pub fn message(&self) -> Option<&Flash> {
        self.flash.as_ref()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for IncomingFlash {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers, &state.flash_key))
    }
}

/// Find the flash cookie among the request's `Cookie` headers.
#[must_use]
pub fn read_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .map(str::trim)
        .find_map(|pair| {
            pair.strip_prefix(COOKIE_NAME)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .filter(|v| !v.is_empty())
}

/// `Set-Cookie` value that stores a sealed flash message.
#[must_use]
pub fn set_cookie(sealed: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{COOKIE_NAME}={sealed}; Path=/; HttpOnly; SameSite=Lax"
    ))
    .ok()
}

/// `Set-Cookie` value that removes the flash cookie.
#[must_use]
pub fn clear_cookie() -> HeaderValue {
    HeaderValue::from_static("flash=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}

fn truncate_message(message: &str) -> String {
    if message.len() <= MAX_MESSAGE_BYTES {
        return message.to_string();
    }
    let mut end = MAX_MESSAGE_BYTES - 3;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &message[..end])
}
