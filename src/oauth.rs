//! OAuth authentication helpers for Twitter/X API integration.
//!
//! The agent acts as a user (it posts replies), so every request carries an
//! OAuth 2.0 User Context access token.

/// Builds the Authorization header for OAuth 2.0 User Context authentication.
///
/// # Parameters
///
/// - `access_token`: The Access Token obtained through OAuth 2.0 Authorization Code Flow
///
/// # Returns
///
/// A properly formatted Authorization header value.
///
/// # Example
///
/// ```rust
/// use liora::build_oauth2_user_context_header;
///
/// let header = build_oauth2_user_context_header("your_access_token");
/// assert_eq!(header, "Bearer your_access_token");
/// ```
pub fn build_oauth2_user_context_header(access_token: &str) -> String {
    format!("Bearer {}", access_token.trim())
}
