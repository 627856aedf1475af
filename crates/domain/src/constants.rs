//! Protocol constants
//!
//! Media types, default header values and well-known service endpoints shared
//! by the core and the service clients.

// Media types
pub const MEDIA_TYPE_XML: &str = "application/xml";
pub const MEDIA_TYPE_JSON: &str = "application/json";
pub const MEDIA_TYPE_HTML: &str = "text/html";
pub const MEDIA_TYPE_ATOM: &str = "application/atom+xml";
pub const MEDIA_TYPE_RSS: &str = "application/rss+xml";
pub const MEDIA_TYPE_BLINKSALE: &str = "application/vnd.blinksale+xml";

// Request defaults
pub const DEFAULT_USER_AGENT: &str = concat!("LedgerBridge/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const HTTP_PORT: u16 = 80;
pub const HTTPS_PORT: u16 = 443;

// JSON envelope keys
pub const ENVELOPE_RESPONSE_KEY: &str = "response";
pub const ENVELOPE_RESULT_KEY: &str = "result";

// Blinksale
pub const BLINKSALE_HOST_SUFFIX: &str = ".blinksale.com";

// FreshBooks
pub const FRESHBOOKS_HOST: &str = "api.freshbooks.com";
pub const FRESHBOOKS_API_VERSION: &str = "alpha";
pub const FRESHBOOKS_TOKEN_PATH: &str = "/auth/oauth/token";
pub const FRESHBOOKS_IDENTITY_PATH: &str = "/auth/api/v1/users/me";
pub const FRESHBOOKS_AUTHORIZE_URL: &str = "https://my.freshbooks.com/service/auth/oauth/authorize";
