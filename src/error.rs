use thiserror::Error;

/// Where the user fixes a price credential in the terminal UI.
pub const PRICE_KEY_HINT: &str = "Settings > Data > API Key";
/// Where the user fixes a news credential in the terminal UI.
pub const NEWS_KEY_HINT: &str = "Settings > Data > News API Key";
/// Where the user fixes the custom news URL in the terminal UI.
pub const NEWS_URL_HINT: &str = "Settings > Data > News";
/// Where the user picks data providers in the terminal UI.
pub const DATA_SETTINGS_HINT: &str = "Settings > Data";

#[derive(Debug, Error)]
pub enum Error {
    #[error("{provider} requires an API key. Please add your key in {hint}")]
    MissingCredential {
        provider: &'static str,
        hint: &'static str,
    },

    #[error("Your {provider} API key is invalid. Please check your key in {hint}")]
    Auth {
        provider: &'static str,
        hint: &'static str,
    },

    #[error("{provider} rate limit exceeded. Please try again later or check your plan and key in {hint}")]
    RateLimited {
        provider: &'static str,
        hint: &'static str,
    },

    #[error("{provider} did not respond within {secs}s. Please try again later or choose another provider in {hint}")]
    Timeout {
        provider: &'static str,
        secs: u64,
        hint: &'static str,
    },

    #[error("{provider} returned server error {status}. Please try again later or choose another provider in {hint}")]
    Server {
        provider: &'static str,
        status: u16,
        hint: &'static str,
    },

    #[error("{provider} returned 0 articles")]
    NoArticles { provider: &'static str },

    #[error(
        "The custom news URL '{url}' is not a valid URL. Please enter a valid URL like https://api.example.com/news"
    )]
    InvalidCustomUrl { url: String },

    #[error("Your {provider} URL is invalid or unreachable. Please check the URL in {hint}")]
    UnreachableHost {
        provider: &'static str,
        hint: &'static str,
    },

    #[error("{provider} does not support currency {currency}")]
    UnsupportedCurrency {
        provider: &'static str,
        currency: String,
    },

    #[error("{provider}: {message}")]
    Rejected {
        provider: &'static str,
        message: String,
    },

    #[error("Failed to fetch from custom URL: {message}. Please check your URL in Settings > Data > News")]
    CustomFeed { message: String },

    #[error("{provider}: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error("{0}")]
    DataUnavailable(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure category used by fallback plans to decide whether another
/// provider may be tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    MissingCredential,
    Auth,
    RateLimited,
    Timeout,
    Server,
    NoArticles,
    InvalidCustomUrl,
    UnreachableHost,
    Provider,
}

impl FailureClass {
    /// Classes that may trigger an automatic provider fallback.
    pub const TRANSIENT: &'static [FailureClass] = &[
        FailureClass::RateLimited,
        FailureClass::Timeout,
        FailureClass::Server,
    ];

    /// Every class except a rejected credential, which the user has to fix.
    pub const UNLESS_AUTH: &'static [FailureClass] = &[
        FailureClass::MissingCredential,
        FailureClass::RateLimited,
        FailureClass::Timeout,
        FailureClass::Server,
        FailureClass::NoArticles,
        FailureClass::InvalidCustomUrl,
        FailureClass::UnreachableHost,
        FailureClass::Provider,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::Auth => "auth",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::Server => "server_error",
            Self::NoArticles => "no_articles",
            Self::InvalidCustomUrl => "invalid_custom_url",
            Self::UnreachableHost => "unreachable_host",
            Self::Provider => "provider_error",
        }
    }
}

impl Error {
    pub fn class(&self) -> FailureClass {
        match self {
            Self::MissingCredential { .. } => FailureClass::MissingCredential,
            Self::Auth { .. } => FailureClass::Auth,
            Self::RateLimited { .. } => FailureClass::RateLimited,
            Self::Timeout { .. } => FailureClass::Timeout,
            Self::Server { .. } => FailureClass::Server,
            Self::NoArticles { .. } => FailureClass::NoArticles,
            Self::InvalidCustomUrl { .. } => FailureClass::InvalidCustomUrl,
            Self::UnreachableHost { .. } => FailureClass::UnreachableHost,
            _ => FailureClass::Provider,
        }
    }

    /// HTTP status the frontend expects for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingCredential { .. }
            | Self::InvalidCustomUrl { .. }
            | Self::Rejected { .. }
            | Self::CustomFeed { .. }
            | Self::BadRequest(_) => 400,
            Self::Auth { .. } => 401,
            Self::NoArticles { .. } | Self::UnreachableHost { .. } => 404,
            _ => 500,
        }
    }

    /// Settings location named in the message, if the variant carries one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingCredential { hint, .. }
            | Self::Auth { hint, .. }
            | Self::RateLimited { hint, .. }
            | Self::Timeout { hint, .. }
            | Self::Server { hint, .. }
            | Self::UnreachableHost { hint, .. } => Some(*hint),
            Self::InvalidCustomUrl { .. } | Self::CustomFeed { .. } => Some(NEWS_URL_HINT),
            _ => None,
        }
    }

    /// One-line cause without the remediation text, for fallback notices.
    pub fn reason(&self) -> String {
        match self {
            Self::RateLimited { provider, .. } => format!("{} rate limit exceeded", provider),
            Self::Timeout { provider, secs, .. } => format!("{} did not respond within {}s", provider, secs),
            Self::Server { provider, status, .. } => format!("{} returned server error {}", provider, status),
            other => other.to_string(),
        }
    }

    /// Every provider failed; the message keeps the last cause and always ends
    /// with a settings location.
    pub fn unavailable(last: &Error) -> Error {
        match last {
            Self::DataUnavailable(msg) => Self::DataUnavailable(msg.clone()),
            err if err.hint().is_some() => Self::DataUnavailable(err.to_string()),
            err => Self::DataUnavailable(format!(
                "{}. Please check your data provider in {}",
                err, DATA_SETTINGS_HINT
            )),
        }
    }

    /// Short `error` field of the JSON error payload.
    pub fn label(&self) -> String {
        match self {
            Self::MissingCredential { .. } => "API key required".into(),
            Self::Auth { .. } => "Invalid API key".into(),
            Self::NoArticles { .. } => "No articles".into(),
            Self::InvalidCustomUrl { .. } | Self::UnreachableHost { .. } => "Invalid URL".into(),
            Self::CustomFeed { .. } => "Invalid custom URL".into(),
            Self::Rejected { provider, .. } => format!("{} Error", provider),
            Self::DataUnavailable(_) => "Data unavailable".into(),
            Self::BadRequest(_) => "Bad request".into(),
            Self::RateLimited { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::Server { provider, .. }
            | Self::UnsupportedCurrency { provider, .. }
            | Self::Provider { provider, .. } => format!("{} API error", provider),
            Self::Parse(_) | Self::Config(_) | Self::Http(_) | Self::Io(_) => "Server error".into(),
        }
    }
}
