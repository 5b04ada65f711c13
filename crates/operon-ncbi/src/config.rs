use std::time::Duration;

pub const DEFAULT_EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const API_KEY_VAR: &str = "NCBI_API_KEY";
pub const EMAIL_VAR: &str = "NCBI_EMAIL";

/// Connection settings for E-utilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NcbiConfig {
    /// Base URL without a trailing slash; `efetch.fcgi` is appended.
    pub base_url: String,
    pub api_key: Option<String>,
    /// Identification NCBI asks heavy users to send with every request.
    pub tool: Option<String>,
    pub email: Option<String>,
    /// Upper bound for a single request, connection included.
    pub timeout: Duration,
}

impl Default for NcbiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EUTILS_URL.to_string(),
            api_key: None,
            tool: Some(env!("CARGO_PKG_NAME").to_string()),
            email: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl NcbiConfig {
    /// Defaults plus the API key and contact email from the environment.
    pub fn from_env() -> Self {
        Self {
            api_key: non_empty_var(API_KEY_VAR),
            email: non_empty_var(EMAIL_VAR),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Minimum spacing between requests allowed by NCBI usage policy:
    /// 10 requests/s with an API key, 3 requests/s without.
    pub fn recommended_interval(&self) -> Duration {
        if self.api_key.is_some() {
            Duration::from_millis(100)
        } else {
            Duration::from_millis(340)
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
