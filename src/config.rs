// SPDX-License-Identifier: MIT

//! Application configuration loaded and validated from environment variables.
//!
//! Validation is all-or-nothing: every violation is collected and reported
//! together, and the process refuses to serve traffic unless the whole
//! configuration is well-formed. A misconfigured secret is a security
//! incident, not a runtime warning.

use std::collections::HashMap;
use std::env;
use std::fmt;

/// Minimum length for signing secrets (JWT + session).
pub const MIN_SECRET_LEN: usize = 32;

const DEFAULT_PORT: u16 = 8080;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn is_production(self) -> bool {
        self == AppEnv::Production
    }
}

/// Application configuration, loaded once at startup and passed by
/// reference through `AppState`. No component reads ambient environment
/// after this struct is built.
#[derive(Debug, Clone)]
pub struct Config {
    pub app_env: AppEnv,
    /// Server port
    pub port: u16,
    /// GCP project hosting the Firestore database
    pub gcp_project_id: String,
    /// Public base URL of this API (used for the OAuth callback)
    pub api_url: String,

    // --- OAuth ---
    pub google_client_id: String,
    pub google_client_secret: String,

    // --- Secrets ---
    /// Bearer token signing key (raw bytes, >= 32)
    pub jwt_secret: Vec<u8>,
    /// Session cookie signing key (raw bytes, >= 32)
    pub session_secret: Vec<u8>,

    // --- HTTP surface ---
    /// Origins allowed by CORS
    pub allowed_origins: Vec<String>,
    /// Fixed-window rate limit: window length in seconds
    pub rate_limit_window_secs: u64,
    /// Fixed-window rate limit: max requests per window per client
    pub rate_limit_max_requests: u32,

    // --- Upload collaborator (validated here, consumed elsewhere) ---
    pub storage_bucket: String,
    pub storage_region: String,
    pub storage_access_key: String,
    pub storage_secret_key: String,
    pub max_upload_bytes: u64,
    pub allowed_upload_types: Vec<String>,

    // --- Error tracking collaborator ---
    pub sentry_dsn: Option<String>,

    // --- Mobile client ---
    /// Custom URI scheme the OAuth callback redirects to (e.g. "daybook")
    pub mobile_scheme: String,
    /// Cookie domain, required in production
    pub cookie_domain: Option<String>,
}

/// A single configuration violation, attributed to its variable.
#[derive(Debug, Clone)]
pub struct Violation {
    pub var: &'static str,
    pub problem: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.var, self.problem)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration ({} problem(s))", .0.len())]
    Invalid(Vec<Violation>),
}

impl ConfigError {
    pub fn violations(&self) -> &[Violation] {
        match self {
            ConfigError::Invalid(v) => v,
        }
    }
}

/// Accumulates violations while reading variables, so a single pass
/// reports everything that is wrong instead of failing on the first.
struct Checker<'a> {
    vars: &'a HashMap<String, String>,
    violations: Vec<Violation>,
}

impl<'a> Checker<'a> {
    fn new(vars: &'a HashMap<String, String>) -> Self {
        Self {
            vars,
            violations: Vec::new(),
        }
    }

    fn fail(&mut self, var: &'static str, problem: impl Into<String>) {
        self.violations.push(Violation {
            var,
            problem: problem.into(),
        });
    }

    fn optional(&self, var: &'static str) -> Option<String> {
        self.vars
            .get(var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&mut self, var: &'static str) -> String {
        match self.optional(var) {
            Some(v) => v,
            None => {
                self.fail(var, "missing required environment variable");
                String::new()
            }
        }
    }

    fn secret(&mut self, var: &'static str) -> Vec<u8> {
        let value = self.required(var);
        if !value.is_empty() && value.len() < MIN_SECRET_LEN {
            self.fail(
                var,
                format!("must be at least {} characters", MIN_SECRET_LEN),
            );
        }
        value.into_bytes()
    }

    fn url(&mut self, var: &'static str) -> String {
        let value = self.required(var);
        if !value.is_empty() && !is_http_url(&value) {
            self.fail(var, "must be an http(s) URL");
        }
        value
    }

    fn positive_u64(&mut self, var: &'static str) -> u64 {
        let value = self.required(var);
        if value.is_empty() {
            return 0;
        }
        match value.parse::<u64>() {
            Ok(0) => {
                self.fail(var, "must be greater than 0");
                0
            }
            Ok(n) => n,
            Err(_) => {
                self.fail(var, "must be a positive integer");
                0
            }
        }
    }

    fn comma_list(&mut self, var: &'static str) -> Vec<String> {
        let value = self.required(var);
        let items: Vec<String> = value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !value.is_empty() && items.is_empty() {
            self.fail(var, "must contain at least one entry");
        }
        items
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn is_valid_scheme(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Returns the full list of violations rather than the first one, so
    /// an operator fixes a broken deployment in one iteration.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Validate a raw variable map into a typed configuration.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut check = Checker::new(vars);

        let app_env = match check.optional("APP_ENV").as_deref() {
            None | Some("development") => AppEnv::Development,
            Some("production") => AppEnv::Production,
            Some(other) => {
                check.fail(
                    "APP_ENV",
                    format!("must be 'development' or 'production', got '{}'", other),
                );
                AppEnv::Development
            }
        };

        let port = match check.optional("PORT") {
            None => DEFAULT_PORT,
            Some(raw) => match raw.parse::<u16>() {
                Ok(p) => p,
                Err(_) => {
                    check.fail("PORT", "must be a valid port number");
                    DEFAULT_PORT
                }
            },
        };

        let gcp_project_id = check.required("GCP_PROJECT_ID");
        let api_url = check.url("API_URL");

        let google_client_id = check.required("GOOGLE_CLIENT_ID");
        let google_client_secret = check.required("GOOGLE_CLIENT_SECRET");

        let jwt_secret = check.secret("JWT_SECRET");
        let session_secret = check.secret("SESSION_SECRET");

        let allowed_origins = check.comma_list("ALLOWED_ORIGINS");
        for origin in &allowed_origins {
            if !is_http_url(origin) {
                check.fail("ALLOWED_ORIGINS", format!("'{}' is not an http(s) origin", origin));
            }
        }

        let rate_limit_window_secs = check.positive_u64("RATE_LIMIT_WINDOW_SECS");
        let rate_limit_max_requests = check.positive_u64("RATE_LIMIT_MAX_REQUESTS") as u32;

        let storage_bucket = check.required("STORAGE_BUCKET");
        let storage_region = check.required("STORAGE_REGION");
        let storage_access_key = check.required("STORAGE_ACCESS_KEY");
        let storage_secret_key = check.required("STORAGE_SECRET_KEY");
        let max_upload_bytes = check.positive_u64("MAX_UPLOAD_BYTES");

        let allowed_upload_types = check.comma_list("ALLOWED_UPLOAD_TYPES");
        for mime in &allowed_upload_types {
            if !mime.contains('/') {
                check.fail(
                    "ALLOWED_UPLOAD_TYPES",
                    format!("'{}' is not a type/subtype mime pair", mime),
                );
            }
        }

        let sentry_dsn = check.optional("SENTRY_DSN");
        if let Some(dsn) = &sentry_dsn {
            if !is_http_url(dsn) {
                check.fail("SENTRY_DSN", "must be an http(s) DSN URL when set");
            }
        }

        let mobile_scheme = check.required("MOBILE_SCHEME");
        if !mobile_scheme.is_empty() && !is_valid_scheme(&mobile_scheme) {
            check.fail(
                "MOBILE_SCHEME",
                "must be a bare URI scheme (letters, digits, '-', '.')",
            );
        }

        let cookie_domain = check.optional("COOKIE_DOMAIN");
        if app_env.is_production() && cookie_domain.is_none() {
            check.fail("COOKIE_DOMAIN", "required when APP_ENV=production");
        }

        if !check.violations.is_empty() {
            return Err(ConfigError::Invalid(check.violations));
        }

        Ok(Self {
            app_env,
            port,
            gcp_project_id,
            api_url,
            google_client_id,
            google_client_secret,
            jwt_secret,
            session_secret,
            allowed_origins,
            rate_limit_window_secs,
            rate_limit_max_requests,
            storage_bucket,
            storage_region,
            storage_access_key,
            storage_secret_key,
            max_upload_bytes,
            allowed_upload_types,
            sentry_dsn,
            mobile_scheme,
            cookie_domain,
        })
    }

    /// Valid in-memory configuration for tests.
    pub fn test_default() -> Self {
        Self {
            app_env: AppEnv::Development,
            port: DEFAULT_PORT,
            gcp_project_id: "test-project".to_string(),
            api_url: "http://localhost:8080".to_string(),
            google_client_id: "test_client_id".to_string(),
            google_client_secret: "test_client_secret".to_string(),
            jwt_secret: b"test_jwt_secret_32_bytes_minimum!".to_vec(),
            session_secret: b"test_session_secret_32_bytes_min!".to_vec(),
            allowed_origins: vec!["http://localhost:5173".to_string()],
            rate_limit_window_secs: 60,
            rate_limit_max_requests: 1000,
            storage_bucket: "test-bucket".to_string(),
            storage_region: "us-west-1".to_string(),
            storage_access_key: "test_access_key".to_string(),
            storage_secret_key: "test_secret_key".to_string(),
            max_upload_bytes: 5 * 1024 * 1024,
            allowed_upload_types: vec!["image/jpeg".to_string(), "image/png".to_string()],
            sentry_dsn: None,
            mobile_scheme: "daybook".to_string(),
            cookie_domain: None,
        }
    }
}
