//! Auth state and configuration.

use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;

use super::rate_limit::RateLimiter;
use super::session::SessionSigner;

const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(3);

/// Configuration for the credential gateway.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    session_secret: SecretString,
    secure_cookies: bool,
    store_timeout: Duration,
}

impl AuthConfig {
    #[must_use]
    pub fn new(session_secret: SecretString) -> Self {
        Self {
            session_secret,
            secure_cookies: false,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }

    /// Ceiling on any single durable-store call; past it the attempt fails
    /// closed.
    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    pub(super) fn session_secret(&self) -> &SecretString {
        &self.session_secret
    }
}

/// Shared state for the auth handlers: config, the injected ephemeral
/// limiter, and the session signer.
pub struct AuthState {
    config: AuthConfig,
    rate_limiter: Arc<dyn RateLimiter>,
    signer: SessionSigner,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        let signer = SessionSigner::new(config.session_secret());
        Self {
            config,
            rate_limiter,
            signer,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn signer(&self) -> &SessionSigner {
        &self.signer
    }

    pub(crate) fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::super::rate_limit::NoopRateLimiter;
    use super::{AuthConfig, AuthState, DEFAULT_STORE_TIMEOUT};
    use secrecy::SecretString;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new(SecretString::from("key".to_string()));
        assert!(!config.secure_cookies());
        assert_eq!(config.store_timeout(), DEFAULT_STORE_TIMEOUT);

        let config = config
            .with_secure_cookies(true)
            .with_store_timeout(Duration::from_secs(2));
        assert!(config.secure_cookies());
        assert_eq!(config.store_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn auth_state_constructs_with_noop_rate_limiter() {
        let config = AuthConfig::new(SecretString::from("key".to_string()));
        let state = AuthState::new(config, Arc::new(NoopRateLimiter));
        assert!(!state.config().secure_cookies());
    }
}
