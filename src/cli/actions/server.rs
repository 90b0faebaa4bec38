use crate::api;
use crate::api::handlers::auth::AuthConfig;
use crate::cli::actions::Action;
use anyhow::Result;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            session_secret,
            secure_cookies,
        } => {
            let auth_config =
                AuthConfig::new(session_secret).with_secure_cookies(secure_cookies);

            api::new(port, dsn, auth_config).await?;
        }
    }

    Ok(())
}
