use crate::cli::actions::Action;
use anyhow::Result;
use secrecy::SecretString;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        dsn: matches
            .get_one("dsn")
            .map(|s: &String| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --dsn"))?,
        session_secret: matches
            .get_one("session-secret")
            .map(|s: &String| SecretString::from(s.clone()))
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --session-secret"))?,
        secure_cookies: matches.get_flag("secure-cookies"),
    })
}

#[cfg(test)]
mod tests {
    use super::handler;
    use crate::cli::{actions::Action, commands};
    use secrecy::ExposeSecret;

    #[test]
    fn dispatch_builds_server_action() {
        let matches = commands::new().get_matches_from(vec![
            "vigilo",
            "--dsn",
            "postgres://localhost/vigilo",
            "--session-secret",
            "sekret",
            "--secure-cookies",
        ]);

        let Ok(Action::Server {
            port,
            dsn,
            session_secret,
            secure_cookies,
        }) = handler(&matches)
        else {
            panic!("expected server action");
        };

        assert_eq!(port, 8080);
        assert_eq!(dsn, "postgres://localhost/vigilo");
        assert_eq!(session_secret.expose_secret(), "sekret");
        assert!(secure_cookies);
    }
}
