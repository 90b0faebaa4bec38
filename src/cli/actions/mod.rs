pub mod server;

use secrecy::SecretString;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        session_secret: SecretString,
        secure_cookies: bool,
    },
}
