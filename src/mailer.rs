use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use log::info;
use thiserror::Error;

use crate::env_file::EnvFile;

pub const SMTP_HOST: &str = "smtp.gmail.com";
pub const SMTP_PORT: u16 = 587;

pub const ADDRESS_VAR: &str = "GMAIL_ADDRESS";
pub const APP_PASSWORD_VAR: &str = "GMAIL_APP_PASSWORD";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Missing GMAIL_ADDRESS or GMAIL_APP_PASSWORD in .env")]
    MissingCredentials,

    #[error("invalid address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Gmail account and app password used to authenticate the SMTP session.
#[derive(Clone, PartialEq, Eq)]
pub struct GmailCredentials {
    pub address: String,
    app_password: String,
}

impl std::fmt::Debug for GmailCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmailCredentials")
            .field("address", &self.address)
            .field("app_password", &"<redacted>")
            .finish()
    }
}

impl GmailCredentials {
    pub fn new(address: impl Into<String>, app_password: impl Into<String>) -> Self {
        GmailCredentials {
            address: address.into(),
            app_password: app_password.into(),
        }
    }

    /// Look the credentials up in the process environment, falling back to
    /// the env file. Values are trimmed; empty values count as missing.
    pub fn resolve<F>(env_file: &EnvFile, process_env: F) -> Result<Self, MailError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| {
            env_file
                .resolve(key, &process_env)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        match (lookup(ADDRESS_VAR), lookup(APP_PASSWORD_VAR)) {
            (Some(address), Some(app_password)) => Ok(Self::new(address, app_password)),
            _ => Err(MailError::MissingCredentials),
        }
    }

    /// [`resolve`](Self::resolve) against the real process environment.
    pub fn from_env(env_file: &EnvFile) -> Result<Self, MailError> {
        Self::resolve(env_file, |key| std::env::var(key).ok())
    }
}

/// Build a single plaintext message.
pub fn compose_message(
    from: &str,
    to: &str,
    subject: &str,
    body: &str,
) -> Result<Message, MailError> {
    let parse = |address: &str| {
        address.parse().map_err(|source| MailError::Address {
            address: address.to_string(),
            source,
        })
    };

    Ok(Message::builder()
        .from(parse(from)?)
        .to(parse(to)?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())?)
}

pub struct Mailer {
    smtp: SmtpTransport,
    from: String,
}

impl Mailer {
    /// A transport for Gmail's submission port: STARTTLS is required before
    /// the credentials are sent.
    pub fn gmail(credentials: GmailCredentials) -> Result<Self, MailError> {
        let creds = Credentials::new(credentials.address.clone(), credentials.app_password);

        let smtp = SmtpTransport::starttls_relay(SMTP_HOST)?
            .port(SMTP_PORT)
            .credentials(creds)
            .build();

        Ok(Mailer {
            smtp,
            from: credentials.address,
        })
    }

    pub fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let email = compose_message(&self.from, to, subject, body)?;
        self.smtp.send(&email)?;
        info!("sent {subject:?} to {to} via {SMTP_HOST}:{SMTP_PORT}");
        Ok(())
    }
}
