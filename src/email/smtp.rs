//! SMTP delivery over `lettre`, relay with mandatory TLS and credentials.

use super::{Mail, MailSender};
use anyhow::{Context, Result};
use lettre::message::{MultiPart, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};

#[derive(Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

pub struct SmtpMailSender {
    transport: SmtpTransport,
}

impl SmtpMailSender {
    /// Build a pooled relay transport.
    ///
    /// # Errors
    /// Returns an error if the relay address is invalid.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let transport = SmtpTransport::relay(&config.server)
            .with_context(|| format!("invalid SMTP relay: {}", config.server))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.expose_secret().to_string(),
            ))
            .timeout(Some(std::time::Duration::from_secs(10)))
            .build();

        Ok(Self { transport })
    }
}

fn build_message(mail: &Mail) -> Result<Message> {
    let builder = Message::builder()
        .from(mail.from.parse().context("invalid from address")?)
        .to(mail.to.parse().context("invalid to address")?)
        .subject(&mail.subject);

    let message = match &mail.html {
        Some(html) => builder.multipart(MultiPart::alternative_plain_html(
            mail.text.clone(),
            html.clone(),
        )),
        None => builder
            .header(ContentType::TEXT_PLAIN)
            .body(mail.text.clone()),
    };

    message.context("failed to build mail message")
}

impl MailSender for SmtpMailSender {
    fn send(&self, mail: &Mail) -> Result<()> {
        let message = build_message(mail)?;
        self.transport
            .send(&message)
            .with_context(|| format!("failed to send mail to {}", mail.to))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(html: Option<&str>) -> Mail {
        Mail {
            to: "user@example.com".to_string(),
            from: "Chiave <noreply@example.com>".to_string(),
            subject: "Activate your account".to_string(),
            text: "plain body".to_string(),
            html: html.map(ToString::to_string),
        }
    }

    #[test]
    fn builds_plain_and_multipart_messages() {
        assert!(build_message(&mail(None)).is_ok());
        assert!(build_message(&mail(Some("<p>hi</p>"))).is_ok());
    }

    #[test]
    fn rejects_bad_addresses() {
        let mut bad = mail(None);
        bad.to = "not an address".to_string();
        assert!(build_message(&bad).is_err());
    }

    #[test]
    fn config_debug_redacts_password() {
        let config = SmtpConfig {
            server: "smtp.example.com".to_string(),
            port: 465,
            username: "mailer".to_string(),
            password: SecretString::from("hunter2"),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
