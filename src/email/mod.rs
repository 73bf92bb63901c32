//! Outbound notifications. The orchestrator only builds message content and
//! hands it to [`dispatch`]; delivery runs on its own task and a failure is
//! logged, never propagated into the operation that triggered it.

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};

pub mod smtp;

#[derive(Clone, Debug)]
pub struct Mail {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

pub trait MailSender: Send + Sync {
    /// Deliver one message. Blocking is fine; callers run this off the
    /// async runtime.
    ///
    /// # Errors
    /// Returns an error when the message cannot be built or handed to the
    /// transport.
    fn send(&self, mail: &Mail) -> Result<()>;
}

/// Fallback sender used when SMTP is not configured: logs the message
/// instead of delivering it.
#[derive(Clone, Debug)]
pub struct LogMailSender;

impl MailSender for LogMailSender {
    fn send(&self, mail: &Mail) -> Result<()> {
        info!(
            to = %mail.to,
            subject = %mail.subject,
            body = %mail.text,
            "mail delivery stub"
        );
        Ok(())
    }
}

/// Fire-and-forget delivery. Returns immediately; the send runs on a
/// blocking task and errors end up in the log.
pub fn dispatch(sender: &Arc<dyn MailSender>, mail: Mail) {
    let sender = Arc::clone(sender);
    tokio::task::spawn_blocking(move || match sender.send(&mail) {
        Ok(()) => info!(to = %mail.to, subject = %mail.subject, "mail dispatched"),
        Err(err) => error!("mail dispatch failed: {err:#}"),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSender {
        sent: Mutex<Vec<Mail>>,
    }

    impl MailSender for RecordingSender {
        fn send(&self, mail: &Mail) -> Result<()> {
            self.sent.lock().unwrap().push(mail.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatch_does_not_block_or_fail_the_caller() {
        let sender = Arc::new(RecordingSender {
            sent: Mutex::new(Vec::new()),
        });
        let as_dyn: Arc<dyn MailSender> = sender.clone();

        dispatch(
            &as_dyn,
            Mail {
                to: "a@example.com".to_string(),
                from: "noreply@example.com".to_string(),
                subject: "hello".to_string(),
                text: "body".to_string(),
                html: None,
            },
        );

        // give the blocking task a beat to run
        for _ in 0..50 {
            if !sender.sent.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(sender.sent.lock().unwrap().len(), 1);
    }

    struct FailingSender;

    impl MailSender for FailingSender {
        fn send(&self, _mail: &Mail) -> Result<()> {
            anyhow::bail!("smtp unreachable")
        }
    }

    #[tokio::test]
    async fn dispatch_swallows_sender_errors() {
        let sender: Arc<dyn MailSender> = Arc::new(FailingSender);
        dispatch(
            &sender,
            Mail {
                to: "a@example.com".to_string(),
                from: "noreply@example.com".to_string(),
                subject: "hello".to_string(),
                text: "body".to_string(),
                html: None,
            },
        );
        // nothing to assert beyond "we did not panic or propagate"
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}
