use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::Mailbox,
};
use std::sync::{Arc, Mutex};

use crate::errors::ApiError;

// 1. Mailer Contract

/// Mailer
///
/// Abstract contract for outbound email. The signup flow hands it the
/// subject, the rendered message containing the confirmation code, and the
/// recipient; delivery failures propagate to the caller as
/// [`ApiError::Delivery`] and are never folded into validation errors.
///
/// The trait exists so handlers can run against the SMTP client in
/// production and the in-memory mock in tests without changing shape.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, subject: &str, body: &str, to: &str) -> Result<(), ApiError>;
}

/// MailerState
///
/// The concrete type used to share the mailer across the application state.
pub type MailerState = Arc<dyn Mailer>;

// 2. The Real Implementation (SMTP relay)

/// SmtpMailer
///
/// Concrete implementation over an SMTP relay. Locally this points at a
/// mail catcher on port 1025; in production at a real relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(host: &str, port: u16, from: &str) -> Self {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .build();
        Self {
            transport,
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, subject: &str, body: &str, to: &str) -> Result<(), ApiError> {
        let from: Mailbox = self
            .from
            .parse()
            .map_err(|e| ApiError::Delivery(format!("bad sender address: {e}")))?;
        let to: Mailbox = to
            .parse()
            .map_err(|e| ApiError::Delivery(format!("bad recipient address: {e}")))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| ApiError::Delivery(format!("message build failed: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| ApiError::Delivery(format!("smtp send failed: {e}")))?;
        Ok(())
    }
}

// 3. The Mock Implementation (For Tests)

/// A message captured by [`MockMailer`].
#[derive(Debug, Clone)]
pub struct SentMail {
    pub subject: String,
    pub body: String,
    pub to: String,
}

/// MockMailer
///
/// Records every message instead of delivering it, so tests can pull the
/// confirmation code out of the rendered body. Can be switched into a
/// failing mode to exercise the delivery-error path.
#[derive(Default)]
pub struct MockMailer {
    sent: Mutex<Vec<SentMail>>,
    should_fail: bool,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            should_fail: true,
        }
    }

    /// All messages captured so far, oldest first.
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }

    /// Extracts the confirmation code from the most recent message, if any.
    pub fn last_code(&self) -> Option<i32> {
        let sent = self.sent.lock().expect("mailer mutex poisoned");
        let body = &sent.last()?.body;
        body.split_whitespace().find_map(|word| word.parse().ok())
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, subject: &str, body: &str, to: &str) -> Result<(), ApiError> {
        if self.should_fail {
            return Err(ApiError::Delivery("mock delivery failure".to_string()));
        }
        self.sent
            .lock()
            .expect("mailer mutex poisoned")
            .push(SentMail {
                subject: subject.to_string(),
                body: body.to_string(),
                to: to.to_string(),
            });
        Ok(())
    }
}
