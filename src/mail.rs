//! Delivery of verification codes
//!
//! Delivery is fire-and-forget for the auth flows: a failed send is logged by
//! the caller and never retried.

use crate::codes::CodePurpose;
use crate::config::SmtpConfig;
use crate::error::AuthError;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::time::Duration;

/// Outbound email collaborator
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, purpose: CodePurpose, code: &str) -> Result<(), AuthError>;
}

fn subject(purpose: CodePurpose) -> &'static str {
    match purpose {
        CodePurpose::EmailVerification => "[Blur] Email verification code",
        CodePurpose::PasswordReset => "[Blur] Password reset code",
    }
}

fn body(purpose: CodePurpose, code: &str) -> String {
    let action = match purpose {
        CodePurpose::EmailVerification => "finish signing up",
        CodePurpose::PasswordReset => "reset your password",
    };
    format!(
        "Your verification code is {}.\n\nEnter it in the next few minutes to {}. \
         If you did not request this, you can ignore this email.",
        code, action
    )
}

/// Writes codes to the log instead of sending them. Used when no SMTP relay
/// is configured.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, purpose: CodePurpose, code: &str) -> Result<(), AuthError> {
        tracing::info!(to, ?purpose, "Verification mail (not sent, no SMTP relay configured)");
        tracing::debug!(to, code, "Verification code");
        Ok(())
    }
}

/// Sends codes through an SMTP relay using STARTTLS
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, AuthError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| AuthError::Config(format!("invalid MAIL_FROM: {}", e)))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AuthError::Config(format!("invalid SMTP relay: {}", e)))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(Duration::from_secs(10)))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, purpose: CodePurpose, code: &str) -> Result<(), AuthError> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| AuthError::Mail(format!("invalid recipient: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject(purpose))
            .header(ContentType::TEXT_PLAIN)
            .body(body(purpose, code))
            .map_err(|e| AuthError::Mail(format!("failed to build message: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AuthError::Mail(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_contains_code() {
        let text = body(CodePurpose::PasswordReset, "042917");
        assert!(text.contains("042917"));
        assert!(text.contains("reset your password"));
    }

    #[test]
    fn test_subjects_differ_per_purpose() {
        assert_ne!(
            subject(CodePurpose::EmailVerification),
            subject(CodePurpose::PasswordReset)
        );
    }

    #[test]
    fn test_log_mailer_never_fails() {
        let sent = tokio_test::block_on(LogMailer.send(
            "a@x.com",
            CodePurpose::EmailVerification,
            "123456",
        ));
        assert!(sent.is_ok());
    }

    #[test]
    fn test_smtp_mailer_rejects_bad_sender() {
        let config = SmtpConfig {
            host: "smtp.example.com".into(),
            port: 587,
            username: "user".into(),
            password: "secret".into(),
            from: "not a mailbox".into(),
        };
        assert!(matches!(SmtpMailer::new(&config), Err(AuthError::Config(_))));
    }
}
