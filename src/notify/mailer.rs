//! Mail transports for notification emails.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::errors::AppError;

/// One notification email to one recipient.
#[derive(Debug, Clone)]
pub struct NotificationEmail {
    pub to: String,
    pub user_name: Option<String>,
    pub title: String,
    pub message: String,
    /// Absolute when a base URL is configured, otherwise the in-app path
    pub link: Option<String>,
}

impl NotificationEmail {
    /// Plain-text body shared by every transport.
    pub fn body(&self) -> String {
        let greeting = match self.user_name.as_deref() {
            Some(name) if !name.trim().is_empty() => format!("Hello {},", name.trim()),
            _ => "Hello,".to_string(),
        };
        let mut body = format!("{}\n\n{}\n", greeting, self.message);
        if let Some(link) = &self.link {
            body.push_str(&format!("\nView details: {}\n", link));
        }
        body
    }
}

/// Delivers notification emails.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one email. Failures are returned, not retried.
    async fn send_notification_email(&self, email: &NotificationEmail) -> Result<(), AppError>;

    /// Transport name for logs (e.g. `"smtp"`).
    fn transport_name(&self) -> &str;
}

/// SMTP relay transport.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, from: &str) -> Result<Self, AppError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
            .port(config.port)
            .timeout(Some(std::time::Duration::from_secs(15)));

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_notification_email(&self, email: &NotificationEmail) -> Result<(), AppError> {
        let message = Message::builder()
            .from(self.from.parse()?)
            .to(email.to.parse()?)
            .subject(&email.title)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body())?;

        self.transport.send(message).await?;
        Ok(())
    }

    fn transport_name(&self) -> &str {
        "smtp"
    }
}

/// Transport used when no SMTP relay is configured: logs instead of sending.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_notification_email(&self, email: &NotificationEmail) -> Result<(), AppError> {
        tracing::info!(
            to = %email.to,
            subject = %email.title,
            "SMTP not configured, notification email logged only"
        );
        Ok(())
    }

    fn transport_name(&self) -> &str {
        "log"
    }
}
