//! Forecast e-mails and their delivery

use crate::config::EmailConfig;
use crate::error::{Result, ServiceError};
use crate::store::ForecastRecord;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::debug;

/// A composed forecast e-mail for one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastEmail {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

impl ForecastEmail {
    pub fn compose(to: &str, record: &ForecastRecord, public_url: &str) -> Self {
        let generated = record.date.format("%Y-%m-%d");
        let unsubscribe = format!("{}/unsubscribe?email={}", public_url.trim_end_matches('/'), to);

        let text_body = format!(
            "US Unemployment Rate Forecast\n\
             \n\
             Current UNRATE: {current:.2}% ({current_month})\n\
             \n\
             Forecast for {forecast_month}: {forecast:.2}%\n\
             \n\
             This forecast was generated using ARIMA model on {generated}.\n\
             \n\
             ---\n\
             To unsubscribe, visit: {unsubscribe}\n",
            current_month = record.current_month,
            current = record.current_value,
            forecast_month = record.forecast_month,
            forecast = record.forecast_value,
        );

        let html_body = format!(
            "<html>\n<body>\n\
             <h2>US Unemployment Rate Forecast</h2>\n\
             <p><strong>Current UNRATE:</strong> {current:.2}% ({current_month})</p>\n\
             <p><strong>Forecast for {forecast_month}:</strong> {forecast:.2}%</p>\n\
             <p><small>This forecast was generated using ARIMA model on {generated}.</small></p>\n\
             <hr>\n\
             <p><small>To unsubscribe, <a href=\"{unsubscribe}\">click here</a></small></p>\n\
             </body>\n</html>\n",
            current_month = record.current_month,
            current = record.current_value,
            forecast_month = record.forecast_month,
            forecast = record.forecast_value,
        );

        Self {
            to: to.to_string(),
            subject: format!("UNRATE Forecast: {}", record.forecast_month),
            text_body,
            html_body,
        }
    }
}

/// Delivers composed e-mails
pub trait Mailer: Send + Sync {
    fn send(&self, email: &ForecastEmail) -> Result<()>;
}

/// SMTP delivery over a STARTTLS relay
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &EmailConfig) -> Result<Self> {
        let (user, password) = match (&config.user, &config.password) {
            (Some(user), Some(password)) => (user.clone(), password.clone()),
            _ => {
                return Err(ServiceError::Configuration(
                    "Email credentials not configured".to_string(),
                ))
            }
        };

        let from_address = config.from.clone().unwrap_or_else(|| user.clone());
        let from: Mailbox = from_address.parse().map_err(|e| {
            ServiceError::Configuration(format!("Bad sender address '{}': {}", from_address, e))
        })?;

        let transport = SmtpTransport::starttls_relay(&config.host)
            .map_err(|e| ServiceError::Configuration(format!("SMTP relay {}: {}", config.host, e)))?
            .port(config.port)
            .credentials(Credentials::new(user, password))
            .build();

        Ok(Self { transport, from })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, email: &ForecastEmail) -> Result<()> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| ServiceError::InvalidEmail(format!("{}: {}", email.to, e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                email.text_body.clone(),
                email.html_body.clone(),
            ))
            .map_err(|e| ServiceError::Mail(e.to_string()))?;

        self.transport
            .send(&message)
            .map_err(|e| ServiceError::Mail(e.to_string()))?;
        debug!(to = %email.to, "Email sent");
        Ok(())
    }
}

/// Stand-in used when SMTP credentials are absent; every send fails
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredMailer;

impl Mailer for UnconfiguredMailer {
    fn send(&self, _email: &ForecastEmail) -> Result<()> {
        Err(ServiceError::Configuration(
            "Email credentials not configured".to_string(),
        ))
    }
}

/// SMTP mailer when credentials are present, otherwise one that reports the gap per send
pub fn mailer_from_config(config: &EmailConfig) -> Box<dyn Mailer> {
    match SmtpMailer::from_config(config) {
        Ok(mailer) => Box::new(mailer),
        Err(e) => {
            tracing::warn!(error = %e, "Email delivery disabled");
            Box::new(UnconfiguredMailer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ForecastRecord {
        ForecastRecord {
            date: "2025-08-04T09:15:00Z".parse().unwrap(),
            forecast_value: 4.3127,
            forecast_month: "2025-08".parse().unwrap(),
            current_value: 4.2,
            current_month: "2025-07".parse().unwrap(),
            model: "ARIMA(2,1,2)".to_string(),
            interval_95: None,
        }
    }

    #[test]
    fn test_compose() {
        let email = ForecastEmail::compose("a@b.com", &record(), "https://unrate.example.com/");
        assert_eq!(email.to, "a@b.com");
        assert_eq!(email.subject, "UNRATE Forecast: 2025-08");

        assert!(email.text_body.contains("Current UNRATE: 4.20% (2025-07)"));
        assert!(email.text_body.contains("Forecast for 2025-08: 4.31%"));
        assert!(email
            .html_body
            .contains("<strong>Forecast for 2025-08:</strong> 4.31%"));

        for body in [&email.text_body, &email.html_body] {
            assert!(body.contains("US Unemployment Rate Forecast"));
            assert!(body.contains("This forecast was generated using ARIMA model on 2025-08-04."));
            assert!(body.contains("(2025-07)"));
            assert!(body.contains("4.20%"));
            assert!(body.contains("4.31%"));
            assert!(body.contains("2025-08-04"));
            assert!(body.contains("https://unrate.example.com/unsubscribe?email=a@b.com"));
            assert!(!body.contains("09:15"));
        }
    }

    #[test]
    fn test_smtp_mailer_needs_credentials() {
        let config = EmailConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            user: Some("bot@example.com".to_string()),
            password: None,
            from: None,
        };
        assert!(matches!(
            SmtpMailer::from_config(&config),
            Err(ServiceError::Configuration(_))
        ));
    }

    #[test]
    fn test_unconfigured_mailer_fails_every_send() {
        let email = ForecastEmail::compose("a@b.com", &record(), "http://localhost:5000");
        let mailer = mailer_from_config(&EmailConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            user: None,
            password: None,
            from: None,
        });
        assert!(matches!(
            mailer.send(&email),
            Err(ServiceError::Configuration(_))
        ));
    }
}
