//! Outbound SMS to store owners
//!
//! The gateway is a plain JSON-over-HTTP endpoint. Without `SMS_API_URL`
//! messages are only logged, which keeps development setups self-contained.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::Config;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, to: &str, text: &str) -> Result<(), BoxError>;
}

/// Strip formatting hyphens from a phone number ("010-1234-5678" -> "01012345678")
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| *c != '-').collect()
}

/// Sends through the HTTP gateway
pub struct HttpSmsSender {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpSmsSender {
    pub fn new(api_url: String, api_key: String, from: String) -> Result<Self, BoxError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            api_url,
            api_key,
            from,
        })
    }
}

#[async_trait]
impl SmsSender for HttpSmsSender {
    async fn send(&self, to: &str, text: &str) -> Result<(), BoxError> {
        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "from": self.from,
                "to": to,
                "text": text,
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("SMS gateway returned {status}: {body}").into());
        }
        Ok(())
    }
}

/// Logs instead of sending
pub struct LogSmsSender;

#[async_trait]
impl SmsSender for LogSmsSender {
    async fn send(&self, to: &str, text: &str) -> Result<(), BoxError> {
        tracing::info!(to = %to, text = %text, "SMS (gateway not configured)");
        Ok(())
    }
}

/// Pick the sender for this configuration
pub fn from_config(config: &Config) -> Result<std::sync::Arc<dyn SmsSender>, BoxError> {
    match &config.sms_api_url {
        Some(url) => Ok(std::sync::Arc::new(HttpSmsSender::new(
            url.clone(),
            config.sms_api_key.clone(),
            config.sms_from_number.clone(),
        )?)),
        None => {
            tracing::warn!("SMS_API_URL not set, SMS messages will only be logged");
            Ok(std::sync::Arc::new(LogSmsSender))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("010-1234-5678"), "01012345678");
        assert_eq!(normalize_phone("01012345678"), "01012345678");
    }

    #[tokio::test]
    async fn test_log_sender_never_fails() {
        LogSmsSender.send("01012345678", " - Bibimbap x2\n").await.unwrap();
    }
}
