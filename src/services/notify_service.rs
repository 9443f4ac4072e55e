// services/notify_service.rs
use base64::{engine::general_purpose::STANDARD as base64, Engine as _};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::MessagingConfig;

/// Channel tag the provider uses to address chat-channel traffic.
const WHATSAPP_TAG: &str = "whatsapp:";
/// Single-message ceiling enforced by the transport.
pub const MAX_MESSAGE_LENGTH: usize = 1600;
const NOT_CONFIGURED: &str = "Messaging provider not configured";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Whatsapp,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::Whatsapp => "whatsapp",
        }
    }
}

/// Outcome of one delivery attempt on one channel.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelOutcome {
    pub success: bool,
    pub channel: Channel,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl ChannelOutcome {
    fn sent(channel: Channel, message_id: String) -> Self {
        ChannelOutcome {
            success: true,
            channel,
            message_id: Some(message_id),
            error: None,
        }
    }

    fn failed(channel: Channel, error: impl Into<String>) -> Self {
        ChannelOutcome {
            success: false,
            channel,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// Combined result of the two independent delivery attempts.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationResult {
    pub sms: ChannelOutcome,
    pub whatsapp: ChannelOutcome,
}

impl NotificationResult {
    /// True when at least one channel got the message out.
    pub fn any_sent(&self) -> bool {
        self.sms.success || self.whatsapp.success
    }

    fn not_configured() -> Self {
        NotificationResult {
            sms: ChannelOutcome::failed(Channel::Sms, NOT_CONFIGURED),
            whatsapp: ChannelOutcome::failed(Channel::Whatsapp, NOT_CONFIGURED),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProviderMessageResponse {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorResponse {
    message: Option<String>,
}

/// Best-effort E.164 normalization of a human-entered phone number.
///
/// Strips separators, then decides how to apply the default country code:
/// already `+`-prefixed input passes through; a number already carrying the
/// country code gets a `+`; a trunk `0` is dropped in favor of the country
/// code; a bare 10-digit national number gets the country code; anything of
/// anomalous length just gets a `+`. Never fails.
pub fn format_to_e164(phone: &str, default_country_code: &str) -> String {
    let trimmed = phone.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    if trimmed.starts_with('+') {
        return format!("+{}", digits);
    }
    if digits.starts_with(default_country_code)
        && digits.len() == default_country_code.len() + 10
    {
        return format!("+{}", digits);
    }
    if let Some(rest) = digits.strip_prefix('0') {
        return format!("+{}{}", default_country_code, rest);
    }
    if digits.len() == 10 {
        return format!("+{}{}", default_country_code, digits);
    }
    format!("+{}", digits)
}

#[derive(Debug, Clone)]
pub struct NotificationService {
    config: MessagingConfig,
    client: Client,
    messages_url: String,
}

impl NotificationService {
    pub fn new(config: MessagingConfig) -> Self {
        let messages_url = config.messages_url();
        Self::with_messages_url(config, messages_url)
    }

    /// Construct against an explicit provider URL (stub servers in tests).
    pub fn with_messages_url(config: MessagingConfig, messages_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        NotificationService {
            config,
            client,
            messages_url: messages_url.into(),
        }
    }

    pub fn currency_symbol(&self) -> &str {
        &self.config.currency_symbol
    }

    fn basic_auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.config.account_sid, self.config.auth_token);
        format!("Basic {}", base64.encode(credentials))
    }

    /// Send one message to one recipient over both channels at once. The two
    /// attempts are independent: each resolves to its own outcome, and a
    /// failure on one never blocks or cancels the other.
    pub async fn send_notification(&self, phone: &str, body: &str) -> NotificationResult {
        if !self.config.is_configured() {
            warn!("Notification dropped: {}", NOT_CONFIGURED);
            return NotificationResult::not_configured();
        }

        let to = format_to_e164(phone, &self.config.default_country_code);
        info!("Dispatching notification to {} over sms and whatsapp", to);

        let whatsapp_from = format!("{}{}", WHATSAPP_TAG, self.config.whatsapp_sender());
        let whatsapp_to = format!("{}{}", WHATSAPP_TAG, to);

        let (sms, whatsapp) = tokio::join!(
            self.send_channel(Channel::Sms, &self.config.sms_from, &to, body),
            self.send_channel(Channel::Whatsapp, &whatsapp_from, &whatsapp_to, body),
        );

        NotificationResult { sms, whatsapp }
    }

    /// Single-channel WhatsApp send, used by the bulk fan-out.
    pub async fn send_whatsapp(&self, phone: &str, body: &str) -> ChannelOutcome {
        if !self.config.is_configured() {
            return ChannelOutcome::failed(Channel::Whatsapp, NOT_CONFIGURED);
        }

        let to = format!(
            "{}{}",
            WHATSAPP_TAG,
            format_to_e164(phone, &self.config.default_country_code)
        );
        let from = format!("{}{}", WHATSAPP_TAG, self.config.whatsapp_sender());
        self.send_channel(Channel::Whatsapp, &from, &to, body).await
    }

    async fn send_channel(
        &self,
        channel: Channel,
        from: &str,
        to: &str,
        body: &str,
    ) -> ChannelOutcome {
        let response = match self
            .client
            .post(&self.messages_url)
            .header(header::AUTHORIZATION, self.basic_auth_header())
            .form(&[("From", from), ("To", to), ("Body", body)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!("{} send to {} failed: {}", channel.as_str(), to, err);
                return ChannelOutcome::failed(channel, err.to_string());
            }
        };

        if response.status().is_success() {
            match response.json::<ProviderMessageResponse>().await {
                Ok(message) => ChannelOutcome::sent(channel, message.sid),
                Err(err) => {
                    warn!("{} response parse failed: {}", channel.as_str(), err);
                    ChannelOutcome::failed(channel, format!("Response parse failed: {}", err))
                }
            }
        } else {
            let status = response.status();
            let error = response
                .json::<ProviderErrorResponse>()
                .await
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("Provider returned {}", status));
            warn!("{} send to {} rejected: {}", channel.as_str(), to, error);
            ChannelOutcome::failed(channel, error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_national_number_gets_country_code() {
        assert_eq!(format_to_e164("9876543210", "91"), "+919876543210");
    }

    #[test]
    fn trunk_zero_is_dropped() {
        assert_eq!(format_to_e164("09876543210", "91"), "+919876543210");
    }

    #[test]
    fn already_prefixed_numbers_pass_through() {
        assert_eq!(format_to_e164("+919876543210", "91"), "+919876543210");
        assert_eq!(format_to_e164("919876543210", "91"), "+919876543210");
    }

    #[test]
    fn separators_are_stripped() {
        assert_eq!(format_to_e164("987-654-3210", "91"), "+919876543210");
        assert_eq!(format_to_e164("(987) 654.3210", "91"), "+919876543210");
        assert_eq!(format_to_e164("+91 98765 43210", "91"), "+919876543210");
    }

    #[test]
    fn anomalous_lengths_still_return_a_plus_string() {
        for raw in ["12345", "", "98-76", "987654321098765"] {
            let formatted = format_to_e164(raw, "91");
            assert!(formatted.starts_with('+'), "input {:?} gave {}", raw, formatted);
        }
    }

    #[test]
    fn national_number_starting_with_country_digits_is_not_double_prefixed() {
        // 10 digits that happen to begin with "91" are a bare national number.
        assert_eq!(format_to_e164("9198765432", "91"), "+919198765432");
    }

    #[tokio::test]
    async fn missing_credentials_fail_both_channels_without_io() {
        let service = NotificationService::new(MessagingConfig::default());
        let result = service.send_notification("9876543210", "hello").await;

        assert!(!result.sms.success);
        assert!(!result.whatsapp.success);
        assert!(!result.any_sent());
        assert_eq!(result.sms.error.as_deref(), Some(NOT_CONFIGURED));
        assert_eq!(result.whatsapp.error.as_deref(), Some(NOT_CONFIGURED));
    }
}
