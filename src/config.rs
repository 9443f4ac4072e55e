// config.rs
use std::env;

use dotenvy::dotenv;

pub const SANDBOX_GATEWAY_URL: &str = "https://apitest.authorize.net/xml/v1/request.api";
pub const PRODUCTION_GATEWAY_URL: &str = "https://api.authorize.net/xml/v1/request.api";

/// Credentials and environment selection for the card-payment gateway.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    pub api_login_id: String,
    pub transaction_key: String,
    pub environment: String,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        dotenv().ok();

        GatewayConfig {
            api_login_id: env::var("AUTHORIZE_NET_API_LOGIN_ID").unwrap_or_default(),
            transaction_key: env::var("AUTHORIZE_NET_TRANSACTION_KEY").unwrap_or_default(),
            environment: env::var("AUTHORIZE_NET_ENVIRONMENT")
                .unwrap_or_else(|_| "sandbox".to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn endpoint(&self) -> &'static str {
        if self.is_production() {
            PRODUCTION_GATEWAY_URL
        } else {
            SANDBOX_GATEWAY_URL
        }
    }

    /// Absence of either credential is the authoritative "not configured" signal.
    pub fn is_configured(&self) -> bool {
        !self.api_login_id.is_empty() && !self.transaction_key.is_empty()
    }
}

/// Credentials and sender numbers for the programmable-messaging provider.
#[derive(Debug, Clone, Default)]
pub struct MessagingConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub sms_from: String,
    pub whatsapp_from: Option<String>,
    pub default_country_code: String,
    pub currency_symbol: String,
}

impl MessagingConfig {
    pub fn from_env() -> Self {
        dotenv().ok();

        MessagingConfig {
            account_sid: env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            auth_token: env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            sms_from: env::var("TWILIO_SMS_FROM").unwrap_or_default(),
            whatsapp_from: env::var("TWILIO_WHATSAPP_FROM").ok().filter(|v| !v.is_empty()),
            default_country_code: env::var("DEFAULT_COUNTRY_CODE")
                .unwrap_or_else(|_| "91".to_string()),
            currency_symbol: env::var("CURRENCY_SYMBOL").unwrap_or_else(|_| "₹".to_string()),
        }
    }

    pub fn messages_url(&self) -> String {
        format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        )
    }

    /// The chat-channel sender falls back to the SMS sender when unset.
    pub fn whatsapp_sender(&self) -> &str {
        self.whatsapp_from.as_deref().unwrap_or(&self.sms_from)
    }

    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub messaging: MessagingConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = AppConfig {
            gateway: GatewayConfig::from_env(),
            messaging: MessagingConfig::from_env(),
        };

        tracing::info!(
            "Gateway environment: {} (configured: {})",
            config.gateway.environment,
            config.gateway.is_configured()
        );

        config
    }
}
