//! Payment-gateway client and multi-channel notification dispatcher for the
//! EduTrack school platform.
//!
//! Route handlers call in with plain parameters and get a fully-resolved
//! result back: nothing in this crate raises to its caller. Charges, refunds
//! and notification sends all fold configuration, transport, parse and
//! provider failures into their structured result types.

pub mod config;
pub mod errors;
pub mod services;

pub use config::{AppConfig, GatewayConfig, MessagingConfig};
pub use services::broadcast::{BroadcastSummary, BulkSendResult, Recipient, RecipientResult};
pub use services::gateway_service::{
    normalize_expiration_date, ChargeRequest, ChargeResult, GatewayService,
};
pub use services::notify_service::{
    format_to_e164, Channel, ChannelOutcome, NotificationResult, NotificationService,
    MAX_MESSAGE_LENGTH,
};
pub use services::templates::BRAND_NAME;
