// services/gateway_service.rs
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::GatewayConfig;
use crate::errors::{AppError, Result};

/// Transaction response code the gateway uses for an approved transaction.
const APPROVED_RESPONSE_CODE: &str = "1";
/// Envelope result code for a successful API call.
const RESULT_CODE_OK: &str = "Ok";
/// Message code reported for transport-level failures.
const NETWORK_ERROR_CODE: &str = "E00001";
/// Sentinel expiration accepted by the gateway for refunds against a masked card.
const REFUND_EXPIRY_SENTINEL: &str = "XXXX";

// Request structs

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MerchantAuthentication {
    name: String,
    transaction_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreditCardDetails {
    card_number: String,
    expiration_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    card_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentDetails {
    credit_card: CreditCardDetails,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderDetails {
    invoice_number: String,
    description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CustomerDetails {
    email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BillTo {
    first_name: String,
    last_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionSetting {
    setting_name: &'static str,
    setting_value: &'static str,
}

#[derive(Debug, Serialize)]
struct TransactionSettings {
    setting: Vec<TransactionSetting>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionRequestDetails {
    transaction_type: &'static str,
    amount: String,
    payment: PaymentDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<OrderDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    customer: Option<CustomerDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bill_to: Option<BillTo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ref_trans_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transaction_settings: Option<TransactionSettings>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTransactionRequest {
    merchant_authentication: MerchantAuthentication,
    ref_id: String,
    transaction_request: TransactionRequestDetails,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTransactionEnvelope {
    create_transaction_request: CreateTransactionRequest,
}

// Response structs

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    code: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseMessages {
    result_code: String,
    #[serde(default)]
    message: Vec<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct TransactionMessage {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionError {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    error_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionResponsePayload {
    #[serde(default, deserialize_with = "code_as_string")]
    response_code: String,
    #[serde(default)]
    auth_code: String,
    #[serde(rename = "transId", default)]
    transaction_id: String,
    #[serde(default)]
    account_number: String,
    #[serde(default)]
    account_type: String,
    #[serde(default)]
    messages: Vec<TransactionMessage>,
    #[serde(default)]
    errors: Vec<TransactionError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GatewayResponse {
    transaction_response: Option<TransactionResponsePayload>,
    messages: ResponseMessages,
}

/// The gateway is inconsistent about typing: `responseCode` arrives as either
/// the string `"1"` or the integer `1`. Coerce to a string at the parse
/// boundary so the interpretation logic compares one canonical form.
fn code_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum CodeRepr {
        Str(String),
        Num(i64),
    }

    Ok(match CodeRepr::deserialize(deserializer)? {
        CodeRepr::Str(s) => s,
        CodeRepr::Num(n) => n.to_string(),
    })
}

/// Caller-supplied inputs for a card charge.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub card_number: String,
    pub expiration_date: String,
    pub cvv: String,
    pub amount: f64,
    pub order_id: String,
    pub description: String,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub invoice_number: Option<String>,
}

/// Fully-resolved outcome of a charge or refund. Callers branch on `success`;
/// nothing in this module raises.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeResult {
    pub success: bool,
    pub transaction_id: String,
    pub auth_code: String,
    pub response_code: String,
    pub message_code: String,
    pub message_text: String,
    pub account_number: String,
    pub account_type: String,
    pub ref_id: String,
    pub errors: Vec<String>,
}

impl ChargeResult {
    fn failure(ref_id: String, message_code: &str, message_text: String, errors: Vec<String>) -> Self {
        ChargeResult {
            success: false,
            transaction_id: String::new(),
            auth_code: String::new(),
            response_code: "0".to_string(),
            message_code: message_code.to_string(),
            message_text,
            account_number: String::new(),
            account_type: String::new(),
            ref_id,
            errors,
        }
    }
}

/// Normalize a card expiration date to the canonical `YYYY-MM` form the
/// gateway expects. Accepts MMYY, MMYYYY, MM/YY and MM/YYYY; anything already
/// canonical (or unrecognizable) passes through unchanged.
///
/// Two-digit years use a fixed pivot: 00-50 -> 20YY, 51-99 -> 19YY. The
/// boundary is a historical convention kept for compatibility, not a
/// permanent rule.
pub fn normalize_expiration_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains('-') {
        return trimmed.to_string();
    }

    let digits: String = trimmed.chars().filter(|c| *c != '/').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return trimmed.to_string();
    }

    match digits.len() {
        4 => {
            let month = &digits[..2];
            let yy: u32 = match digits[2..].parse() {
                Ok(v) => v,
                Err(_) => return trimmed.to_string(),
            };
            let year = if yy <= 50 { 2000 + yy } else { 1900 + yy };
            format!("{}-{}", year, month)
        }
        6 => format!("{}-{}", &digits[2..], &digits[..2]),
        _ => trimmed.to_string(),
    }
}

fn generate_ref_id() -> String {
    format!("ref_{}", Utc::now().timestamp_millis())
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// Collect error strings in order, dropping duplicates.
fn distinct(errors: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(errors.len());
    for err in errors {
        if !out.contains(&err) {
            out.push(err);
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct GatewayService {
    config: GatewayConfig,
    client: Client,
    endpoint: String,
}

impl GatewayService {
    pub fn new(config: GatewayConfig) -> Self {
        let endpoint = config.endpoint().to_string();
        Self::with_endpoint(config, endpoint)
    }

    /// Construct against an explicit endpoint (stub servers in tests).
    pub fn with_endpoint(config: GatewayConfig, endpoint: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        GatewayService {
            config,
            client,
            endpoint: endpoint.into(),
        }
    }

    fn merchant_authentication(&self) -> MerchantAuthentication {
        MerchantAuthentication {
            name: self.config.api_login_id.clone(),
            transaction_key: self.config.transaction_key.clone(),
        }
    }

    /// Charge a card. Always resolves to a `ChargeResult`; configuration,
    /// transport, parse and processor failures all come back as
    /// `success=false` with the failure detail in `errors`.
    pub async fn charge_card(&self, request: ChargeRequest) -> ChargeResult {
        let ref_id = generate_ref_id();

        if !self.config.is_configured() {
            warn!("Charge attempted without gateway credentials");
            return ChargeResult::failure(
                ref_id,
                NETWORK_ERROR_CODE,
                "Payment gateway not configured".to_string(),
                vec!["Payment gateway not configured".to_string()],
            );
        }

        info!(
            "Charging card for order {} ({} {})",
            request.order_id,
            format_amount(request.amount),
            ref_id
        );

        let envelope = self.build_charge_envelope(&request, &ref_id);
        match self.post_transaction(&envelope).await {
            Ok(response) => interpret_transaction_response(response, ref_id),
            Err(err) => {
                error!("Charge transport failure: {}", err);
                network_failure(err, ref_id)
            }
        }
    }

    /// Reverse a settled transaction. Only the last four digits of the card
    /// are available post-authorization; the gateway accepts the masked
    /// number with a sentinel expiration.
    pub async fn refund_transaction(
        &self,
        transaction_id: &str,
        amount: f64,
        last_four: &str,
    ) -> ChargeResult {
        let ref_id = generate_ref_id();

        if !self.config.is_configured() {
            warn!("Refund attempted without gateway credentials");
            return ChargeResult::failure(
                ref_id,
                NETWORK_ERROR_CODE,
                "Refund failed".to_string(),
                vec!["Payment gateway not configured".to_string()],
            );
        }

        info!("Refunding transaction {} ({})", transaction_id, ref_id);

        let envelope = CreateTransactionEnvelope {
            create_transaction_request: CreateTransactionRequest {
                merchant_authentication: self.merchant_authentication(),
                ref_id: ref_id.clone(),
                transaction_request: TransactionRequestDetails {
                    transaction_type: "refundTransaction",
                    amount: format_amount(amount),
                    payment: PaymentDetails {
                        credit_card: CreditCardDetails {
                            card_number: last_four.to_string(),
                            expiration_date: REFUND_EXPIRY_SENTINEL.to_string(),
                            card_code: None,
                        },
                    },
                    order: None,
                    customer: None,
                    bill_to: None,
                    ref_trans_id: Some(transaction_id.to_string()),
                    transaction_settings: None,
                },
            },
        };

        match self.post_transaction(&envelope).await {
            Ok(response) => interpret_transaction_response(response, ref_id),
            Err(err) => {
                error!("Refund transport failure: {}", err);
                ChargeResult::failure(
                    ref_id,
                    NETWORK_ERROR_CODE,
                    "Refund failed".to_string(),
                    vec![err.to_string()],
                )
            }
        }
    }

    /// Read-only transaction lookup. Returns the raw response body; found vs
    /// not-found interpretation is the caller's job. Lookup failures are
    /// non-fatal and surface as `None`.
    pub async fn get_transaction_details(&self, transaction_id: &str) -> Option<serde_json::Value> {
        if !self.config.is_configured() {
            warn!("Transaction lookup attempted without gateway credentials");
            return None;
        }

        let body = serde_json::json!({
            "getTransactionDetailsRequest": {
                "merchantAuthentication": self.merchant_authentication(),
                "transId": transaction_id,
            }
        });

        let response = match self.client.post(&self.endpoint).json(&body).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!("Transaction lookup failed for {}: {}", transaction_id, err);
                return None;
            }
        };

        match response.text().await {
            Ok(text) => match serde_json::from_str(text.trim_start_matches('\u{feff}')) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!("Transaction lookup parse failure for {}: {}", transaction_id, err);
                    None
                }
            },
            Err(err) => {
                warn!("Transaction lookup body read failure for {}: {}", transaction_id, err);
                None
            }
        }
    }

    fn build_charge_envelope(&self, request: &ChargeRequest, ref_id: &str) -> CreateTransactionEnvelope {
        let card_number: String = request.card_number.split_whitespace().collect();
        let invoice_number = request
            .invoice_number
            .clone()
            .unwrap_or_else(|| truncate_chars(&request.order_id, 20));

        // No billing-name block at all when the caller has no name for us.
        let bill_to = request
            .customer_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| match name.split_once(' ') {
                Some((first, last)) => BillTo {
                    first_name: first.to_string(),
                    last_name: last.to_string(),
                },
                None => BillTo {
                    first_name: name.to_string(),
                    last_name: String::new(),
                },
            });

        CreateTransactionEnvelope {
            create_transaction_request: CreateTransactionRequest {
                merchant_authentication: self.merchant_authentication(),
                ref_id: ref_id.to_string(),
                transaction_request: TransactionRequestDetails {
                    transaction_type: "authCaptureTransaction",
                    amount: format_amount(request.amount),
                    payment: PaymentDetails {
                        credit_card: CreditCardDetails {
                            card_number,
                            expiration_date: normalize_expiration_date(&request.expiration_date),
                            card_code: Some(request.cvv.clone()),
                        },
                    },
                    order: Some(OrderDetails {
                        invoice_number,
                        description: truncate_chars(&request.description, 255),
                    }),
                    customer: Some(CustomerDetails {
                        email: request.customer_email.clone(),
                    }),
                    bill_to,
                    ref_trans_id: None,
                    // The platform sends its own receipts, and resubmits within
                    // two minutes are rejected as duplicates.
                    transaction_settings: Some(TransactionSettings {
                        setting: vec![
                            TransactionSetting {
                                setting_name: "duplicateWindow",
                                setting_value: "120",
                            },
                            TransactionSetting {
                                setting_name: "emailCustomer",
                                setting_value: "false",
                            },
                        ],
                    }),
                },
            },
        }
    }

    async fn post_transaction(
        &self,
        envelope: &CreateTransactionEnvelope,
    ) -> Result<GatewayResponse> {
        let response = self.client.post(&self.endpoint).json(envelope).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Gateway returned {}: {}", status, body);
            return Err(AppError::gateway(format!("Gateway returned {}", status)));
        }

        // The gateway prefixes its JSON bodies with a UTF-8 BOM.
        let text = response.text().await?;
        let parsed = serde_json::from_str(text.trim_start_matches('\u{feff}'))?;
        Ok(parsed)
    }
}

fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}

fn network_failure(err: AppError, ref_id: String) -> ChargeResult {
    let mut message = err.to_string();
    if message.is_empty() {
        message = "Network error occurred".to_string();
    }
    ChargeResult::failure(ref_id, NETWORK_ERROR_CODE, message.clone(), vec![message])
}

/// Success requires both the envelope's Ok result code and the transaction's
/// approved response code. An approved transaction code inside an Error
/// envelope (a duplicate-submission rejection, for one) is a failure.
fn interpret_transaction_response(response: GatewayResponse, ref_id: String) -> ChargeResult {
    let envelope_ok = response.messages.result_code == RESULT_CODE_OK;
    let envelope_message = response.messages.message.first();

    match response.transaction_response {
        Some(tx) => {
            let approved = tx.response_code == APPROVED_RESPONSE_CODE;
            if envelope_ok && approved {
                let message = tx.messages.first();
                ChargeResult {
                    success: true,
                    transaction_id: tx.transaction_id,
                    auth_code: tx.auth_code,
                    response_code: tx.response_code,
                    message_code: message
                        .map(|m| m.code.clone())
                        .unwrap_or_else(|| APPROVED_RESPONSE_CODE.to_string()),
                    message_text: message
                        .map(|m| m.description.clone())
                        .unwrap_or_else(|| "This transaction has been approved.".to_string()),
                    account_number: tx.account_number,
                    account_type: tx.account_type,
                    ref_id,
                    errors: Vec::new(),
                }
            } else {
                let mut errors: Vec<String> =
                    tx.errors.iter().map(|e| e.error_text.clone()).collect();
                let mut message_code = tx
                    .errors
                    .first()
                    .map(|e| e.error_code.clone())
                    .unwrap_or_default();
                let mut message_text = tx
                    .errors
                    .first()
                    .map(|e| e.error_text.clone())
                    .unwrap_or_default();

                // Pre-validation rejections carry no transaction-level error
                // list; fall back to the envelope's own messages.
                if message_text.is_empty() {
                    if let Some(m) = envelope_message {
                        message_code = m.code.clone();
                        message_text = m.text.clone();
                        errors.push(m.text.clone());
                    } else {
                        message_text = "Transaction failed".to_string();
                    }
                }

                ChargeResult {
                    success: false,
                    transaction_id: tx.transaction_id,
                    auth_code: tx.auth_code,
                    response_code: tx.response_code,
                    message_code,
                    message_text,
                    account_number: tx.account_number,
                    account_type: tx.account_type,
                    ref_id,
                    errors: distinct(errors),
                }
            }
        }
        None => {
            let message_code = envelope_message.map(|m| m.code.clone()).unwrap_or_default();
            let message_text = envelope_message
                .map(|m| m.text.clone())
                .unwrap_or_else(|| "Transaction failed".to_string());
            let errors = distinct(
                response
                    .messages
                    .message
                    .iter()
                    .map(|m| m.text.clone())
                    .collect(),
            );
            ChargeResult::failure(ref_id, &message_code, message_text, errors)
        }
    }
}
