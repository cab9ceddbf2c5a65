//! Relay request and response models.
//!
//! Fee and value fields are `u128` carried as decimal strings on the wire so
//! that JSON clients without 128-bit integers round-trip them losslessly.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::HandlerError;
use crate::utils::serde::{deserialize_optional_u128, serialize_optional_u128};

/// Submission payload for a relay operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RelayRequest {
    /// Sender address the relayer submits from.
    pub address: String,
    pub chain_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(
        default,
        serialize_with = "serialize_optional_u128",
        deserialize_with = "deserialize_optional_u128",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub value: Option<u128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(
        default,
        serialize_with = "serialize_optional_u128",
        deserialize_with = "deserialize_optional_u128",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub max_fee_per_gas: Option<u128>,
    #[serde(
        default,
        serialize_with = "serialize_optional_u128",
        deserialize_with = "deserialize_optional_u128",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub max_priority_fee_per_gas: Option<u128>,
    /// Explicit nonce override. When absent the nonce manager assigns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    /// Client-supplied idempotency key. When absent a fresh id is generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
}

fn is_hex_address(s: &str) -> bool {
    s.len() == 42
        && s.starts_with("0x")
        && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}

fn is_hex_data(s: &str) -> bool {
    s.starts_with("0x")
        && s.len() % 2 == 0
        && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}

impl RelayRequest {
    pub fn validate(&self) -> Result<(), HandlerError> {
        if !is_hex_address(&self.address) {
            return Err(HandlerError::Validation(format!(
                "Invalid sender address: {}",
                self.address
            )));
        }
        if let Some(to) = &self.to {
            if !is_hex_address(to) {
                return Err(HandlerError::Validation(format!(
                    "Invalid destination address: {}",
                    to
                )));
            }
        }
        if let Some(data) = &self.data {
            if !is_hex_data(data) {
                return Err(HandlerError::Validation(
                    "Calldata must be 0x-prefixed hex with even length".to_string(),
                ));
            }
        }
        if self.chain_id == 0 {
            return Err(HandlerError::Validation(
                "chain_id must be non-zero".to_string(),
            ));
        }
        if self.to.is_none() && self.data.is_none() {
            return Err(HandlerError::Validation(
                "Request must carry a destination or calldata".to_string(),
            ));
        }
        if let Some(id) = &self.operation_id {
            if id.is_empty() || id.len() > 128 {
                return Err(HandlerError::Validation(
                    "operation_id must be 1-128 characters".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Outcome of a relay call, tagged by delivery stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RelayerResponse {
    /// Accepted and queued; the caller polls for the final outcome.
    Pending { operation_id: String },
    /// Broadcast to the network but not yet confirmed.
    Submitted {
        operation_id: String,
        transaction_hash: String,
        nonce: u64,
    },
    /// Mined and receipt checked.
    Confirmed {
        operation_id: String,
        transaction_hash: String,
        nonce: u64,
        block_number: u64,
    },
    /// Stateless submission: broadcast without a persisted operation record.
    Direct {
        transaction_hash: String,
        nonce: u64,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        operation_id: Option<String>,
        message: String,
        retriable: bool,
    },
}

/// Context a caller pins a submission to, used when matching receipts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TransactionContext {
    pub address: String,
    pub chain_id: u64,
    #[serde(default)]
    pub expected_events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReceiptLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TransactionReceiptData {
    pub transaction_hash: String,
    pub block_number: u64,
    pub success: bool,
    #[serde(default)]
    pub logs: Vec<ReceiptLog>,
}
