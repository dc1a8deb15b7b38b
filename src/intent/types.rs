//! Types for intent-based instruction building.
//!
//! Intents arrive from a form layer as JSON tagged by `intentType`; addresses
//! stay as text until the builder validates them.

use crate::amount::TokenAmount;
use crate::error::{Result, TokenPipelineError};
use crate::keypair::Keypair;

use serde::{Deserialize, Serialize};
use solana_sdk::instruction::Instruction;

/// One user operation on a token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "intentType", rename_all = "camelCase")]
pub enum Intent {
    CreateToken(CreateTokenIntent),
    Transfer(TransferIntent),
    Delegate(DelegateIntent),
    Burn(BurnIntent),
    MintTo(MintToIntent),
    CreateHoldingAccount(CreateHoldingAccountIntent),
}

impl Intent {
    pub fn from_json(json: &str) -> Result<Intent> {
        serde_json::from_str(json)
            .map_err(|e| TokenPipelineError::validation(format!("Failed to parse intent: {}", e)))
    }

    pub fn from_value(value: serde_json::Value) -> Result<Intent> {
        serde_json::from_value(value)
            .map_err(|e| TokenPipelineError::validation(format!("Failed to parse intent: {}", e)))
    }

    /// The `intentType` discriminant.
    pub fn kind(&self) -> &'static str {
        match self {
            Intent::CreateToken(_) => "createToken",
            Intent::Transfer(_) => "transfer",
            Intent::Delegate(_) => "delegate",
            Intent::Burn(_) => "burn",
            Intent::MintTo(_) => "mintTo",
            Intent::CreateHoldingAccount(_) => "createHoldingAccount",
        }
    }

    pub fn memo(&self) -> Option<&str> {
        let memo = match self {
            Intent::CreateToken(i) => &i.memo,
            Intent::Transfer(i) => &i.memo,
            Intent::Delegate(i) => &i.memo,
            Intent::Burn(i) => &i.memo,
            Intent::MintTo(i) => &i.memo,
            Intent::CreateHoldingAccount(i) => &i.memo,
        };
        memo.as_deref().filter(|m| !m.is_empty())
    }
}

/// Create a mint, the owner's holding account for it, and an initial supply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenIntent {
    /// Display name. Validated but not written on-chain.
    pub name: String,
    pub symbol: String,
    pub amount: TokenAmount,
    pub decimals: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferIntent {
    /// Receiving wallet (not its holding account)
    pub receiver: String,
    pub token_address: String,
    pub amount: TokenAmount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegateIntent {
    pub token_address: String,
    pub delegate_address: String,
    pub amount: TokenAmount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnIntent {
    pub token_address: String,
    pub amount: TokenAmount,
    /// Falls back to the builder's default decimals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

/// Mint more supply of an existing token into the owner's holding account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintToIntent {
    pub token_address: String,
    pub amount: TokenAmount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHoldingAccountIntent {
    pub token_address: String,
    /// Wallet the holding account belongs to; the builder's owner when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

/// Purpose of a generated keypair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum KeypairPurpose {
    MintAccount,
}

/// A keypair generated during building. It must co-sign the transaction.
#[derive(Debug)]
pub struct GeneratedKeypair {
    pub purpose: KeypairPurpose,
    pub keypair: Keypair,
}

/// Result of building one intent.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// Ordered instructions; the order is load-bearing
    pub instructions: Vec<Instruction>,
    pub generated_keypairs: Vec<GeneratedKeypair>,
}

impl BuildResult {
    pub fn local_signers(&self) -> Vec<&Keypair> {
        self.generated_keypairs.iter().map(|g| &g.keypair).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transfer_intent() {
        let intent = Intent::from_value(serde_json::json!({
            "intentType": "transfer",
            "receiver": "FKjSjCqByQRwSzZoMXA7bKnDbJe41YgJTHFFzBeC42bH",
            "tokenAddress": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            "amount": "2"
        }))
        .unwrap();

        let Intent::Transfer(transfer) = &intent else {
            panic!("expected transfer, got {:?}", intent);
        };
        assert_eq!(transfer.amount.as_str(), "2");
        assert_eq!(intent.kind(), "transfer");
        assert_eq!(intent.memo(), None);
    }

    #[test]
    fn test_parse_create_token_numeric_amount() {
        let intent = Intent::from_json(
            r#"{"intentType":"createToken","name":"Gold","symbol":"GLD","amount":1000,"decimals":9,"memo":"hello"}"#,
        )
        .unwrap();

        let Intent::CreateToken(create) = &intent else {
            panic!("expected createToken");
        };
        assert_eq!(create.amount.as_str(), "1000");
        assert_eq!(create.decimals, 9);
        assert_eq!(intent.memo(), Some("hello"));
    }

    #[test]
    fn test_optional_fields_default() {
        let intent = Intent::from_value(serde_json::json!({
            "intentType": "burn",
            "tokenAddress": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            "amount": "0.5",
            "memo": ""
        }))
        .unwrap();

        let Intent::Burn(burn) = &intent else {
            panic!("expected burn");
        };
        assert_eq!(burn.decimals, None);
        assert_eq!(intent.memo(), None);
    }

    #[test]
    fn test_unknown_intent_type() {
        let err = Intent::from_json(r#"{"intentType":"stake","amount":"1"}"#).unwrap_err();
        assert!(matches!(err, TokenPipelineError::Validation(_)));
    }

    #[test]
    fn test_missing_field() {
        assert!(Intent::from_json(r#"{"intentType":"delegate","tokenAddress":"x"}"#).is_err());
    }

    #[test]
    fn test_serialize_uses_intent_type_tag() {
        let intent = Intent::CreateHoldingAccount(CreateHoldingAccountIntent {
            token_address: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string(),
            owner: None,
            memo: None,
        });
        let value = serde_json::to_value(&intent).unwrap();
        assert_eq!(value["intentType"], "createHoldingAccount");
        assert_eq!(value["tokenAddress"], "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
        assert!(value.get("owner").is_none());
    }
}
