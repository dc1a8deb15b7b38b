//! Intent → instruction building.
//!
//! Every builder validates its addresses and amounts before the first network
//! read, and only reads account existence and rent from the network. Nothing
//! here signs or broadcasts.

use crate::config::BuilderConfig;
use crate::error::{Result, TokenPipelineError};
use crate::instructions;
use crate::keypair::Keypair;
use crate::network::Network;
use crate::parser;
use crate::pubkey::parse_field;

use super::types::*;

use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_signer::Signer;
use tracing::debug;

/// Translates intents into ordered instruction lists for one owner wallet.
#[derive(Debug, Clone)]
pub struct InstructionBuilder {
    config: BuilderConfig,
}

impl InstructionBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        InstructionBuilder { config }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn owner(&self) -> Pubkey {
        self.config.owner
    }

    /// Build any intent. A CreateToken intent gets a freshly generated mint
    /// keypair, returned in [`BuildResult::generated_keypairs`].
    pub async fn build<N: Network + ?Sized>(
        &self,
        network: &N,
        intent: &Intent,
    ) -> Result<BuildResult> {
        let mut generated_keypairs = Vec::new();

        let mut instructions = match intent {
            Intent::CreateToken(create) => {
                let mint = Keypair::new();
                let instructions = self
                    .build_create_token(network, create, &mint.pubkey())
                    .await?;
                generated_keypairs.push(GeneratedKeypair {
                    purpose: KeypairPurpose::MintAccount,
                    keypair: mint,
                });
                instructions
            }
            Intent::Transfer(transfer) => self.build_transfer(network, transfer).await?,
            Intent::Delegate(delegate) => self.build_delegate(delegate)?,
            Intent::Burn(burn) => self.build_burn(burn)?,
            Intent::MintTo(mint_to) => self.build_mint_to(network, mint_to).await?,
            Intent::CreateHoldingAccount(create) => self.build_create_holding_account(create)?,
        };

        if let Some(memo) = intent.memo() {
            instructions.push(instructions::memo(memo));
        }

        debug!(
            intent = intent.kind(),
            instructions = ?parser::describe(&instructions),
            "Built intent"
        );

        Ok(BuildResult {
            instructions,
            generated_keypairs,
        })
    }

    /// CreateToken with a caller-chosen mint address.
    ///
    /// Emits allocate, initialize mint, create holding account, mint, in that order.
    pub async fn build_create_token<N: Network + ?Sized>(
        &self,
        network: &N,
        intent: &CreateTokenIntent,
        mint: &Pubkey,
    ) -> Result<Vec<Instruction>> {
        let owner = self.require_owner()?;
        validate_label("name", &intent.name)?;
        validate_label("symbol", &intent.symbol)?;
        let amount = intent.amount.to_base_units(intent.decimals)?;
        let holding = self.holding_address(&owner, mint)?;
        let token_program = self.config.token_program;

        let rent = network
            .get_minimum_balance_for_rent_exemption(instructions::MINT_SIZE)
            .await?;
        debug!(%mint, %holding, rent, amount, "Creating token");

        Ok(vec![
            instructions::create_mint_account(&owner, mint, rent, &token_program),
            instructions::initialize_mint(
                &token_program,
                mint,
                &owner,
                Some(&owner),
                intent.decimals,
            ),
            instructions::create_holding_account(&owner, &owner, mint, &token_program, true)?,
            instructions::mint_to(&token_program, mint, &holding, &owner, amount),
        ])
    }

    pub async fn build_transfer<N: Network + ?Sized>(
        &self,
        network: &N,
        intent: &TransferIntent,
    ) -> Result<Vec<Instruction>> {
        let owner = self.require_owner()?;
        let receiver = parse_field("receiver", &intent.receiver)?;
        let mint = parse_field("tokenAddress", &intent.token_address)?;
        let amount = intent.amount.to_base_units(self.config.default_decimals)?;
        let source = self.holding_address(&owner, &mint)?;
        let destination = self.holding_address(&receiver, &mint)?;
        let token_program = self.config.token_program;

        if !network.account_exists(&source).await? {
            return Err(TokenPipelineError::AccountNotFound(source));
        }

        let mut instructions = Vec::with_capacity(2);
        if !network.account_exists(&destination).await? {
            debug!(%receiver, %destination, "Receiver holding account missing, creating it");
            instructions.push(instructions::create_holding_account(
                &owner,
                &receiver,
                &mint,
                &token_program,
                false,
            )?);
        }
        instructions.push(instructions::transfer(
            &token_program,
            &source,
            &destination,
            &owner,
            amount,
        ));
        Ok(instructions)
    }

    pub fn build_delegate(&self, intent: &DelegateIntent) -> Result<Vec<Instruction>> {
        let owner = self.require_owner()?;
        let mint = parse_field("tokenAddress", &intent.token_address)?;
        let delegate = parse_field("delegateAddress", &intent.delegate_address)?;
        let decimals = self.config.default_decimals;
        let amount = intent.amount.to_base_units(decimals)?;
        let source = self.holding_address(&owner, &mint)?;

        Ok(vec![instructions::approve_checked(
            &self.config.token_program,
            &source,
            &mint,
            &delegate,
            &owner,
            amount,
            decimals,
        )])
    }

    pub fn build_burn(&self, intent: &BurnIntent) -> Result<Vec<Instruction>> {
        let owner = self.require_owner()?;
        let mint = parse_field("tokenAddress", &intent.token_address)?;
        let decimals = intent.decimals.unwrap_or(self.config.default_decimals);
        let amount = intent.amount.to_base_units(decimals)?;
        let holding = self.holding_address(&owner, &mint)?;

        Ok(vec![instructions::burn_checked(
            &self.config.token_program,
            &holding,
            &mint,
            &owner,
            amount,
            decimals,
        )])
    }

    pub async fn build_mint_to<N: Network + ?Sized>(
        &self,
        network: &N,
        intent: &MintToIntent,
    ) -> Result<Vec<Instruction>> {
        let owner = self.require_owner()?;
        let mint = parse_field("tokenAddress", &intent.token_address)?;
        let decimals = intent.decimals.unwrap_or(self.config.default_decimals);
        let amount = intent.amount.to_base_units(decimals)?;
        let holding = self.holding_address(&owner, &mint)?;
        let token_program = self.config.token_program;

        let mut instructions = Vec::with_capacity(2);
        if !network.account_exists(&holding).await? {
            instructions.push(instructions::create_holding_account(
                &owner,
                &owner,
                &mint,
                &token_program,
                true,
            )?);
        }
        instructions.push(instructions::mint_to(
            &token_program,
            &mint,
            &holding,
            &owner,
            amount,
        ));
        Ok(instructions)
    }

    pub fn build_create_holding_account(
        &self,
        intent: &CreateHoldingAccountIntent,
    ) -> Result<Vec<Instruction>> {
        let payer = self.require_owner()?;
        let mint = parse_field("tokenAddress", &intent.token_address)?;
        let owner = match &intent.owner {
            Some(owner) => parse_field("owner", owner)?,
            None => payer,
        };
        self.check_owner_curve(&owner)?;

        Ok(vec![instructions::create_holding_account(
            &payer,
            &owner,
            &mint,
            &self.config.token_program,
            true,
        )?])
    }

    /// Holding account of `owner` for `mint` under the configured token program.
    pub fn holding_address(&self, owner: &Pubkey, mint: &Pubkey) -> Result<Pubkey> {
        self.check_owner_curve(owner)?;
        Ok(instructions::derive_holding_address(
            owner,
            mint,
            &self.config.token_program,
        ))
    }

    fn check_owner_curve(&self, owner: &Pubkey) -> Result<()> {
        if !self.config.allow_owner_off_curve && !owner.is_on_curve() {
            return Err(TokenPipelineError::validation(format!(
                "Owner {} is off the ed25519 curve",
                owner
            )));
        }
        Ok(())
    }

    fn require_owner(&self) -> Result<Pubkey> {
        if self.config.owner == Pubkey::default() {
            return Err(TokenPipelineError::Config(
                "Builder owner is not set".to_string(),
            ));
        }
        Ok(self.config.owner)
    }
}

fn validate_label(field: &str, value: &str) -> Result<()> {
    if value.trim().chars().count() < 2 {
        return Err(TokenPipelineError::validation(format!(
            "Token {} must be at least 2 characters",
            field
        )));
    }
    Ok(())
}
