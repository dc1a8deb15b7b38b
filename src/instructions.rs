//! Instruction constructors and decoders for the programs a token operation touches.
//!
//! Constructors build `solana_sdk` instructions directly; instruction data for the
//! token and associated-account programs comes from the official `spl-token` and
//! `spl-associated-token-account` crates:
//! - `solana-system-interface` for System program
//! - `spl-token` for Token program
//! - `spl-associated-token-account` for the Associated Token Account program
//! - `solana-compute-budget-interface` for ComputeBudget program

use crate::error::{Result, TokenPipelineError};

use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_system_interface::instruction as system_ix;
use spl_token::solana_program::program_option::COption;
use spl_token::solana_program::program_pack::Pack;

pub use solana_compute_budget_interface::ComputeBudgetInstruction;
pub use solana_system_interface::instruction::SystemInstruction;
pub use spl_associated_token_account::instruction::AssociatedTokenAccountInstruction;
pub use spl_token::instruction::TokenInstruction;

/// Program IDs as base58 strings
pub const SYSTEM_PROGRAM_ID: &str = "11111111111111111111111111111111";
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const TOKEN_2022_PROGRAM_ID: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";
pub const ATA_PROGRAM_ID: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";
pub const MEMO_PROGRAM_ID: &str = "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr";
pub const COMPUTE_BUDGET_PROGRAM_ID: &str = "ComputeBudget111111111111111111111111111111";
pub const SYSVAR_RENT_ID: &str = "SysvarRent111111111111111111111111111111111";

pub const SYSTEM_PROGRAM: Pubkey = Pubkey::from_str_const(SYSTEM_PROGRAM_ID);
pub const TOKEN_PROGRAM: Pubkey = Pubkey::from_str_const(TOKEN_PROGRAM_ID);
pub const TOKEN_2022_PROGRAM: Pubkey = Pubkey::from_str_const(TOKEN_2022_PROGRAM_ID);
pub const ATA_PROGRAM: Pubkey = Pubkey::from_str_const(ATA_PROGRAM_ID);
pub const MEMO_PROGRAM: Pubkey = Pubkey::from_str_const(MEMO_PROGRAM_ID);
pub const COMPUTE_BUDGET_PROGRAM: Pubkey = Pubkey::from_str_const(COMPUTE_BUDGET_PROGRAM_ID);
pub const SYSVAR_RENT: Pubkey = Pubkey::from_str_const(SYSVAR_RENT_ID);

/// Size of a token mint account.
pub const MINT_SIZE: usize = <spl_token::state::Mint as Pack>::LEN;

// spl-token is built against the 2.x program types; keys cross over as raw bytes.
type SplPubkey = spl_token::solana_program::pubkey::Pubkey;

fn to_spl(key: &Pubkey) -> SplPubkey {
    SplPubkey::new_from_array(key.to_bytes())
}

fn from_spl(key: &SplPubkey) -> Pubkey {
    Pubkey::new_from_array(key.to_bytes())
}

/// Derive the associated holding account of `owner` for `mint`.
///
/// Seeds are `[owner, token_program, mint]` under the Associated Token Account program.
pub fn derive_holding_address(owner: &Pubkey, mint: &Pubkey, token_program: &Pubkey) -> Pubkey {
    let seeds = &[owner.as_ref(), token_program.as_ref(), mint.as_ref()];
    let (address, _bump) = Pubkey::find_program_address(seeds, &ATA_PROGRAM);
    address
}

/// Allocate a rent-exempt account sized for a mint, owned by the token program.
pub fn create_mint_account(
    payer: &Pubkey,
    mint: &Pubkey,
    lamports: u64,
    token_program: &Pubkey,
) -> Instruction {
    system_ix::create_account(payer, mint, lamports, MINT_SIZE as u64, token_program)
}

pub fn initialize_mint(
    token_program: &Pubkey,
    mint: &Pubkey,
    mint_authority: &Pubkey,
    freeze_authority: Option<&Pubkey>,
    decimals: u8,
) -> Instruction {
    let data = TokenInstruction::InitializeMint {
        decimals,
        mint_authority: to_spl(mint_authority),
        freeze_authority: match freeze_authority {
            Some(key) => COption::Some(to_spl(key)),
            None => COption::None,
        },
    }
    .pack();

    Instruction::new_with_bytes(
        *token_program,
        &data,
        vec![
            AccountMeta::new(*mint, false),
            AccountMeta::new_readonly(SYSVAR_RENT, false),
        ],
    )
}

/// Create the associated holding account of `owner` for `mint`, funded by `payer`.
///
/// The idempotent variant succeeds when the account already exists.
pub fn create_holding_account(
    payer: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
    token_program: &Pubkey,
    idempotent: bool,
) -> Result<Instruction> {
    let holding = derive_holding_address(owner, mint, token_program);
    let kind = if idempotent {
        AssociatedTokenAccountInstruction::CreateIdempotent
    } else {
        AssociatedTokenAccountInstruction::Create
    };
    let data = borsh::to_vec(&kind).map_err(|e| {
        TokenPipelineError::Serialization(format!("Failed to encode ATA instruction: {}", e))
    })?;

    Ok(Instruction::new_with_bytes(
        ATA_PROGRAM,
        &data,
        vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(holding, false),
            AccountMeta::new_readonly(*owner, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM, false),
            AccountMeta::new_readonly(*token_program, false),
        ],
    ))
}

pub fn mint_to(
    token_program: &Pubkey,
    mint: &Pubkey,
    destination: &Pubkey,
    authority: &Pubkey,
    amount: u64,
) -> Instruction {
    let data = TokenInstruction::MintTo { amount }.pack();
    Instruction::new_with_bytes(
        *token_program,
        &data,
        vec![
            AccountMeta::new(*mint, false),
            AccountMeta::new(*destination, false),
            AccountMeta::new_readonly(*authority, true),
        ],
    )
}

pub fn transfer(
    token_program: &Pubkey,
    source: &Pubkey,
    destination: &Pubkey,
    owner: &Pubkey,
    amount: u64,
) -> Instruction {
    let data = TokenInstruction::Transfer { amount }.pack();
    Instruction::new_with_bytes(
        *token_program,
        &data,
        vec![
            AccountMeta::new(*source, false),
            AccountMeta::new(*destination, false),
            AccountMeta::new_readonly(*owner, true),
        ],
    )
}

/// Approve `delegate` to move up to `amount` base units out of `source`.
pub fn approve_checked(
    token_program: &Pubkey,
    source: &Pubkey,
    mint: &Pubkey,
    delegate: &Pubkey,
    owner: &Pubkey,
    amount: u64,
    decimals: u8,
) -> Instruction {
    let data = TokenInstruction::ApproveChecked { amount, decimals }.pack();
    Instruction::new_with_bytes(
        *token_program,
        &data,
        vec![
            AccountMeta::new(*source, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(*delegate, false),
            AccountMeta::new_readonly(*owner, true),
        ],
    )
}

pub fn burn_checked(
    token_program: &Pubkey,
    account: &Pubkey,
    mint: &Pubkey,
    owner: &Pubkey,
    amount: u64,
    decimals: u8,
) -> Instruction {
    let data = TokenInstruction::BurnChecked { amount, decimals }.pack();
    Instruction::new_with_bytes(
        *token_program,
        &data,
        vec![
            AccountMeta::new(*account, false),
            AccountMeta::new(*mint, false),
            AccountMeta::new_readonly(*owner, true),
        ],
    )
}

pub fn memo(message: &str) -> Instruction {
    Instruction::new_with_bytes(MEMO_PROGRAM, message.as_bytes(), vec![])
}

pub fn set_compute_unit_price(micro_lamports: u64) -> Instruction {
    ComputeBudgetInstruction::set_compute_unit_price(micro_lamports)
}

/// Decode a System program instruction from raw bytes.
pub fn decode_system_instruction(data: &[u8]) -> Result<SystemInstruction> {
    bincode::deserialize(data).map_err(|e| {
        TokenPipelineError::Serialization(format!("Failed to decode System instruction: {}", e))
    })
}

/// Decode a Token program instruction from raw bytes.
pub fn decode_token_instruction(data: &[u8]) -> Result<TokenInstruction<'_>> {
    TokenInstruction::unpack(data).map_err(|e| {
        TokenPipelineError::Serialization(format!("Failed to decode Token instruction: {}", e))
    })
}

/// Decode an Associated Token Account program instruction.
///
/// Empty data is the legacy encoding of `Create`.
pub fn decode_ata_instruction(data: &[u8]) -> Result<AssociatedTokenAccountInstruction> {
    use borsh::BorshDeserialize;
    if data.is_empty() {
        return Ok(AssociatedTokenAccountInstruction::Create);
    }
    AssociatedTokenAccountInstruction::try_from_slice(data).map_err(|e| {
        TokenPipelineError::Serialization(format!("Failed to decode ATA instruction: {}", e))
    })
}

/// Decode a ComputeBudget program instruction from raw bytes.
pub fn decode_compute_budget_instruction(data: &[u8]) -> Result<ComputeBudgetInstruction> {
    use borsh::BorshDeserialize;
    ComputeBudgetInstruction::try_from_slice(data).map_err(|e| {
        TokenPipelineError::Serialization(format!(
            "Failed to decode ComputeBudget instruction: {}",
            e
        ))
    })
}

pub(crate) fn spl_key_to_pubkey(key: &SplPubkey) -> Pubkey {
    from_spl(key)
}

pub(crate) fn spl_option_to_pubkey(key: &COption<SplPubkey>) -> Option<Pubkey> {
    match key {
        COption::Some(k) => Some(from_spl(k)),
        COption::None => None,
    }
}

pub fn is_token_program(program_id: &Pubkey) -> bool {
    *program_id == TOKEN_PROGRAM || *program_id == TOKEN_2022_PROGRAM
}
