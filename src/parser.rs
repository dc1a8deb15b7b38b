//! Decode instructions back into semantic form.
//!
//! Used to describe an envelope in logs before it is handed to the signer, and
//! by callers (and tests) that need to inspect what a build produced. Anything
//! outside the System / Token / Associated Token Account / Memo / ComputeBudget
//! programs decodes to [`ParsedInstruction::Unknown`].

use crate::instructions::{
    decode_ata_instruction, decode_compute_budget_instruction, decode_system_instruction,
    decode_token_instruction, is_token_program, spl_key_to_pubkey, spl_option_to_pubkey,
    AssociatedTokenAccountInstruction, ComputeBudgetInstruction, SystemInstruction,
    TokenInstruction, ATA_PROGRAM, COMPUTE_BUDGET_PROGRAM, MEMO_PROGRAM, SYSTEM_PROGRAM,
};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::Transaction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedInstruction {
    // System Program
    CreateAccount {
        from: Pubkey,
        new_account: Pubkey,
        lamports: u64,
        space: u64,
        owner: Pubkey,
    },
    SystemTransfer {
        from: Pubkey,
        to: Pubkey,
        lamports: u64,
    },

    // Token Program
    InitializeMint {
        mint: Pubkey,
        decimals: u8,
        mint_authority: Pubkey,
        freeze_authority: Option<Pubkey>,
    },
    MintTo {
        mint: Pubkey,
        destination: Pubkey,
        authority: Pubkey,
        amount: u64,
    },
    TokenTransfer {
        source: Pubkey,
        destination: Pubkey,
        owner: Pubkey,
        amount: u64,
    },
    ApproveChecked {
        source: Pubkey,
        mint: Pubkey,
        delegate: Pubkey,
        owner: Pubkey,
        amount: u64,
        decimals: u8,
    },
    BurnChecked {
        account: Pubkey,
        mint: Pubkey,
        owner: Pubkey,
        amount: u64,
        decimals: u8,
    },

    // Associated Token Account Program
    CreateHoldingAccount {
        payer: Pubkey,
        holding: Pubkey,
        owner: Pubkey,
        mint: Pubkey,
        idempotent: bool,
    },

    Memo {
        memo: String,
    },
    SetComputeUnitPrice {
        micro_lamports: u64,
    },
    SetComputeUnitLimit {
        units: u32,
    },

    Unknown {
        program_id: Pubkey,
        accounts: Vec<AccountMeta>,
        data: Vec<u8>,
    },
}

impl ParsedInstruction {
    /// Short name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ParsedInstruction::CreateAccount { .. } => "createAccount",
            ParsedInstruction::SystemTransfer { .. } => "systemTransfer",
            ParsedInstruction::InitializeMint { .. } => "initializeMint",
            ParsedInstruction::MintTo { .. } => "mintTo",
            ParsedInstruction::TokenTransfer { .. } => "transfer",
            ParsedInstruction::ApproveChecked { .. } => "approveChecked",
            ParsedInstruction::BurnChecked { .. } => "burnChecked",
            ParsedInstruction::CreateHoldingAccount { .. } => "createHoldingAccount",
            ParsedInstruction::Memo { .. } => "memo",
            ParsedInstruction::SetComputeUnitPrice { .. } => "setComputeUnitPrice",
            ParsedInstruction::SetComputeUnitLimit { .. } => "setComputeUnitLimit",
            ParsedInstruction::Unknown { .. } => "unknown",
        }
    }
}

/// Decode every instruction of a legacy transaction, in order.
pub fn parse_transaction(tx: &Transaction) -> Vec<ParsedInstruction> {
    let message = &tx.message;
    message
        .instructions
        .iter()
        .map(|compiled| {
            let program_id = message
                .account_keys
                .get(compiled.program_id_index as usize)
                .copied()
                .unwrap_or_default();
            let accounts = compiled
                .accounts
                .iter()
                .filter_map(|&i| {
                    let index = i as usize;
                    message.account_keys.get(index).map(|key| AccountMeta {
                        pubkey: *key,
                        is_signer: index < message.header.num_required_signatures as usize,
                        is_writable: is_writable_index(message, index),
                    })
                })
                .collect();
            parse_instruction(&Instruction {
                program_id,
                accounts,
                data: compiled.data.clone(),
            })
        })
        .collect()
}

// Writable accounts come first within the signed and the unsigned sections.
fn is_writable_index(message: &Message, index: usize) -> bool {
    let header = &message.header;
    let num_signed = header.num_required_signatures as usize;
    if index < num_signed {
        index < num_signed.saturating_sub(header.num_readonly_signed_accounts as usize)
    } else {
        let num_unsigned = message.account_keys.len().saturating_sub(num_signed);
        index - num_signed
            < num_unsigned.saturating_sub(header.num_readonly_unsigned_accounts as usize)
    }
}

/// Human-readable kinds of a transaction's instructions, for logging.
pub fn describe(instructions: &[Instruction]) -> Vec<&'static str> {
    instructions.iter().map(|ix| parse_instruction(ix).kind()).collect()
}

/// Decode a single instruction.
pub fn parse_instruction(ix: &Instruction) -> ParsedInstruction {
    let keys: Vec<Pubkey> = ix.accounts.iter().map(|meta| meta.pubkey).collect();
    let parsed = match ix.program_id {
        id if id == SYSTEM_PROGRAM => parse_system(ix, &keys),
        id if is_token_program(&id) => parse_token(ix, &keys),
        id if id == ATA_PROGRAM => parse_ata(ix, &keys),
        id if id == MEMO_PROGRAM => std::str::from_utf8(&ix.data)
            .ok()
            .map(|memo| ParsedInstruction::Memo {
                memo: memo.to_string(),
            }),
        id if id == COMPUTE_BUDGET_PROGRAM => parse_compute_budget(ix),
        _ => None,
    };
    parsed.unwrap_or_else(|| make_unknown(ix))
}

fn parse_system(ix: &Instruction, keys: &[Pubkey]) -> Option<ParsedInstruction> {
    match decode_system_instruction(&ix.data).ok()? {
        SystemInstruction::CreateAccount {
            lamports,
            space,
            owner,
        } if keys.len() >= 2 => Some(ParsedInstruction::CreateAccount {
            from: keys[0],
            new_account: keys[1],
            lamports,
            space,
            owner,
        }),
        SystemInstruction::Transfer { lamports } if keys.len() >= 2 => {
            Some(ParsedInstruction::SystemTransfer {
                from: keys[0],
                to: keys[1],
                lamports,
            })
        }
        _ => None,
    }
}

fn parse_token(ix: &Instruction, keys: &[Pubkey]) -> Option<ParsedInstruction> {
    match decode_token_instruction(&ix.data).ok()? {
        // Accounts: [0] mint, [1] rent sysvar
        TokenInstruction::InitializeMint {
            decimals,
            mint_authority,
            freeze_authority,
        } if !keys.is_empty() => Some(ParsedInstruction::InitializeMint {
            mint: keys[0],
            decimals,
            mint_authority: spl_key_to_pubkey(&mint_authority),
            freeze_authority: spl_option_to_pubkey(&freeze_authority),
        }),
        // Accounts: [0] mint, [1] destination, [2] authority
        TokenInstruction::MintTo { amount } if keys.len() >= 3 => {
            Some(ParsedInstruction::MintTo {
                mint: keys[0],
                destination: keys[1],
                authority: keys[2],
                amount,
            })
        }
        // Accounts: [0] source, [1] destination, [2] owner
        TokenInstruction::Transfer { amount } if keys.len() >= 3 => {
            Some(ParsedInstruction::TokenTransfer {
                source: keys[0],
                destination: keys[1],
                owner: keys[2],
                amount,
            })
        }
        // Accounts: [0] source, [1] mint, [2] delegate, [3] owner
        TokenInstruction::ApproveChecked { amount, decimals } if keys.len() >= 4 => {
            Some(ParsedInstruction::ApproveChecked {
                source: keys[0],
                mint: keys[1],
                delegate: keys[2],
                owner: keys[3],
                amount,
                decimals,
            })
        }
        // Accounts: [0] account, [1] mint, [2] owner
        TokenInstruction::BurnChecked { amount, decimals } if keys.len() >= 3 => {
            Some(ParsedInstruction::BurnChecked {
                account: keys[0],
                mint: keys[1],
                owner: keys[2],
                amount,
                decimals,
            })
        }
        _ => None,
    }
}

fn parse_ata(ix: &Instruction, keys: &[Pubkey]) -> Option<ParsedInstruction> {
    // Accounts: [0] payer, [1] holding, [2] owner, [3] mint, [4] system, [5] token
    if keys.len() < 4 {
        return None;
    }
    let idempotent = match decode_ata_instruction(&ix.data).ok()? {
        AssociatedTokenAccountInstruction::Create => false,
        AssociatedTokenAccountInstruction::CreateIdempotent => true,
        _ => return None,
    };
    Some(ParsedInstruction::CreateHoldingAccount {
        payer: keys[0],
        holding: keys[1],
        owner: keys[2],
        mint: keys[3],
        idempotent,
    })
}

fn parse_compute_budget(ix: &Instruction) -> Option<ParsedInstruction> {
    match decode_compute_budget_instruction(&ix.data).ok()? {
        ComputeBudgetInstruction::SetComputeUnitPrice(micro_lamports) => {
            Some(ParsedInstruction::SetComputeUnitPrice { micro_lamports })
        }
        ComputeBudgetInstruction::SetComputeUnitLimit(units) => {
            Some(ParsedInstruction::SetComputeUnitLimit { units })
        }
        _ => None,
    }
}

fn make_unknown(ix: &Instruction) -> ParsedInstruction {
    ParsedInstruction::Unknown {
        program_id: ix.program_id,
        accounts: ix.accounts.clone(),
        data: ix.data.clone(),
    }
}
