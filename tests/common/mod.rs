#![allow(dead_code)]

use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_signature::Signature;
use solana_signer::Signer;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use token_pipeline::instructions::{derive_holding_address, MINT_SIZE, TOKEN_PROGRAM};
use token_pipeline::network::AccountInfo;
use token_pipeline::parser::{parse_instruction, parse_transaction, ParsedInstruction};
use token_pipeline::{
    ExpiryReference, Keypair, KeypairSigner, Network, Pubkey, Result, SignatureStatus, Transaction,
    TransactionExt, TransactionSigner, TokenPipelineError,
};

/// Blocks an expiry reference stays valid for.
pub const EXPIRY_WINDOW: u64 = 150;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountState {
    /// Allocated by the system program, not yet initialized
    Allocated { space: u64 },
    Mint {
        decimals: u8,
        mint_authority: Pubkey,
        supply: u64,
    },
    Holding {
        mint: Pubkey,
        owner: Pubkey,
        amount: u64,
        delegate: Option<(Pubkey, u64)>,
    },
}

#[derive(Debug, Clone)]
struct Account {
    lamports: u64,
    owner: Pubkey,
    state: AccountState,
}

#[derive(Default)]
struct Ledger {
    accounts: HashMap<Pubkey, Account>,
    block_height: u64,
    statuses: HashMap<Signature, SignatureStatus>,
    last_transaction: Option<Transaction>,
}

/// Scripted behavior for broadcast and confirmation.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Returned by the next broadcast instead of processing the transaction
    pub broadcast_error: Option<TokenPipelineError>,
    /// Accept transactions that fail simulation and report the failure as a status
    pub skip_preflight: bool,
    /// Landed transactions never show up in status queries
    pub never_confirm: bool,
    /// Status reported for landed transactions, `Confirmed` when unset
    pub landed_status: Option<SignatureStatus>,
    /// Added to the block height on every height read
    pub height_step: u64,
}

/// In-memory ledger implementing [`Network`].
///
/// Broadcast transactions are simulated against System / Token / Associated
/// Token Account semantics and applied atomically, so an instruction that runs
/// before its dependency fails the whole transaction.
pub struct MockNetwork {
    ledger: Mutex<Ledger>,
    script: Mutex<Script>,
    blockhash: Hash,
    broadcasts: AtomicUsize,
    expiry_fetches: AtomicUsize,
}

impl Default for MockNetwork {
    fn default() -> Self {
        MockNetwork::new()
    }
}

impl MockNetwork {
    pub fn new() -> Self {
        MockNetwork {
            ledger: Mutex::new(Ledger {
                block_height: 1_000,
                ..Ledger::default()
            }),
            script: Mutex::new(Script::default()),
            blockhash: Hash::new_from_array([42; 32]),
            broadcasts: AtomicUsize::new(0),
            expiry_fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_script(self, script: Script) -> Self {
        *self.script.lock().unwrap() = script;
        self
    }

    pub fn script(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.script.lock().unwrap());
    }

    pub fn rent(space: usize) -> u64 {
        (128 + space as u64) * 6_960
    }

    pub fn add_mint(&self, mint: &Pubkey, mint_authority: &Pubkey, decimals: u8) {
        self.insert(
            *mint,
            Account {
                lamports: Self::rent(MINT_SIZE),
                owner: TOKEN_PROGRAM,
                state: AccountState::Mint {
                    decimals,
                    mint_authority: *mint_authority,
                    supply: 0,
                },
            },
        );
    }

    /// Create `owner`'s holding account for `mint` with `amount` base units.
    pub fn add_holding(&self, owner: &Pubkey, mint: &Pubkey, amount: u64) -> Pubkey {
        let holding = derive_holding_address(owner, mint, &TOKEN_PROGRAM);
        let mut ledger = self.ledger.lock().unwrap();
        if let Some(Account {
            state: AccountState::Mint { supply, .. },
            ..
        }) = ledger.accounts.get_mut(mint)
        {
            *supply += amount;
        }
        ledger.accounts.insert(
            holding,
            Account {
                lamports: Self::rent(165),
                owner: TOKEN_PROGRAM,
                state: AccountState::Holding {
                    mint: *mint,
                    owner: *owner,
                    amount,
                    delegate: None,
                },
            },
        );
        holding
    }

    fn insert(&self, address: Pubkey, account: Account) {
        self.ledger.lock().unwrap().accounts.insert(address, account);
    }

    pub fn state(&self, address: &Pubkey) -> Option<AccountState> {
        self.ledger
            .lock()
            .unwrap()
            .accounts
            .get(address)
            .map(|a| a.state.clone())
    }

    pub fn balance(&self, holding: &Pubkey) -> Option<u64> {
        match self.state(holding)? {
            AccountState::Holding { amount, .. } => Some(amount),
            _ => None,
        }
    }

    pub fn set_block_height(&self, height: u64) {
        self.ledger.lock().unwrap().block_height = height;
    }

    pub fn block_height(&self) -> u64 {
        self.ledger.lock().unwrap().block_height
    }

    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.load(Ordering::SeqCst)
    }

    pub fn expiry_fetch_count(&self) -> usize {
        self.expiry_fetches.load(Ordering::SeqCst)
    }

    /// Addresses of every initialized mint.
    pub fn mints(&self) -> Vec<Pubkey> {
        self.ledger
            .lock()
            .unwrap()
            .accounts
            .iter()
            .filter(|(_, a)| matches!(a.state, AccountState::Mint { .. }))
            .map(|(address, _)| *address)
            .collect()
    }

    /// The most recent transaction that reached the ledger.
    pub fn last_transaction(&self) -> Option<Transaction> {
        self.ledger.lock().unwrap().last_transaction.clone()
    }

    pub fn account_count(&self) -> usize {
        self.ledger.lock().unwrap().accounts.len()
    }

    /// Run `instructions` against a copy of the ledger without committing.
    pub fn simulate(&self, instructions: &[Instruction]) -> std::result::Result<(), String> {
        let parsed: Vec<_> = instructions.iter().map(parse_instruction).collect();
        let ledger = self.ledger.lock().unwrap();
        apply_all(&ledger.accounts, &parsed).map(|_| ())
    }
}

fn apply_all(
    accounts: &HashMap<Pubkey, Account>,
    parsed: &[ParsedInstruction],
) -> std::result::Result<HashMap<Pubkey, Account>, String> {
    let mut working = accounts.clone();
    for (index, ix) in parsed.iter().enumerate() {
        apply(&mut working, ix)
            .map_err(|e| format!("Instruction {} ({}): {}", index, ix.kind(), e))?;
    }
    Ok(working)
}

type HoldingRefs<'a> = (&'a Pubkey, &'a Pubkey, &'a mut u64, &'a mut Option<(Pubkey, u64)>);

fn holding_mut<'a>(
    accounts: &'a mut HashMap<Pubkey, Account>,
    address: &Pubkey,
) -> std::result::Result<HoldingRefs<'a>, String> {
    match accounts.get_mut(address) {
        Some(Account {
            state:
                AccountState::Holding {
                    mint,
                    owner,
                    amount,
                    delegate,
                },
            ..
        }) => Ok((&*mint, &*owner, amount, delegate)),
        Some(_) => Err(format!("{} is not a token account", address)),
        None => Err(format!("token account {} not found", address)),
    }
}

fn mint_decimals(
    accounts: &HashMap<Pubkey, Account>,
    mint: &Pubkey,
) -> std::result::Result<(u8, Pubkey), String> {
    match accounts.get(mint) {
        Some(Account {
            state:
                AccountState::Mint {
                    decimals,
                    mint_authority,
                    ..
                },
            ..
        }) => Ok((*decimals, *mint_authority)),
        Some(_) => Err(format!("{} is not an initialized mint", mint)),
        None => Err(format!("mint {} not found", mint)),
    }
}

fn adjust_supply(accounts: &mut HashMap<Pubkey, Account>, mint: &Pubkey, delta: i128) {
    if let Some(Account {
        state: AccountState::Mint { supply, .. },
        ..
    }) = accounts.get_mut(mint)
    {
        *supply = (*supply as i128 + delta) as u64;
    }
}

fn apply(
    accounts: &mut HashMap<Pubkey, Account>,
    ix: &ParsedInstruction,
) -> std::result::Result<(), String> {
    match ix {
        ParsedInstruction::CreateAccount {
            new_account,
            lamports,
            space,
            owner,
            ..
        } => {
            if accounts.contains_key(new_account) {
                return Err(format!("account {} already in use", new_account));
            }
            if *lamports < MockNetwork::rent(*space as usize) {
                return Err("insufficient funds for rent".to_string());
            }
            accounts.insert(
                *new_account,
                Account {
                    lamports: *lamports,
                    owner: *owner,
                    state: AccountState::Allocated { space: *space },
                },
            );
        }
        ParsedInstruction::InitializeMint {
            mint,
            decimals,
            mint_authority,
            ..
        } => {
            let account = accounts
                .get_mut(mint)
                .ok_or_else(|| format!("mint {} not found", mint))?;
            match account.state {
                AccountState::Allocated { space } if space as usize == MINT_SIZE => {}
                AccountState::Allocated { .. } => return Err("invalid mint size".to_string()),
                _ => return Err(format!("{} already initialized", mint)),
            }
            if account.owner != TOKEN_PROGRAM {
                return Err("mint not owned by the token program".to_string());
            }
            account.state = AccountState::Mint {
                decimals: *decimals,
                mint_authority: *mint_authority,
                supply: 0,
            };
        }
        ParsedInstruction::CreateHoldingAccount {
            holding,
            owner,
            mint,
            idempotent,
            ..
        } => {
            mint_decimals(accounts, mint)?;
            if *holding != derive_holding_address(owner, mint, &TOKEN_PROGRAM) {
                return Err("holding address does not match derivation".to_string());
            }
            if accounts.contains_key(holding) {
                if *idempotent {
                    return Ok(());
                }
                return Err(format!("account {} already in use", holding));
            }
            accounts.insert(
                *holding,
                Account {
                    lamports: MockNetwork::rent(165),
                    owner: TOKEN_PROGRAM,
                    state: AccountState::Holding {
                        mint: *mint,
                        owner: *owner,
                        amount: 0,
                        delegate: None,
                    },
                },
            );
        }
        ParsedInstruction::MintTo {
            mint,
            destination,
            authority,
            amount,
        } => {
            let (_, mint_authority) = mint_decimals(accounts, mint)?;
            if mint_authority != *authority {
                return Err("owner does not match mint authority".to_string());
            }
            let (dest_mint, _, balance, _) = holding_mut(accounts, destination)?;
            if dest_mint != mint {
                return Err("mint mismatch".to_string());
            }
            *balance = balance.checked_add(*amount).ok_or("overflow")?;
            adjust_supply(accounts, mint, *amount as i128);
        }
        ParsedInstruction::TokenTransfer {
            source,
            destination,
            owner,
            amount,
        } => {
            let source_mint = {
                let (mint, holder, balance, delegate) = holding_mut(accounts, source)?;
                let mint = *mint;
                if holder != owner {
                    match delegate {
                        Some((d, allowance)) if d == owner && *allowance >= *amount => {
                            *allowance -= amount;
                        }
                        _ => return Err("owner does not match".to_string()),
                    }
                }
                if *balance < *amount {
                    return Err("insufficient funds".to_string());
                }
                *balance -= amount;
                mint
            };
            let (dest_mint, _, balance, _) = holding_mut(accounts, destination)?;
            if *dest_mint != source_mint {
                return Err("mint mismatch".to_string());
            }
            *balance += amount;
        }
        ParsedInstruction::ApproveChecked {
            source,
            mint,
            delegate,
            owner,
            amount,
            decimals,
        } => {
            let (mint_dec, _) = mint_decimals(accounts, mint)?;
            if mint_dec != *decimals {
                return Err("mint decimals mismatch".to_string());
            }
            let (source_mint, holder, _, current) = holding_mut(accounts, source)?;
            if source_mint != mint || holder != owner {
                return Err("owner does not match".to_string());
            }
            *current = Some((*delegate, *amount));
        }
        ParsedInstruction::BurnChecked {
            account,
            mint,
            owner,
            amount,
            decimals,
        } => {
            let (mint_dec, _) = mint_decimals(accounts, mint)?;
            if mint_dec != *decimals {
                return Err("mint decimals mismatch".to_string());
            }
            let (source_mint, holder, balance, _) = holding_mut(accounts, account)?;
            if source_mint != mint || holder != owner {
                return Err("owner does not match".to_string());
            }
            if *balance < *amount {
                return Err("insufficient funds".to_string());
            }
            *balance -= amount;
            adjust_supply(accounts, mint, -(*amount as i128));
        }
        ParsedInstruction::Memo { .. }
        | ParsedInstruction::SetComputeUnitPrice { .. }
        | ParsedInstruction::SetComputeUnitLimit { .. }
        | ParsedInstruction::SystemTransfer { .. } => {}
        ParsedInstruction::Unknown { program_id, .. } => {
            return Err(format!("unsupported program {}", program_id));
        }
    }
    Ok(())
}

#[async_trait]
impl Network for MockNetwork {
    async fn get_expiry_reference(&self) -> Result<ExpiryReference> {
        self.expiry_fetches.fetch_add(1, Ordering::SeqCst);
        let height = self.block_height();
        Ok(ExpiryReference {
            blockhash: self.blockhash,
            last_valid_block_height: height + EXPIRY_WINDOW,
        })
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountInfo>> {
        let ledger = self.ledger.lock().unwrap();
        Ok(ledger.accounts.get(address).map(|a| AccountInfo {
            lamports: a.lamports,
            owner: a.owner,
            data: vec![],
        }))
    }

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        Ok(Self::rent(data_len))
    }

    async fn broadcast(&self, signed_transaction: &[u8]) -> Result<Signature> {
        self.broadcasts.fetch_add(1, Ordering::SeqCst);
        let script = self.script.lock().unwrap().clone();
        if let Some(err) = script.broadcast_error {
            self.script.lock().unwrap().broadcast_error = None;
            return Err(err);
        }

        let tx = Transaction::from_bytes(signed_transaction)?;
        if tx.message.recent_blockhash != self.blockhash {
            return Err(TokenPipelineError::ChainRejected("Blockhash not found".to_string()));
        }
        let num_signers = tx.message.header.num_required_signatures as usize;
        for key in tx.message.account_keys.iter().take(num_signers) {
            if !tx.has_valid_signature(key) {
                return Err(TokenPipelineError::ChainRejected(format!(
                    "Transaction signature verification failure for {}",
                    key
                )));
            }
        }
        let signature = tx.signatures[0];

        let parsed = parse_transaction(&tx);
        let mut ledger = self.ledger.lock().unwrap();
        ledger.last_transaction = Some(tx);
        match apply_all(&ledger.accounts, &parsed) {
            Ok(accounts) => {
                ledger.accounts = accounts;
                if !script.never_confirm {
                    let status = script.landed_status.unwrap_or(SignatureStatus::Confirmed);
                    ledger.statuses.insert(signature, status);
                }
            }
            Err(err) if script.skip_preflight => {
                ledger.statuses.insert(signature, SignatureStatus::Failed(err));
            }
            Err(err) => {
                return Err(TokenPipelineError::ChainRejected(format!(
                    "Transaction simulation failed: {}",
                    err
                )));
            }
        }
        Ok(signature)
    }

    async fn get_signature_status(&self, signature: &Signature) -> Result<Option<SignatureStatus>> {
        Ok(self.ledger.lock().unwrap().statuses.get(signature).cloned())
    }

    async fn get_block_height(&self) -> Result<u64> {
        let step = self.script.lock().unwrap().height_step;
        let mut ledger = self.ledger.lock().unwrap();
        let height = ledger.block_height;
        ledger.block_height += step;
        Ok(height)
    }
}

/// Signs with a keypair and counts how often it was asked.
pub struct CountingSigner {
    inner: KeypairSigner,
    pubkey: Pubkey,
    calls: AtomicUsize,
}

impl CountingSigner {
    pub fn new(keypair: Keypair) -> Self {
        let pubkey = keypair.pubkey();
        CountingSigner {
            inner: KeypairSigner::new(keypair),
            pubkey,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionSigner for CountingSigner {
    fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    async fn sign_transaction(&self, transaction: Vec<u8>) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.sign_transaction(transaction).await
    }
}

/// A user who dismisses every signing prompt.
pub struct RejectingSigner {
    pub pubkey: Pubkey,
    calls: AtomicUsize,
}

impl RejectingSigner {
    pub fn new(pubkey: Pubkey) -> Self {
        RejectingSigner {
            pubkey,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionSigner for RejectingSigner {
    fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    async fn sign_transaction(&self, _transaction: Vec<u8>) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TokenPipelineError::SignerRejected(
            "User rejected the request".to_string(),
        ))
    }
}

/// Returns the bytes it was given, unsigned.
pub struct EchoSigner(pub Pubkey);

#[async_trait]
impl TransactionSigner for EchoSigner {
    fn pubkey(&self) -> Pubkey {
        self.0
    }

    async fn sign_transaction(&self, transaction: Vec<u8>) -> Result<Vec<u8>> {
        Ok(transaction)
    }
}
