use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The call itself reverted, e.g. a standard ERC-20 refusing an overdraft.
    #[error("reverted: {0}")]
    Reverted(String),
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// The router refused the swap and rolled its own state back.
    #[error("{0}")]
    Rejected(String),
    #[error("router unavailable: {0}")]
    Unavailable(String),
}

/// ERC-20 semantics over an arbitrary token set.
///
/// `approve`, `transfer` and `transfer_from` report a boolean like the token contract does.
/// Non-conforming tokens may answer `false` instead of reverting, or `true` without moving
/// anything; callers verify balances instead of trusting the flag.
#[async_trait]
pub trait TokenLedger: Send + Sync {
    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, LedgerError>;

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256, LedgerError>;

    async fn approve(&self, token: Address, owner: Address, spender: Address, amount: U256) -> Result<bool, LedgerError>;

    async fn transfer(&self, token: Address, from: Address, to: Address, amount: U256) -> Result<bool, LedgerError>;

    /// `spender` moves `amount` from `from` to `to` against the allowance `from` granted it.
    async fn transfer_from(
        &self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<bool, LedgerError>;
}

/// `swapExactTokensForTokens` of a Uniswap V2 style router.
#[async_trait]
pub trait VenueRouter: Send + Sync {
    /// Swap exactly `amount_in` of `path[0]` held by `sender` (who approved `router`) and
    /// deliver at least `amount_out_min` of the last path token to `to`. Returns the amount
    /// at every hop, the last one being the delivered output.
    #[allow(clippy::too_many_arguments)]
    async fn swap_exact_tokens_for_tokens(
        &self,
        router: Address,
        sender: Address,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
    ) -> Result<Vec<U256>, RouterError>;
}

/// Handle to an open atomic section.
pub type Checkpoint = u64;

/// All-or-nothing execution. Everything between `begin` and `commit` is discarded by
/// `rollback`; only one section is open at a time.
#[async_trait]
pub trait AtomicSection: Send + Sync {
    async fn begin(&self) -> Result<Checkpoint, LedgerError>;

    /// Returns the id of the committed transaction.
    async fn commit(&self, checkpoint: Checkpoint) -> Result<B256, LedgerError>;

    async fn rollback(&self, checkpoint: Checkpoint) -> Result<(), LedgerError>;
}

/// Everything a swap touches.
pub trait SwapSubstrate: TokenLedger + VenueRouter + AtomicSection {}

impl<T: TokenLedger + VenueRouter + AtomicSection + ?Sized> SwapSubstrate for T {}
