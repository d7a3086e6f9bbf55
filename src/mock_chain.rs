use crate::data_sync::venue_source::unix_now;
use crate::data_sync::{Reserves, VenueError, VenueSource};
use crate::execution::ledger::{AtomicSection, Checkpoint, LedgerError, RouterError, TokenLedger, VenueRouter};
use crate::logic::pricing::{PricingEngine, PricingError};
use crate::logic::resolver::sort_tokens;
use alloy_primitives::{Address, B256, U256, keccak256};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

/// How a token contract answers a transfer it cannot or will not make.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TokenBehavior {
    /// Reverts on insufficient balance or allowance.
    #[default]
    Standard,
    /// Returns `false` instead of reverting.
    ReturnsFalse,
    /// Returns `true` from `transfer`/`transferFrom` without moving anything.
    SilentNoop,
    /// `approve` returns `false` and leaves the allowance alone.
    RejectsApprovals,
}

#[derive(Clone, Debug)]
struct MockPair {
    token0: Address,
    token1: Address,
    block_timestamp_last: u32,
}

#[derive(Clone, Debug, Default)]
struct ChainState {
    /// (token, owner)
    balances: HashMap<(Address, Address), U256>,
    /// (token, owner, spender)
    allowances: HashMap<(Address, Address, Address), U256>,
    pairs: HashMap<Address, MockPair>,
    /// (factory, lower token, higher token) -> pair
    pair_index: HashMap<(Address, Address, Address), Address>,
    /// router -> factory it swaps through
    routers: HashMap<Address, Address>,
    behaviors: HashMap<Address, TokenBehavior>,
}

impl ChainState {
    fn balance(&self, token: Address, owner: Address) -> U256 {
        self.balances.get(&(token, owner)).copied().unwrap_or_default()
    }

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.allowances.get(&(token, owner, spender)).copied().unwrap_or_default()
    }

    fn behavior(&self, token: Address) -> TokenBehavior {
        self.behaviors.get(&token).copied().unwrap_or_default()
    }

    fn refuse(&self, token: Address, reason: &str) -> Result<bool, String> {
        match self.behavior(token) {
            TokenBehavior::ReturnsFalse => Ok(false),
            _ => Err(reason.to_string()),
        }
    }

    fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: U256) -> bool {
        if self.behavior(token) == TokenBehavior::RejectsApprovals {
            return false;
        }
        self.allowances.insert((token, owner, spender), amount);
        true
    }

    fn transfer(&mut self, token: Address, from: Address, to: Address, amount: U256) -> Result<bool, String> {
        if self.behavior(token) == TokenBehavior::SilentNoop {
            return Ok(true);
        }
        let from_balance = self.balance(token, from);
        if from_balance < amount {
            return self.refuse(token, "ERC20: transfer amount exceeds balance");
        }
        self.balances.insert((token, from), from_balance - amount);
        let to_balance = self.balance(token, to);
        self.balances.insert((token, to), to_balance.saturating_add(amount));
        Ok(true)
    }

    fn transfer_from(&mut self, token: Address, spender: Address, from: Address, to: Address, amount: U256) -> Result<bool, String> {
        if self.behavior(token) == TokenBehavior::SilentNoop {
            return Ok(true);
        }
        let allowance = self.allowance(token, from, spender);
        if allowance < amount {
            return self.refuse(token, "ERC20: insufficient allowance");
        }
        if self.balance(token, from) < amount {
            return self.refuse(token, "ERC20: transfer amount exceeds balance");
        }
        if allowance != U256::MAX {
            self.allowances.insert((token, from, spender), allowance - amount);
        }
        self.transfer(token, from, to, amount)
    }

    fn pair_for(&self, factory: Address, token_a: Address, token_b: Address) -> Option<Address> {
        let (token0, token1) = sort_tokens(token_a, token_b);
        self.pair_index.get(&(factory, token0, token1)).copied()
    }

    fn reserves(&self, pair: Address) -> Option<Reserves> {
        let info = self.pairs.get(&pair)?;
        Some(Reserves {
            reserve0: self.balance(info.token0, pair),
            reserve1: self.balance(info.token1, pair),
            block_timestamp_last: info.block_timestamp_last,
            read_at: unix_now(),
        })
    }

    /// (reserve_in, reserve_out) of `pair` for a swap selling `token_in`.
    fn oriented(&self, pair: Address, token_in: Address) -> Option<(U256, U256)> {
        let info = self.pairs.get(&pair)?;
        let (r0, r1) = (self.balance(info.token0, pair), self.balance(info.token1, pair));
        if token_in == info.token0 {
            Some((r0, r1))
        } else if token_in == info.token1 {
            Some((r1, r0))
        } else {
            None
        }
    }
}

struct OpenSection {
    checkpoint: Checkpoint,
    snapshot: ChainState,
    _lock: OwnedMutexGuard<()>,
}

/// In-memory chain with Uniswap V2 factories, pairs, routers and ERC-20 balances.
///
/// Implements every seam the engine talks to, so the aggregator and the executor run against
/// it unchanged. Atomic sections are serialized: `begin` waits for the previous section to
/// commit or roll back.
#[derive(Default)]
pub struct MockChain {
    state: Mutex<ChainState>,
    section: Mutex<Option<OpenSection>>,
    section_lock: Arc<tokio::sync::Mutex<()>>,
    next_checkpoint: AtomicU64,
    committed: AtomicU64,
    failing_factories: DashSet<Address>,
    factory_delays: DashMap<Address, Duration>,
    router_delays: DashMap<Address, Duration>,
    /// routers that report a swap without pulling the sender's input
    skimming_routers: DashSet<Address>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn section(&self) -> MutexGuard<'_, Option<OpenSection>> {
        self.section.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deterministic pair address for `(factory, token0, token1)`.
    pub fn pair_address(factory: Address, token_a: Address, token_b: Address) -> Address {
        let (token0, token1) = sort_tokens(token_a, token_b);
        let mut seed = Vec::with_capacity(60);
        seed.extend_from_slice(factory.as_slice());
        seed.extend_from_slice(token0.as_slice());
        seed.extend_from_slice(token1.as_slice());
        Address::from_slice(&keccak256(seed)[12..])
    }

    /// Deploy (or refill) a pair holding `reserve_a` of `token_a` and `reserve_b` of `token_b`,
    /// stored in ascending address order like a real factory does.
    pub fn create_pair(&self, factory: Address, token_a: Address, token_b: Address, reserve_a: U256, reserve_b: U256) -> Address {
        let (token0, token1) = sort_tokens(token_a, token_b);
        let (reserve0, reserve1) = if token0 == token_a { (reserve_a, reserve_b) } else { (reserve_b, reserve_a) };
        self.create_pair_unsorted(factory, token0, token1, reserve0, reserve1)
    }

    /// Deploy a pair that stores `token0` first whatever the address order.
    pub fn create_pair_unsorted(&self, factory: Address, token0: Address, token1: Address, reserve0: U256, reserve1: U256) -> Address {
        let pair = Self::pair_address(factory, token0, token1);
        let (low, high) = sort_tokens(token0, token1);
        let mut state = self.state();
        state.pairs.insert(pair, MockPair { token0, token1, block_timestamp_last: unix_now() as u32 });
        state.pair_index.insert((factory, low, high), pair);
        state.balances.insert((token0, pair), reserve0);
        state.balances.insert((token1, pair), reserve1);
        pair
    }

    /// Empty both reserves of an existing pair.
    pub fn drain_pair(&self, factory: Address, token_a: Address, token_b: Address) {
        let mut state = self.state();
        let Some(pair) = state.pair_for(factory, token_a, token_b) else {
            return;
        };
        state.balances.insert((token_a, pair), U256::ZERO);
        state.balances.insert((token_b, pair), U256::ZERO);
    }

    pub fn get_pair_address(&self, factory: Address, token_a: Address, token_b: Address) -> Option<Address> {
        self.state().pair_for(factory, token_a, token_b)
    }

    pub fn reserves_of(&self, pair: Address) -> Option<Reserves> {
        self.state().reserves(pair)
    }

    /// Every `getPair` on this factory reverts from now on.
    pub fn fail_factory(&self, factory: Address) {
        self.failing_factories.insert(factory);
    }

    pub fn delay_factory(&self, factory: Address, delay: Duration) {
        self.factory_delays.insert(factory, delay);
    }

    pub fn register_router(&self, router: Address, factory: Address) {
        self.state().routers.insert(router, factory);
    }

    pub fn delay_router(&self, router: Address, delay: Duration) {
        self.router_delays.insert(router, delay);
    }

    /// The router pays out of the pair but leaves the sender's input where it is.
    pub fn skip_input_pull(&self, router: Address) {
        self.skimming_routers.insert(router);
    }

    pub fn mint(&self, token: Address, owner: Address, amount: U256) {
        let mut state = self.state();
        let balance = state.balance(token, owner);
        state.balances.insert((token, owner), balance.saturating_add(amount));
    }

    pub fn set_token_behavior(&self, token: Address, behavior: TokenBehavior) {
        self.state().behaviors.insert(token, behavior);
    }

    pub fn balance(&self, token: Address, owner: Address) -> U256 {
        self.state().balance(token, owner)
    }

    pub fn allowance_of(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.state().allowance(token, owner, spender)
    }

    /// Number of committed atomic sections.
    pub fn committed_count(&self) -> u64 {
        self.committed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl VenueSource for MockChain {
    async fn get_pair(&self, factory: Address, token_a: Address, token_b: Address) -> Result<Option<Address>, VenueError> {
        let delay = self.factory_delays.get(&factory).map(|delay| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_factories.contains(&factory) {
            return Err(VenueError::Reverted(format!("getPair on {factory:#}")));
        }
        Ok(self.state().pair_for(factory, token_a, token_b))
    }

    async fn get_pair_tokens(&self, pair: Address) -> Result<(Address, Address), VenueError> {
        let state = self.state();
        let info = state.pairs.get(&pair).ok_or_else(|| VenueError::Reverted(format!("{pair:#} is not a pair")))?;
        Ok((info.token0, info.token1))
    }

    async fn get_reserves(&self, pair: Address) -> Result<Reserves, VenueError> {
        self.state().reserves(pair).ok_or_else(|| VenueError::Reverted(format!("{pair:#} is not a pair")))
    }
}

#[async_trait]
impl TokenLedger for MockChain {
    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, LedgerError> {
        Ok(self.state().balance(token, owner))
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256, LedgerError> {
        Ok(self.state().allowance(token, owner, spender))
    }

    async fn approve(&self, token: Address, owner: Address, spender: Address, amount: U256) -> Result<bool, LedgerError> {
        Ok(self.state().approve(token, owner, spender, amount))
    }

    async fn transfer(&self, token: Address, from: Address, to: Address, amount: U256) -> Result<bool, LedgerError> {
        self.state().transfer(token, from, to, amount).map_err(LedgerError::Reverted)
    }

    async fn transfer_from(
        &self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<bool, LedgerError> {
        self.state().transfer_from(token, spender, from, to, amount).map_err(LedgerError::Reverted)
    }
}

fn library_error(e: PricingError) -> RouterError {
    let reason = match e {
        PricingError::InvalidAmount => "UniswapV2Library: INSUFFICIENT_INPUT_AMOUNT".to_string(),
        PricingError::InsufficientLiquidity => "UniswapV2Library: INSUFFICIENT_LIQUIDITY".to_string(),
        other => other.to_string(),
    };
    RouterError::Rejected(reason)
}

#[async_trait]
impl VenueRouter for MockChain {
    async fn swap_exact_tokens_for_tokens(
        &self,
        router: Address,
        sender: Address,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
    ) -> Result<Vec<U256>, RouterError> {
        let delay = self.router_delays.get(&router).map(|delay| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        let factory = *state.routers.get(&router).ok_or_else(|| RouterError::Unavailable(format!("no router at {router:#}")))?;
        if deadline < unix_now() {
            return Err(RouterError::Rejected("UniswapV2Router: EXPIRED".into()));
        }
        if path.len() < 2 {
            return Err(RouterError::Rejected("UniswapV2Library: INVALID_PATH".into()));
        }

        let pricing = PricingEngine::default();
        let mut amounts = Vec::with_capacity(path.len());
        let mut pairs = Vec::with_capacity(path.len() - 1);
        amounts.push(amount_in);
        for hop in path.windows(2) {
            let pair = state.pair_for(factory, hop[0], hop[1]).ok_or_else(|| RouterError::Rejected("UniswapV2Library: PAIR_NOT_FOUND".into()))?;
            let (reserve_in, reserve_out) = state.oriented(pair, hop[0]).ok_or_else(|| RouterError::Rejected("UniswapV2: INVALID_TO".into()))?;
            let previous = amounts.last().copied().unwrap_or_default();
            amounts.push(pricing.get_amount_out(previous, reserve_in, reserve_out).map_err(library_error)?);
            pairs.push(pair);
        }
        if amounts.last().copied().unwrap_or_default() < amount_out_min {
            return Err(RouterError::Rejected("UniswapV2Router: INSUFFICIENT_OUTPUT_AMOUNT".into()));
        }

        // apply on a copy so a failing hop reverts the whole call
        let mut next = state.clone();
        if !self.skimming_routers.contains(&router) {
            match next.transfer_from(path[0], router, sender, pairs[0], amount_in) {
                Ok(true) => {}
                Ok(false) => return Err(RouterError::Rejected("TransferHelper: TRANSFER_FROM_FAILED".into())),
                Err(reason) => return Err(RouterError::Rejected(reason)),
            }
        }
        let now = unix_now() as u32;
        for (i, pair) in pairs.iter().enumerate() {
            let destination = pairs.get(i + 1).copied().unwrap_or(to);
            match next.transfer(path[i + 1], *pair, destination, amounts[i + 1]) {
                Ok(true) => {}
                Ok(false) => return Err(RouterError::Rejected("UniswapV2: TRANSFER_FAILED".into())),
                Err(reason) => return Err(RouterError::Rejected(reason)),
            }
            if let Some(info) = next.pairs.get_mut(pair) {
                info.block_timestamp_last = now;
            }
        }
        *state = next;
        Ok(amounts)
    }
}

#[async_trait]
impl AtomicSection for MockChain {
    async fn begin(&self) -> Result<Checkpoint, LedgerError> {
        let lock = self.section_lock.clone().lock_owned().await;
        let checkpoint = self.next_checkpoint.fetch_add(1, Ordering::Relaxed) + 1;
        let snapshot = self.state().clone();
        *self.section() = Some(OpenSection { checkpoint, snapshot, _lock: lock });
        Ok(checkpoint)
    }

    async fn commit(&self, checkpoint: Checkpoint) -> Result<B256, LedgerError> {
        let mut section = self.section();
        match section.take() {
            Some(open) if open.checkpoint == checkpoint => {
                self.committed.fetch_add(1, Ordering::Relaxed);
                Ok(keccak256(checkpoint.to_be_bytes()))
            }
            other => {
                *section = other;
                Err(LedgerError::Unavailable(format!("checkpoint {checkpoint} is not open")))
            }
        }
    }

    async fn rollback(&self, checkpoint: Checkpoint) -> Result<(), LedgerError> {
        let mut section = self.section();
        match section.take() {
            Some(open) if open.checkpoint == checkpoint => {
                *self.state() = open.snapshot;
                Ok(())
            }
            other => {
                *section = other;
                Err(LedgerError::Unavailable(format!("checkpoint {checkpoint} is not open")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Address = Address::repeat_byte(1);
    const B: Address = Address::repeat_byte(2);
    const FACTORY: Address = Address::repeat_byte(0xf1);
    const ROUTER: Address = Address::repeat_byte(0xe1);
    const TRADER: Address = Address::repeat_byte(0xaa);

    fn u(value: u128) -> U256 {
        U256::from(value)
    }

    fn chain() -> MockChain {
        let chain = MockChain::new();
        chain.create_pair(FACTORY, A, B, u(1_000_000), u(2_000_000));
        chain.register_router(ROUTER, FACTORY);
        chain.mint(A, TRADER, u(10_000));
        chain
    }

    #[tokio::test]
    async fn test_pair_lookup_is_symmetric() {
        let chain = chain();
        let forward = chain.get_pair(FACTORY, A, B).await.unwrap();
        assert!(forward.is_some());
        assert_eq!(chain.get_pair(FACTORY, B, A).await.unwrap(), forward);
        assert_eq!(chain.get_pair(Address::repeat_byte(0xf2), A, B).await.unwrap(), None);

        let reserves = chain.get_reserves(forward.unwrap()).await.unwrap();
        assert_eq!((reserves.reserve0, reserves.reserve1), (u(1_000_000), u(2_000_000)));
    }

    #[tokio::test]
    async fn test_router_swap_moves_balances() {
        let chain = chain();
        chain.approve(A, TRADER, ROUTER, u(1_000)).await.unwrap();
        let expected = PricingEngine::default().get_amount_out(u(1_000), u(1_000_000), u(2_000_000)).unwrap();

        let amounts = chain.swap_exact_tokens_for_tokens(ROUTER, TRADER, u(1_000), expected, &[A, B], TRADER, u64::MAX).await.unwrap();

        assert_eq!(amounts, vec![u(1_000), expected]);
        assert_eq!(chain.balance(A, TRADER), u(9_000));
        assert_eq!(chain.balance(B, TRADER), expected);
        let pair = chain.get_pair_address(FACTORY, A, B).unwrap();
        assert_eq!(chain.reserves_of(pair).unwrap().reserve0, u(1_001_000));
    }

    #[tokio::test]
    async fn test_router_rejections_change_nothing() {
        let chain = chain();
        chain.approve(A, TRADER, ROUTER, u(1_000)).await.unwrap();

        let expired = chain.swap_exact_tokens_for_tokens(ROUTER, TRADER, u(1_000), U256::ZERO, &[A, B], TRADER, 1).await;
        assert_eq!(expired, Err(RouterError::Rejected("UniswapV2Router: EXPIRED".into())));

        let greedy = chain.swap_exact_tokens_for_tokens(ROUTER, TRADER, u(1_000), u(1_000_000), &[A, B], TRADER, u64::MAX).await;
        assert_eq!(greedy, Err(RouterError::Rejected("UniswapV2Router: INSUFFICIENT_OUTPUT_AMOUNT".into())));

        assert_eq!(chain.balance(A, TRADER), u(10_000));
        assert_eq!(chain.allowance_of(A, TRADER, ROUTER), u(1_000));
    }

    #[tokio::test]
    async fn test_token_behaviors() {
        let chain = chain();
        let other = Address::repeat_byte(0xbb);

        assert!(matches!(chain.transfer(A, TRADER, other, u(20_000)).await, Err(LedgerError::Reverted(_))));

        chain.set_token_behavior(A, TokenBehavior::ReturnsFalse);
        assert_eq!(chain.transfer(A, TRADER, other, u(20_000)).await, Ok(false));

        chain.set_token_behavior(A, TokenBehavior::SilentNoop);
        assert_eq!(chain.transfer(A, TRADER, other, u(1)).await, Ok(true));
        assert_eq!(chain.balance(A, other), U256::ZERO);

        chain.set_token_behavior(A, TokenBehavior::RejectsApprovals);
        assert_eq!(chain.approve(A, TRADER, other, u(1)).await, Ok(false));
        assert_eq!(chain.allowance_of(A, TRADER, other), U256::ZERO);
    }

    #[tokio::test]
    async fn test_rollback_restores_state() {
        let chain = chain();
        let other = Address::repeat_byte(0xbb);

        let checkpoint = chain.begin().await.unwrap();
        chain.transfer(A, TRADER, other, u(500)).await.unwrap();
        chain.rollback(checkpoint).await.unwrap();
        assert_eq!(chain.balance(A, TRADER), u(10_000));

        let checkpoint = chain.begin().await.unwrap();
        chain.transfer(A, TRADER, other, u(500)).await.unwrap();
        chain.commit(checkpoint).await.unwrap();
        assert_eq!(chain.balance(A, other), u(500));
        assert_eq!(chain.committed_count(), 1);

        assert!(chain.commit(checkpoint).await.is_err());
    }
}
