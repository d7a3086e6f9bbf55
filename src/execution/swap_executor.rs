//! Swap Executor
//!
//! Runs one guarded swap against the router of the selected venue:
//! deadline check, then authorization / pull / venue call / delivery inside a single atomic
//! section of the substrate. Every value movement is verified against balances rather than
//! the boolean the token reports.

use super::clock::{Clock, SystemClock};
use super::ledger::{Checkpoint, LedgerError, RouterError, SwapSubstrate};
use super::outcome::{SwapFailure, SwapOutcome, SwapReceipt, TransferStage};
use super::slippage::{default_deadline, min_amount_out};
use crate::logic::types::RouteSelection;
use alloy_primitives::{Address, U256};
use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Caller side of one execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub caller: Address,
    pub amount_in: U256,
    pub min_amount_out: U256,
    pub recipient: Address,
    /// Unix seconds.
    pub deadline: u64,
}

impl SwapRequest {
    pub fn new(caller: Address, amount_in: U256, min_amount_out: U256, recipient: Address, deadline: u64) -> Self {
        Self { caller, amount_in, min_amount_out, recipient, deadline }
    }

    /// Request for the quoted amount of `route`, bounded by `slippage_bps` below the quoted
    /// output and expiring 15 minutes after `now`.
    pub fn from_route(route: &RouteSelection, caller: Address, recipient: Address, slippage_bps: u64, now: u64) -> Result<Self, SwapFailure> {
        let bound = min_amount_out(route.quote.amount_out, slippage_bps).map_err(|_| SwapFailure::InvalidAmount)?;
        Ok(Self::new(caller, route.quote.amount_in, bound, recipient, default_deadline(now)))
    }
}

type InFlightKey = (Address, Address);

struct InFlightGuard<'a> {
    set: &'a DashSet<InFlightKey>,
    key: InFlightKey,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a DashSet<InFlightKey>, key: InFlightKey) -> Option<Self> {
        set.insert(key).then_some(Self { set, key })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.key);
    }
}

pub struct SwapExecutor<C: ?Sized> {
    substrate: Arc<C>,
    clock: Arc<dyn Clock>,
    /// Account that takes custody between pull and venue call.
    address: Address,
    in_flight: DashSet<InFlightKey>,
}

impl<C: SwapSubstrate + ?Sized> SwapExecutor<C> {
    pub fn new(substrate: Arc<C>, address: Address) -> Self {
        Self { substrate, clock: Arc::new(SystemClock), address, in_flight: DashSet::new() }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn substrate(&self) -> &Arc<C> {
        &self.substrate
    }

    /// Execute `route` for `request`. Never retries; a failed attempt leaves balances and
    /// allowances as they were.
    pub async fn execute(&self, route: &RouteSelection, request: &SwapRequest) -> SwapOutcome {
        let result = self.try_execute(route, request).await;
        match &result {
            Ok(receipt) => info!(
                venue = %receipt.venue,
                path = ?receipt.path,
                amount_in = %receipt.amount_in,
                amount_out = %receipt.amount_out,
                recipient = %receipt.recipient,
                tx_id = %receipt.tx_id,
                "SwapExecuted"
            ),
            Err(failure) => warn!(venue = %route.quote.venue, kind = %failure.kind(), "Swap failed: {}", failure),
        }
        result.into()
    }

    async fn try_execute(&self, route: &RouteSelection, request: &SwapRequest) -> Result<SwapReceipt, SwapFailure> {
        let now = self.clock.now();
        if request.deadline < now {
            return Err(SwapFailure::DeadlineExpired { deadline: request.deadline, now });
        }
        let (token_in, token_out) = validate(route, request)?;

        let _guard = InFlightGuard::acquire(&self.in_flight, (request.caller, token_in))
            .ok_or(SwapFailure::ExecutionInFlight { caller: request.caller, token: token_in })?;

        let checkpoint = self.substrate.begin().await.map_err(substrate_error)?;
        let amount_out = match self.run_atomic(route, request, token_in, token_out).await {
            Ok(amount_out) => amount_out,
            Err(failure) => {
                self.rollback(checkpoint).await;
                return Err(failure);
            }
        };
        let tx_id = match self.substrate.commit(checkpoint).await {
            Ok(tx_id) => tx_id,
            Err(e) => {
                self.rollback(checkpoint).await;
                return Err(substrate_error(e));
            }
        };

        Ok(SwapReceipt {
            tx_id,
            venue: route.quote.venue.clone(),
            router: route.router,
            path: route.path.clone(),
            caller: request.caller,
            recipient: request.recipient,
            amount_in: request.amount_in,
            amount_out,
            min_amount_out: request.min_amount_out,
        })
    }

    /// Raise the caller's grant to exactly `amount_in` when it falls short. Never unlimited.
    async fn ensure_allowance(&self, token: Address, caller: Address, amount_in: U256) -> Result<(), SwapFailure> {
        let current = self.substrate.allowance(token, caller, self.address).await.map_err(authorization_error)?;
        if current >= amount_in {
            return Ok(());
        }

        debug!("Raising allowance of {:#} for {:#} from {} to {}", token, caller, current, amount_in);
        if !self.substrate.approve(token, caller, self.address, amount_in).await.map_err(authorization_error)? {
            return Err(SwapFailure::AuthorizationFailed(format!("approve of {amount_in} returned false")));
        }
        let raised = self.substrate.allowance(token, caller, self.address).await.map_err(authorization_error)?;
        if raised < amount_in {
            return Err(SwapFailure::AuthorizationFailed(format!("allowance is {raised} after approving {amount_in}")));
        }
        Ok(())
    }

    /// Authorization, pull, venue call and delivery. Returns the output realized at the
    /// recipient.
    async fn run_atomic(
        &self,
        route: &RouteSelection,
        request: &SwapRequest,
        token_in: Address,
        token_out: Address,
    ) -> Result<U256, SwapFailure> {
        let ledger = &self.substrate;
        let amount_in = request.amount_in;

        self.ensure_allowance(token_in, request.caller, amount_in).await?;

        // caller -> executor
        let held_before = self.balance(token_in, self.address).await?;
        let pulled = ledger
            .transfer_from(token_in, self.address, request.caller, self.address, amount_in)
            .await
            .map_err(|e| transfer_error(TransferStage::Pull, e))?;
        if !pulled {
            return Err(SwapFailure::TransferFailed { stage: TransferStage::Pull, reason: "transferFrom returned false".into() });
        }
        let held = self.balance(token_in, self.address).await?;
        expect_moved(TransferStage::Pull, held.saturating_sub(held_before), amount_in)?;

        if !ledger.approve(token_in, self.address, route.router, amount_in).await.map_err(authorization_error)? {
            return Err(SwapFailure::AuthorizationFailed("router approval returned false".into()));
        }

        // executor -> venue -> recipient
        let delivered_before = self.balance(token_out, request.recipient).await?;
        let amounts = ledger
            .swap_exact_tokens_for_tokens(
                route.router,
                self.address,
                amount_in,
                request.min_amount_out,
                &route.path,
                request.recipient,
                request.deadline,
            )
            .await
            .map_err(|e| match e {
                RouterError::Rejected(reason) => SwapFailure::VenueRejected(reason),
                RouterError::Unavailable(reason) => SwapFailure::Substrate(reason),
            })?;

        let held_after = self.balance(token_in, self.address).await?;
        expect_moved(TransferStage::ToVenue, held.saturating_sub(held_after), amount_in)?;

        let delivered_after = self.balance(token_out, request.recipient).await?;
        let realized = delivered_after.saturating_sub(delivered_before);
        if realized < request.min_amount_out {
            return Err(SwapFailure::InsufficientOutput { min: request.min_amount_out, actual: realized });
        }
        let reported = amounts.last().copied().unwrap_or_default();
        expect_moved(TransferStage::Delivery, realized, reported)?;

        Ok(realized)
    }

    async fn balance(&self, token: Address, owner: Address) -> Result<U256, SwapFailure> {
        self.substrate.balance_of(token, owner).await.map_err(substrate_error)
    }

    async fn rollback(&self, checkpoint: Checkpoint) {
        if let Err(e) = self.substrate.rollback(checkpoint).await {
            error!("Rollback of checkpoint {} failed: {}", checkpoint, e);
        }
    }
}

fn validate(route: &RouteSelection, request: &SwapRequest) -> Result<(Address, Address), SwapFailure> {
    if request.amount_in.is_zero() {
        return Err(SwapFailure::InvalidAmount);
    }
    let (Some(token_in), Some(token_out)) = (route.token_in(), route.token_out()) else {
        return Err(SwapFailure::InvalidRoute("empty path".into()));
    };
    if route.path.len() < 2 {
        return Err(SwapFailure::InvalidRoute("path needs at least two tokens".into()));
    }
    if token_in != route.quote.token_in || token_out != route.quote.token_out {
        return Err(SwapFailure::InvalidRoute("path does not match the quoted pair".into()));
    }
    if token_in == token_out {
        return Err(SwapFailure::InvalidRoute("path starts and ends with the same token".into()));
    }
    if route.router.is_zero() {
        return Err(SwapFailure::InvalidRoute(format!("venue {} has no router", route.quote.venue)));
    }
    if request.recipient.is_zero() {
        return Err(SwapFailure::InvalidRoute("recipient is the zero address".into()));
    }
    Ok((token_in, token_out))
}

fn expect_moved(stage: TransferStage, moved: U256, expected: U256) -> Result<(), SwapFailure> {
    if moved != expected {
        return Err(SwapFailure::TransferFailed { stage, reason: format!("moved {moved}, expected {expected}") });
    }
    Ok(())
}

fn transfer_error(stage: TransferStage, e: LedgerError) -> SwapFailure {
    match e {
        LedgerError::Reverted(reason) => SwapFailure::TransferFailed { stage, reason },
        LedgerError::Unavailable(reason) => SwapFailure::Substrate(reason),
    }
}

fn authorization_error(e: LedgerError) -> SwapFailure {
    match e {
        LedgerError::Reverted(reason) => SwapFailure::AuthorizationFailed(reason),
        LedgerError::Unavailable(reason) => SwapFailure::Substrate(reason),
    }
}

fn substrate_error(e: LedgerError) -> SwapFailure {
    SwapFailure::Substrate(e.to_string())
}
