use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use strum_macros::{Display, EnumIter, EnumString};

/// Where in the swap a value movement was checked.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, EnumString, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStage {
    /// caller -> executor
    Pull,
    /// executor -> venue
    ToVenue,
    /// venue -> recipient
    Delivery,
}

/// What the caller should do about a failure.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, EnumString, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// Fix the request before trying again.
    InvalidInput,
    /// The venue said no at this price; re-quote.
    Rejected,
    /// A token or venue misbehaved; do not retry with it.
    Misbehaving,
    /// Nothing wrong with the request; try again later.
    Transient,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapFailure {
    #[error("amount in must be greater than zero")]
    InvalidAmount,
    #[error("invalid route: {0}")]
    InvalidRoute(String),
    #[error("deadline {deadline} is before now ({now})")]
    DeadlineExpired { deadline: u64, now: u64 },
    #[error("{caller:#} already has a swap of {token:#} in flight")]
    ExecutionInFlight { caller: Address, token: Address },
    #[error("authorization failed: {0}")]
    AuthorizationFailed(String),
    #[error("transfer failed at {stage}: {reason}")]
    TransferFailed { stage: TransferStage, reason: String },
    #[error("venue rejected the swap: {0}")]
    VenueRejected(String),
    #[error("received {actual}, below the minimum of {min}")]
    InsufficientOutput { min: U256, actual: U256 },
    #[error("execution substrate error: {0}")]
    Substrate(String),
}

impl SwapFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            SwapFailure::InvalidAmount | SwapFailure::InvalidRoute(_) | SwapFailure::DeadlineExpired { .. } => {
                FailureKind::InvalidInput
            }
            SwapFailure::VenueRejected(_) | SwapFailure::InsufficientOutput { .. } => FailureKind::Rejected,
            SwapFailure::AuthorizationFailed(_) | SwapFailure::TransferFailed { .. } => FailureKind::Misbehaving,
            SwapFailure::ExecutionInFlight { .. } | SwapFailure::Substrate(_) => FailureKind::Transient,
        }
    }
}

/// The execution record of a successful swap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapReceipt {
    pub tx_id: B256,
    pub venue: String,
    pub router: Address,
    pub path: Vec<Address>,
    pub caller: Address,
    pub recipient: Address,
    pub amount_in: U256,
    /// Realized output, measured at the recipient.
    pub amount_out: U256,
    pub min_amount_out: U256,
}

impl Display for SwapReceipt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} -> {} to {:#} (tx {})", self.venue, self.amount_in, self.amount_out, self.recipient, self.tx_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapOutcome {
    Succeeded(SwapReceipt),
    Failed(SwapFailure),
}

impl SwapOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SwapOutcome::Succeeded(_))
    }

    pub fn receipt(&self) -> Option<&SwapReceipt> {
        match self {
            SwapOutcome::Succeeded(receipt) => Some(receipt),
            SwapOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&SwapFailure> {
        match self {
            SwapOutcome::Succeeded(_) => None,
            SwapOutcome::Failed(failure) => Some(failure),
        }
    }

    pub fn into_result(self) -> Result<SwapReceipt, SwapFailure> {
        match self {
            SwapOutcome::Succeeded(receipt) => Ok(receipt),
            SwapOutcome::Failed(failure) => Err(failure),
        }
    }
}

impl From<Result<SwapReceipt, SwapFailure>> for SwapOutcome {
    fn from(result: Result<SwapReceipt, SwapFailure>) -> Self {
        match result {
            Ok(receipt) => SwapOutcome::Succeeded(receipt),
            Err(failure) => SwapOutcome::Failed(failure),
        }
    }
}
