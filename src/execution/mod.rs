/// Execution Layer
///
/// This layer is responsible for:
/// - Guarded swap execution against a venue router
/// - Slippage bounds and deadlines
/// - Verifying every value movement against balances
/// - The seams to the token ledger, the router and the atomic substrate

pub mod clock;
pub mod ledger;
pub mod outcome;
pub mod slippage;
pub mod swap_executor;

mod tests;

pub use clock::{Clock, FixedClock, SystemClock};
pub use ledger::{AtomicSection, Checkpoint, LedgerError, RouterError, SwapSubstrate, TokenLedger, VenueRouter};
pub use outcome::{FailureKind, SwapFailure, SwapOutcome, SwapReceipt, TransferStage};
pub use slippage::{SlippageError, default_deadline, min_amount_out};
pub use swap_executor::{SwapExecutor, SwapRequest};
