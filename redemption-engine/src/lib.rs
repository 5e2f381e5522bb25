//! Checkout Redemption & Availability Engine
//!
//! Decides, at checkout time, whether applying a discount code, redeeming a
//! gift card, or reserving variant inventory is legal — and then commits
//! the decision without letting money or stock leak through concurrent
//! double-use.
//!
//! # Module Structure
//!
//! ```text
//! redemption-engine/src/
//! ├── db/            # SQLite pool, migrations, repositories
//! ├── validators/    # Pure rule evaluation (advisory phase)
//! ├── orchestrator/  # Two-phase validate/commit protocol
//! └── money.rs       # Decimal-backed rounding helpers
//! ```
//!
//! # Protocol
//!
//! `validate` is a read-only fast-fail for the common case; `commit` is the
//! sole source of truth. Every commit is a conditional write evaluated by
//! the store ("increment only while below the limit", "append only while
//! the balance stays non-negative", "commit stock only within policy"), so
//! racing checkouts cannot jointly exceed an object's true remaining
//! capacity. A commit whose guard loses the race returns a retryable
//! `Conflict` for the caller to surface ("this code was just used up").

pub mod db;
pub mod money;
pub mod orchestrator;
pub mod validators;

// Re-export public types
pub use db::DbService;
pub use db::repository::{RepoError, RepoResult};
pub use orchestrator::{
    CommitOutcome, Committed, RedemptionOrchestrator, RedemptionState, ValidatedDiscount,
    ValidatedGiftCard, ValidatedInventory, ValidationToken,
};
pub use shared::{RedemptionError, RedemptionResult};
