//! Validators Module
//!
//! Pure, I/O-free rule evaluation against snapshots. These checks are the
//! advisory half of the two-phase protocol: they fast-fail the common case
//! but hold no locks, so their verdicts may be stale by commit time. The
//! conditional writes in `db::repository` are the actual guarantee.

pub mod discount;
pub mod gift_card;
pub mod inventory;
