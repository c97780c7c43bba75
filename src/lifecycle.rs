//! # Lifecycle State Machine
//!
//! Pure transition logic for a note's membership state. A note is always in
//! exactly one of three stored states:
//!
//! ```text
//! Active ⇄ Archived
//!    \       /
//!     Trashed ── restore ──> its recorded prior state
//!        │
//!     (permanent delete: record removed, nothing stored)
//! ```
//!
//! Trashing records where the note came from so that restore returns it to
//! that exact state, not to a fixed default. Permanent deletion is terminal
//! and legal from any state; it is not represented here because no record
//! survives it.
//!
//! This module performs no I/O and holds no state. Callers (the notes
//! store) apply the computed transition to the cached note and persist it.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// The stored membership state of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Membership {
    Active,
    Archived,
    Trashed,
}

/// The state a trashed note came from, kept so restore can return it there.
///
/// Only non-trashed states can precede a trash, so this is narrower than
/// [`Membership`] on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriorMembership {
    Active,
    Archived,
}

impl From<PriorMembership> for Membership {
    fn from(prior: PriorMembership) -> Self {
        match prior {
            PriorMembership::Active => Membership::Active,
            PriorMembership::Archived => Membership::Archived,
        }
    }
}

fn illegal(op: &'static str, from: Membership) -> EngineError {
    EngineError::InvalidTransition { op, from }
}

/// Active → Archived. Archiving an already-archived note is a no-op.
pub fn archive(current: Membership) -> Result<Membership> {
    match current {
        Membership::Active | Membership::Archived => Ok(Membership::Archived),
        Membership::Trashed => Err(illegal("archive", current)),
    }
}

/// Archived → Active.
pub fn unarchive(current: Membership) -> Result<Membership> {
    match current {
        Membership::Archived => Ok(Membership::Active),
        _ => Err(illegal("unarchive", current)),
    }
}

/// Active|Archived → Trashed. Returns the origin to record as prior state.
pub fn trash(current: Membership) -> Result<PriorMembership> {
    match current {
        Membership::Active => Ok(PriorMembership::Active),
        Membership::Archived => Ok(PriorMembership::Archived),
        Membership::Trashed => Err(illegal("trash", current)),
    }
}

/// Trashed → the note's own prior state.
///
/// A trashed note missing its prior state (legacy records) restores to
/// Active rather than failing.
pub fn restore(current: Membership, prior: Option<PriorMembership>) -> Result<Membership> {
    match current {
        Membership::Trashed => Ok(prior.map(Membership::from).unwrap_or(Membership::Active)),
        _ => Err(illegal("restore", current)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_from_active() {
        assert_eq!(archive(Membership::Active).unwrap(), Membership::Archived);
    }

    #[test]
    fn archive_is_idempotent() {
        assert_eq!(archive(Membership::Archived).unwrap(), Membership::Archived);
    }

    #[test]
    fn archive_from_trash_is_illegal() {
        assert!(matches!(
            archive(Membership::Trashed),
            Err(EngineError::InvalidTransition { op: "archive", .. })
        ));
    }

    #[test]
    fn unarchive_only_from_archived() {
        assert_eq!(unarchive(Membership::Archived).unwrap(), Membership::Active);
        assert!(unarchive(Membership::Active).is_err());
        assert!(unarchive(Membership::Trashed).is_err());
    }

    #[test]
    fn trash_records_origin() {
        assert_eq!(trash(Membership::Active).unwrap(), PriorMembership::Active);
        assert_eq!(
            trash(Membership::Archived).unwrap(),
            PriorMembership::Archived
        );
    }

    #[test]
    fn trash_twice_is_illegal() {
        assert!(trash(Membership::Trashed).is_err());
    }

    #[test]
    fn restore_goes_to_prior_state() {
        assert_eq!(
            restore(Membership::Trashed, Some(PriorMembership::Archived)).unwrap(),
            Membership::Archived
        );
        assert_eq!(
            restore(Membership::Trashed, Some(PriorMembership::Active)).unwrap(),
            Membership::Active
        );
    }

    #[test]
    fn restore_without_prior_defaults_to_active() {
        assert_eq!(
            restore(Membership::Trashed, None).unwrap(),
            Membership::Active
        );
    }

    #[test]
    fn restore_non_trashed_is_illegal() {
        assert!(restore(Membership::Active, None).is_err());
        assert!(restore(Membership::Archived, None).is_err());
    }

    #[test]
    fn trash_restore_round_trip() {
        for origin in [Membership::Active, Membership::Archived] {
            let prior = trash(origin).unwrap();
            assert_eq!(restore(Membership::Trashed, Some(prior)).unwrap(), origin);
        }
    }
}
