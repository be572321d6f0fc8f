//! Material lifecycle state machine.
//!
//! ```text
//! available   -> loaned, maintenance
//! loaned      -> available, lost, maintenance
//! maintenance -> available
//! lost        -> available, maintenance
//! ```
//!
//! Entering `loaned` records the borrower and bumps the loan statistics;
//! entering any other state clears the borrower, so `loaned_to` is set
//! exactly while the material is loaned.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{Material, MaterialStatus};

/// States reachable from `from` in one step.
#[must_use]
pub fn allowed_transitions(from: MaterialStatus) -> &'static [MaterialStatus] {
    use MaterialStatus::{Available, Loaned, Lost, Maintenance};

    match from {
        Available => &[Loaned, Maintenance],
        Loaned => &[Available, Lost, Maintenance],
        Maintenance => &[Available],
        Lost => &[Available, Maintenance],
    }
}

/// Whether `from -> to` is a legal transition.
#[must_use]
pub fn can_transition(from: MaterialStatus, to: MaterialStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

/// Move `material` to `to`, updating ownership and statistics.
///
/// `loaned_to` names the borrower and is required when `to` is
/// [`MaterialStatus::Loaned`]; it is ignored otherwise. On error the
/// material is left unchanged.
///
/// # Errors
///
/// Returns [`Error::InvalidTransition`] if the state machine forbids the
/// move, or [`Error::MissingLoanTarget`] if a loan has no borrower.
pub fn transition(
    material: &mut Material,
    to: MaterialStatus,
    loaned_to: Option<&str>,
    at: DateTime<Utc>,
) -> Result<()> {
    let from = material.status;
    if !can_transition(from, to) {
        return Err(Error::InvalidTransition { from, to });
    }

    if to == MaterialStatus::Loaned {
        let borrower = loaned_to
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| Error::MissingLoanTarget {
                material_id: material.id.clone(),
            })?;
        material.loaned_to = Some(borrower.to_string());
        material.loaned_at = Some(at);
        material.stats.total_loans += 1;
        material.stats.last_loan_at = Some(at);
    } else {
        material.loaned_to = None;
        material.loaned_at = None;
    }

    material.status = to;
    Ok(())
}
