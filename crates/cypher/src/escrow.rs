//! Escrow projection: oracle list, whitelist and time limit per escrow contract.
//!
//! | Event                   | Escrow missing     | Effect                     |
//! |-------------------------|--------------------|----------------------------|
//! | OracleAdded             | created            | append to `oracles`        |
//! | TimeLimitSet            | skipped            | set `time_limit`           |
//! | AddressAddedToWhitelist | skipped            | append to `whitelist`      |
//!
//! Appends never deduplicate.

use crate::abi::{AddressAddedToWhitelist, EventContext, OracleAdded, TimeLimitSet};
use crate::entity::Escrow;
use crate::identity::address_key;
use crate::projector::{Outcome, ProjectionError, SkipReason};
use crate::store::EntityStore;

pub fn handle_oracle_added<S: EntityStore>(
    store: &mut S,
    ctx: &EventContext,
    ev: &OracleAdded,
) -> Result<Outcome, ProjectionError> {
    let id = address_key(&ctx.address);
    let mut escrow = match store.load::<Escrow>(&id)? {
        Some(e) => e,
        None => {
            tracing::info!(escrow = %id, "escrow created");
            Escrow::new(id)
        }
    };
    escrow.oracles.push(address_key(&ev.oracle));
    store.save(&escrow)?;
    Ok(Outcome::Applied)
}

pub fn handle_time_limit_set<S: EntityStore>(
    store: &mut S,
    ctx: &EventContext,
    ev: &TimeLimitSet,
) -> Result<Outcome, ProjectionError> {
    let id = address_key(&ctx.address);
    let Some(mut escrow) = store.load::<Escrow>(&id)? else {
        tracing::debug!(escrow = %id, "TimeLimitSet for unknown escrow, skipping");
        return Ok(Outcome::Skipped(SkipReason::MissingEscrow));
    };
    escrow.time_limit = Some(ev.timeLimit);
    store.save(&escrow)?;
    Ok(Outcome::Applied)
}

pub fn handle_address_added_to_whitelist<S: EntityStore>(
    store: &mut S,
    ctx: &EventContext,
    ev: &AddressAddedToWhitelist,
) -> Result<Outcome, ProjectionError> {
    let id = address_key(&ctx.address);
    let Some(mut escrow) = store.load::<Escrow>(&id)? else {
        tracing::debug!(escrow = %id, "AddressAddedToWhitelist for unknown escrow, skipping");
        return Ok(Outcome::Skipped(SkipReason::MissingEscrow));
    };
    escrow.whitelist.push(address_key(&ev.user));
    store.save(&escrow)?;
    Ok(Outcome::Applied)
}
