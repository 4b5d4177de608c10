//! Per-entity enrichers and the transform orchestration that runs them.
//!
//! RULE: the order is fixed. Branches aggregate over the RAW accounts and
//! transactions; transactions join the ENRICHED accounts, whose balances
//! the account enricher leaves untouched.

pub mod account;
pub mod branch;
pub mod client;
pub mod proposal;
pub mod transaction;

use crate::{
    clock::ReferenceClock,
    config::PipelineConfig,
    error::EnrichResult,
    names::combine_names,
    schema::{
        ACCOUNTS, BRANCHES, CLIENTS, COLLABORATORS, COLLABORATOR_BRANCHES, PROPOSALS,
        TRANSACTIONS,
    },
    types::TableSet,
};
use chrono::NaiveDateTime;
use transaction::TransactionSettings;

pub use account::enrich_accounts;
pub use branch::enrich_branches;
pub use client::enrich_clients;
pub use proposal::enrich_proposals;
pub use transaction::enrich_transactions;

/// Everything the enrichers need besides the tables.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichSettings {
    pub approved_status: String,
    pub transactions: TransactionSettings,
    pub as_of: NaiveDateTime,
}

impl EnrichSettings {
    pub fn from_config(config: &PipelineConfig, clock: &ReferenceClock) -> Self {
        Self {
            approved_status: config.approved_status.clone(),
            transactions: TransactionSettings {
                clip_limit: config.amount_clip_limit,
                zero_balance_substitute: config.zero_balance_substitute,
            },
            as_of: clock.as_of(),
        }
    }
}

fn skipped(key: &str) {
    log::warn!("Table '{key}' not present; skipping its enrichment");
}

/// Enrich every known table present in `raw`. Unknown tables pass through.
pub fn enrich_tables(mut raw: TableSet, settings: &EnrichSettings) -> EnrichResult<TableSet> {
    let mut enriched = TableSet::new();

    match raw.remove(CLIENTS) {
        Some(clients) => {
            enriched.insert(CLIENTS.into(), enrich_clients(clients, settings.as_of)?);
        }
        None => skipped(CLIENTS),
    }

    match raw.remove(BRANCHES) {
        Some(branches) => {
            let branches = enrich_branches(branches, raw.get(ACCOUNTS), raw.get(TRANSACTIONS))?;
            enriched.insert(BRANCHES.into(), branches);
        }
        None => skipped(BRANCHES),
    }

    match raw.remove(ACCOUNTS) {
        Some(accounts) => {
            enriched.insert(ACCOUNTS.into(), enrich_accounts(accounts)?);
        }
        None => skipped(ACCOUNTS),
    }

    match raw.remove(TRANSACTIONS) {
        Some(transactions) => {
            let transactions =
                enrich_transactions(transactions, enriched.get(ACCOUNTS), settings.transactions)?;
            enriched.insert(TRANSACTIONS.into(), transactions);
        }
        None => skipped(TRANSACTIONS),
    }

    match raw.remove(PROPOSALS) {
        Some(proposals) => {
            enriched.insert(
                PROPOSALS.into(),
                enrich_proposals(proposals, &settings.approved_status)?,
            );
        }
        None => skipped(PROPOSALS),
    }

    match raw.remove(COLLABORATORS) {
        Some(mut collaborators) => {
            combine_names(&mut collaborators)?;
            enriched.insert(COLLABORATORS.into(), collaborators);
        }
        None => skipped(COLLABORATORS),
    }

    if !raw.contains_key(COLLABORATOR_BRANCHES) {
        skipped(COLLABORATOR_BRANCHES);
    }
    for (key, table) in raw {
        log::debug!("Passing '{key}' through unchanged");
        enriched.insert(key, table);
    }

    Ok(enriched)
}
