//! Branch enrichment: state name plus balance, account and volume aggregates.
//!
//! Aggregates are computed from the RAW accounts and transactions, joined
//! account → branch and transaction → account → branch. Joins fan out on
//! non-unique keys exactly like the relational joiner does everywhere.

use crate::{
    aggregate::{broadcast, group_by, Aggregation},
    error::EnrichResult,
    join::left_join,
    reference::{derive_label, state_names},
    schema::{
        ACCOUNTS, ACCOUNT_COUNT, ACCOUNT_NUMBER, AMOUNT, AVAILABLE_BALANCE, BRANCHES,
        BRANCH_CODE, MEAN_BALANCE, STATE_CODE, STATE_NAME, TRANSACTIONS, TRANSACTION_VOLUME,
    },
    table::{Table, Value},
};

const BRANCH_SUFFIX: &str = "_agencia";
const ACCOUNT_SUFFIX: &str = "_conta";

pub fn enrich_branches(
    mut branches: Table,
    accounts: Option<&Table>,
    transactions: Option<&Table>,
) -> EnrichResult<Table> {
    branches.require(BRANCHES, BRANCH_CODE)?;
    derive_label(&mut branches, STATE_CODE, STATE_NAME, &state_names())?;

    let no_accounts = Table::empty_with(&[ACCOUNT_NUMBER, BRANCH_CODE, AVAILABLE_BALANCE]);
    let accounts = accounts.unwrap_or_else(|| {
        log::warn!("No '{ACCOUNTS}' table; branches get no account aggregates");
        &no_accounts
    });
    accounts.require(ACCOUNTS, ACCOUNT_NUMBER)?;
    accounts.require(ACCOUNTS, BRANCH_CODE)?;
    accounts.require(ACCOUNTS, AVAILABLE_BALANCE)?;

    let no_transactions = Table::empty_with(&[ACCOUNT_NUMBER, AMOUNT]);
    let transactions = transactions.unwrap_or_else(|| {
        log::warn!("No '{TRANSACTIONS}' table; branches get no transaction volume");
        &no_transactions
    });
    transactions.require(TRANSACTIONS, ACCOUNT_NUMBER)?;
    transactions.require(TRANSACTIONS, AMOUNT)?;

    let accounts_by_branch = left_join(accounts, &branches, &[BRANCH_CODE], BRANCH_SUFFIX)?;
    let tx_by_account = left_join(transactions, &accounts_by_branch, &[ACCOUNT_NUMBER], ACCOUNT_SUFFIX)?;
    let tx_by_branch = left_join(&tx_by_account, &branches, &[BRANCH_CODE], BRANCH_SUFFIX)?;

    let mean_balance = group_by(
        &accounts_by_branch,
        ACCOUNTS,
        &[BRANCH_CODE],
        AVAILABLE_BALANCE,
        Aggregation::Mean,
    )?;
    let account_count = group_by(
        &accounts_by_branch,
        ACCOUNTS,
        &[BRANCH_CODE],
        ACCOUNT_NUMBER,
        Aggregation::Count,
    )?;
    let volume = group_by(&tx_by_branch, TRANSACTIONS, &[BRANCH_CODE], AMOUNT, Aggregation::Sum)?;

    broadcast(&mut branches, BRANCHES, &[BRANCH_CODE], &mean_balance, MEAN_BALANCE, Value::Null)?;
    broadcast(&mut branches, BRANCHES, &[BRANCH_CODE], &account_count, ACCOUNT_COUNT, Value::Int(0))?;
    broadcast(&mut branches, BRANCHES, &[BRANCH_CODE], &volume, TRANSACTION_VOLUME, Value::Null)?;

    log::debug!(
        "branches enriched: {} rows, {} with accounts, {} with transactions",
        branches.height(),
        account_count.len(),
        volume.len()
    );
    Ok(branches)
}
