//! Transaction enrichment.
//!
//! Amounts are clipped first; every amount-based field below is computed
//! from the clipped value. Per-account and per-month aggregates come from
//! the transaction rows themselves, before the balance join, so a fan-out
//! on duplicated account numbers never inflates them.

use crate::{
    aggregate::{broadcast, group_by, Aggregation},
    error::EnrichResult,
    join::left_join,
    schema::{
        ACCOUNTS, ACCOUNT_NUMBER, AMOUNT, AMOUNT_TO_BALANCE, AVAILABLE_BALANCE,
        FREQUENCY_PER_ACCOUNT, MEAN_AMOUNT_PER_ACCOUNT, MONTHLY_TOTAL_SUFFIX, PERIOD,
        TRANSACTIONS, TRANSACTION_DATE,
    },
    table::{Table, Value},
    temporal::{coerce_dates, parse_utc, period_of},
};

/// Working column holding the joined account balance; dropped before return.
const BALANCE_SNAPSHOT: &str = "__saldo_referencia";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransactionSettings {
    pub clip_limit: f64,
    pub zero_balance_substitute: f64,
}

impl Default for TransactionSettings {
    fn default() -> Self {
        Self {
            clip_limit: 1_000_000.0,
            zero_balance_substitute: 1e-6,
        }
    }
}

/// Clamp to `[-limit, limit]`. Idempotent.
pub fn clip_amount(amount: f64, limit: f64) -> f64 {
    amount.clamp(-limit, limit)
}

/// Cell-level clip that keeps integers integral when the bound is integral.
pub fn clip_value(value: &Value, limit: f64) -> Value {
    match value {
        Value::Int(i) => {
            let clipped = clip_amount(*i as f64, limit);
            if clipped == *i as f64 {
                Value::Int(*i)
            } else if clipped.fract() == 0.0 {
                Value::Int(clipped as i64)
            } else {
                Value::Float(clipped)
            }
        }
        Value::Float(f) if f.is_finite() => Value::Float(clip_amount(*f, limit)),
        other => other.clone(),
    }
}

/// |amount| / balance, with a zero balance replaced by `zero_substitute`.
pub fn amount_to_balance(amount: &Value, balance: &Value, zero_substitute: f64) -> Value {
    match (amount.as_f64(), balance.as_f64()) {
        (Some(amount), Some(balance)) => {
            let denominator = if balance == 0.0 { zero_substitute } else { balance };
            Value::float(amount.abs() / denominator)
        }
        _ => Value::Null,
    }
}

pub fn enrich_transactions(
    mut transactions: Table,
    accounts: Option<&Table>,
    settings: TransactionSettings,
) -> EnrichResult<Table> {
    transactions.require(TRANSACTIONS, ACCOUNT_NUMBER)?;
    transactions.require(TRANSACTIONS, AMOUNT)?;
    transactions.require(TRANSACTIONS, TRANSACTION_DATE)?;

    let dates = coerce_dates(&mut transactions, TRANSACTION_DATE, parse_utc)?.unwrap_or_default();
    let periods = dates
        .iter()
        .map(|d| d.map_or(Value::Null, |d| Value::Text(period_of(d))))
        .collect();
    transactions.set_column(PERIOD, periods)?;

    let clipped = transactions
        .require(TRANSACTIONS, AMOUNT)?
        .iter()
        .map(|v| clip_value(v, settings.clip_limit))
        .collect();
    transactions.set_column(AMOUNT, clipped)?;

    let per_account = &[ACCOUNT_NUMBER];
    let mean_amount = group_by(&transactions, TRANSACTIONS, per_account, AMOUNT, Aggregation::Mean)?;
    let frequency = group_by(&transactions, TRANSACTIONS, per_account, ACCOUNT_NUMBER, Aggregation::Count)?;
    let monthly = group_by(&transactions, TRANSACTIONS, &[PERIOD], AMOUNT, Aggregation::Sum)?;

    let balances = match accounts {
        Some(accounts) => {
            accounts.require(ACCOUNTS, ACCOUNT_NUMBER)?;
            accounts.require(ACCOUNTS, AVAILABLE_BALANCE)?;
            let mut balances = accounts.select(&[ACCOUNT_NUMBER, AVAILABLE_BALANCE])?;
            balances.rename_column(AVAILABLE_BALANCE, BALANCE_SNAPSHOT);
            balances
        }
        None => {
            log::warn!("No '{ACCOUNTS}' table; amount/balance ratios will be null");
            Table::empty_with(&[ACCOUNT_NUMBER, BALANCE_SNAPSHOT])
        }
    };
    let mut enriched = left_join(&transactions, &balances, per_account, "_conta")?;

    broadcast(&mut enriched, TRANSACTIONS, per_account, &mean_amount, MEAN_AMOUNT_PER_ACCOUNT, Value::Null)?;

    let ratios = enriched
        .require(TRANSACTIONS, AMOUNT)?
        .iter()
        .zip(enriched.require(TRANSACTIONS, BALANCE_SNAPSHOT)?)
        .map(|(amount, balance)| amount_to_balance(amount, balance, settings.zero_balance_substitute))
        .collect();
    enriched.set_column(AMOUNT_TO_BALANCE, ratios)?;

    broadcast(&mut enriched, TRANSACTIONS, per_account, &frequency, FREQUENCY_PER_ACCOUNT, Value::Null)?;
    enriched.drop_columns(&[BALANCE_SNAPSHOT]);

    // Derived monthly sum shares the source column name; the suffix tells them apart.
    let monthly = monthly.to_table(AMOUNT)?;
    let enriched = left_join(&enriched, &monthly, &[PERIOD], MONTHLY_TOTAL_SUFFIX)?;

    log::debug!(
        "transactions enriched: {} rows, {} accounts",
        enriched.height(),
        frequency.len()
    );
    Ok(enriched)
}
