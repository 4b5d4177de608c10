use crate::{
    error::EnrichResult,
    reference::{account_types, derive_label},
    schema::{ACCOUNT_TYPE, ACCOUNT_TYPE_LABEL},
    table::Table,
};

/// Accounts only gain the label of their type code.
pub fn enrich_accounts(mut accounts: Table) -> EnrichResult<Table> {
    derive_label(&mut accounts, ACCOUNT_TYPE, ACCOUNT_TYPE_LABEL, &account_types())?;
    Ok(accounts)
}
