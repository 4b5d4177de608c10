//! Client enrichment: state from address, type label, full name, tenure, age.

use crate::{
    address::locate_states,
    error::EnrichResult,
    names::combine_names,
    reference::{client_types, derive_label, state_names},
    schema::{
        ADDRESS, AGE, BIRTH_DATE, CLIENTS, CLIENT_TYPE, CLIENT_TYPE_LABEL, INCLUSION_DATE,
        STATE_CODE, STATE_NAME, TENURE_MONTHS,
    },
    table::Table,
    temporal::{compute_age, compute_tenure},
};
use chrono::NaiveDateTime;

pub fn enrich_clients(mut clients: Table, as_of: NaiveDateTime) -> EnrichResult<Table> {
    clients.require(CLIENTS, ADDRESS)?;
    clients.require(CLIENTS, INCLUSION_DATE)?;

    locate_states(&mut clients, ADDRESS, STATE_CODE)?;
    derive_label(&mut clients, STATE_CODE, STATE_NAME, &state_names())?;
    derive_label(&mut clients, CLIENT_TYPE, CLIENT_TYPE_LABEL, &client_types())?;

    combine_names(&mut clients)?;

    compute_tenure(&mut clients, INCLUSION_DATE, TENURE_MONTHS, as_of)?;
    compute_age(&mut clients, BIRTH_DATE, AGE, as_of)?;

    log::debug!("clients enriched: {} rows", clients.height());
    Ok(clients)
}
