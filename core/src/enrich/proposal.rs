//! Proposal enrichment: approval rates, per-client statistics, deviation.
//!
//! RULE: rates are computed over ALL of a collaborator's or client's
//! proposals, then forced to 0 on every row that is not approved.

use crate::{
    aggregate::{group_by, group_rows, Aggregation, GroupedValues},
    error::EnrichResult,
    join::left_join,
    schema::{
        APPROVAL_RATE_CLIENT, APPROVAL_RATE_COLLAB, CLIENT_CODE, COLLABORATOR_CODE,
        DEVIATION_FROM_CLIENT_MEAN, MEAN_VALUE_STATUS_CLIENT, PROPOSALS, PROPOSALS_PER_CLIENT,
        PROPOSAL_STATUS, PROPOSAL_VALUE,
    },
    table::{Table, Value},
};

const JOIN_SUFFIX: &str = "_y";

const DERIVED: &[&str] = &[
    APPROVAL_RATE_COLLAB,
    APPROVAL_RATE_CLIENT,
    MEAN_VALUE_STATUS_CLIENT,
    PROPOSALS_PER_CLIENT,
    DEVIATION_FROM_CLIENT_MEAN,
];

/// Percentage of approved proposals per group of `key`.
pub fn approval_rates(
    proposals: &Table,
    key: &str,
    approved_status: &str,
) -> EnrichResult<GroupedValues> {
    let statuses = proposals.require(PROPOSALS, PROPOSAL_STATUS)?;
    let rates = group_rows(proposals, PROPOSALS, &[key])?
        .into_iter()
        .map(|(group, rows)| {
            let approved = rows
                .iter()
                .filter(|r| statuses[**r].as_str() == Some(approved_status))
                .count();
            let rate = approved as f64 / rows.len() as f64 * 100.0;
            (group, Value::float(rate))
        })
        .collect();
    Ok(GroupedValues::new(&[key], rates))
}

pub fn enrich_proposals(mut proposals: Table, approved_status: &str) -> EnrichResult<Table> {
    // Re-running on an already enriched table must not stack suffixed copies.
    proposals.drop_columns(DERIVED);
    for column in [COLLABORATOR_CODE, CLIENT_CODE, PROPOSAL_STATUS, PROPOSAL_VALUE] {
        proposals.require(PROPOSALS, column)?;
    }

    let collab_rates = approval_rates(&proposals, COLLABORATOR_CODE, approved_status)?
        .to_table(APPROVAL_RATE_COLLAB)?;
    let client_rates =
        approval_rates(&proposals, CLIENT_CODE, approved_status)?.to_table(APPROVAL_RATE_CLIENT)?;
    let status_means = group_by(
        &proposals,
        PROPOSALS,
        &[PROPOSAL_STATUS, CLIENT_CODE],
        PROPOSAL_VALUE,
        Aggregation::Mean,
    )?
    .to_table(MEAN_VALUE_STATUS_CLIENT)?;
    let per_client = group_by(&proposals, PROPOSALS, &[CLIENT_CODE], CLIENT_CODE, Aggregation::Size)?
        .to_table(PROPOSALS_PER_CLIENT)?;

    let mut enriched = left_join(&proposals, &collab_rates, &[COLLABORATOR_CODE], JOIN_SUFFIX)?;
    enriched = left_join(&enriched, &client_rates, &[CLIENT_CODE], JOIN_SUFFIX)?;
    enriched = left_join(&enriched, &status_means, &[PROPOSAL_STATUS, CLIENT_CODE], JOIN_SUFFIX)?;
    enriched = left_join(&enriched, &per_client, &[CLIENT_CODE], JOIN_SUFFIX)?;

    let deviation = enriched
        .require(PROPOSALS, PROPOSAL_VALUE)?
        .iter()
        .zip(enriched.require(PROPOSALS, MEAN_VALUE_STATUS_CLIENT)?)
        .map(|(value, mean)| match (value.as_f64(), mean.as_f64()) {
            (Some(value), Some(mean)) => Value::float(value - mean),
            _ => Value::Null,
        })
        .collect();
    enriched.set_column(DEVIATION_FROM_CLIENT_MEAN, deviation)?;

    let approved: Vec<bool> = enriched
        .require(PROPOSALS, PROPOSAL_STATUS)?
        .iter()
        .map(|s| s.as_str() == Some(approved_status))
        .collect();
    for column in [APPROVAL_RATE_COLLAB, APPROVAL_RATE_CLIENT] {
        let zeroed = enriched
            .require(PROPOSALS, column)?
            .iter()
            .zip(&approved)
            .map(|(rate, ok)| if *ok { rate.clone() } else { Value::Float(0.0) })
            .collect();
        enriched.set_column(column, zeroed)?;
    }

    log::debug!(
        "proposals enriched: {} rows, {} approved",
        enriched.height(),
        approved.iter().filter(|a| **a).count()
    );
    Ok(enriched)
}
