// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! OVH DNS zone record operations
//!
//! This module drives the record protocol used for DNS-01 challenges:
//! - Presenting a TXT record (check zone deployed, create, refresh)
//! - Removing only the TXT records whose target matches the challenge key
//!
//! OVH stages record edits until the zone is refreshed, so every mutation
//! sequence ends with a refresh call.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    ovh::OvhClient,
    types::{SolverError, SolverResult},
};

/// Record type used for challenge records
pub const FIELD_TYPE_TXT: &str = "TXT";

/// TTL applied to created challenge records, in seconds
pub const CHALLENGE_TTL: u32 = 60;

/// Zone deployment status
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStatus {
    pub is_deployed: bool,
}

/// A record in an OVH DNS zone
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRecord {
    /// Provider-assigned identifier (absent until created)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    pub field_type: String,

    pub sub_domain: String,

    pub target: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

fn zone_path(domain: &str) -> String {
    format!("/domain/zone/{}", domain)
}

fn record_path(domain: &str, id: i64) -> String {
    format!("/domain/zone/{}/record/{}", domain, id)
}

/// Fail unless the zone is deployed
///
/// A zone with a deployment in progress must not be mutated.
pub async fn validate_zone(client: &OvhClient, domain: &str) -> SolverResult<()> {
    let status: ZoneStatus = client
        .get(&format!("{}/status", zone_path(domain)))
        .await?;

    if !status.is_deployed {
        return Err(SolverError::ZoneNotDeployed {
            domain: domain.to_string(),
        });
    }

    Ok(())
}

/// List record identifiers of `field_type` at `sub_domain`
pub async fn list_records(
    client: &OvhClient,
    domain: &str,
    field_type: &str,
    sub_domain: &str,
) -> SolverResult<Vec<i64>> {
    client
        .get_with_query(
            &format!("{}/record", zone_path(domain)),
            &[("fieldType", field_type), ("subDomain", sub_domain)],
        )
        .await
}

/// Fetch a single record
pub async fn get_record(client: &OvhClient, domain: &str, id: i64) -> SolverResult<ZoneRecord> {
    client.get(&record_path(domain, id)).await
}

/// Delete a single record
pub async fn delete_record(client: &OvhClient, domain: &str, id: i64) -> SolverResult<()> {
    client.delete(&record_path(domain, id)).await
}

/// Create a record with the challenge TTL
pub async fn create_record(
    client: &OvhClient,
    domain: &str,
    field_type: &str,
    sub_domain: &str,
    target: &str,
) -> SolverResult<ZoneRecord> {
    let params = ZoneRecord {
        id: None,
        field_type: field_type.to_string(),
        sub_domain: sub_domain.to_string(),
        target: target.to_string(),
        ttl: Some(CHALLENGE_TTL),
    };

    client
        .post(&format!("{}/record", zone_path(domain)), Some(&params))
        .await
}

/// Publish pending zone changes
pub async fn refresh_records(client: &OvhClient, domain: &str) -> SolverResult<()> {
    client
        .post::<(), ()>(&format!("{}/refresh", zone_path(domain)), None)
        .await
}

/// Present a TXT record: validate the zone, create the record, refresh
///
/// No existing-record check is made, so a replay may leave a duplicate that
/// [`remove_txt_record`] cleans up later.
pub async fn add_txt_record(
    client: &OvhClient,
    domain: &str,
    sub_domain: &str,
    target: &str,
) -> SolverResult<()> {
    validate_zone(client, domain).await?;

    let record = create_record(client, domain, FIELD_TYPE_TXT, sub_domain, target).await?;
    info!(
        "created TXT record {:?} for {}.{}",
        record.id, sub_domain, domain
    );

    refresh_records(client, domain).await
}

/// Remove the TXT records at `sub_domain` whose target equals `target`, then refresh
///
/// Records with other targets are left alone so concurrent challenges on the
/// same name can be cleaned up independently. The first failure stops the loop
/// and skips the refresh.
pub async fn remove_txt_record(
    client: &OvhClient,
    domain: &str,
    sub_domain: &str,
    target: &str,
) -> SolverResult<()> {
    let ids = list_records(client, domain, FIELD_TYPE_TXT, sub_domain).await?;
    debug!(
        "found {} TXT record(s) at {}.{}",
        ids.len(),
        sub_domain,
        domain
    );

    for id in ids {
        let record = get_record(client, domain, id).await?;
        if record.target != target {
            continue;
        }

        delete_record(client, domain, id).await?;
        info!("deleted TXT record {} for {}.{}", id, sub_domain, domain);
    }

    refresh_records(client, domain).await
}
