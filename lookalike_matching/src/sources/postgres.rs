// src/sources/postgres.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use std::collections::BTreeSet;
use tokio_postgres::Row;

use crate::models::organization::{Executive, JoinedRow, Organization, Physician};
use crate::models::target::split_specialties;
use crate::sources::{OrganizationDataSource, OrganizationQuery};
use crate::utils::db_connect::PgPool;

// $1 = upper-cased state, $2 = LIKE patterns (empty array disables the filter).
const ORGANIZATIONS_SQL: &str = "
    SELECT
        o.definitive_id, o.physician_group_name, o.combined_main_specialty,
        o.state, o.city, o.zip_code, o.physician_count, o.ambulatory_emr,
        o.hs_id, o.website
    FROM reference.physician_companies o
    WHERE UPPER(o.state) = $1
      AND (cardinality($2::text[]) = 0
           OR LOWER(o.combined_main_specialty) LIKE ANY($2::text[]))";

const ORGANIZATIONS_WITH_CONTACTS_SQL: &str = "
    WITH filtered_orgs AS (
        SELECT
            definitive_id, physician_group_name, combined_main_specialty,
            state, city, zip_code, physician_count, ambulatory_emr,
            hs_id, website
        FROM reference.physician_companies
        WHERE UPPER(state) = $1
          AND (cardinality($2::text[]) = 0
               OR LOWER(combined_main_specialty) LIKE ANY($2::text[]))
    ),
    physicians AS (
        SELECT
            p.definitive_id AS phys_definitive_id,
            p.first_name AS phys_first_name,
            p.last_name AS phys_last_name,
            p.primary_specialty AS phys_primary_specialty,
            p.executive_flag AS phys_executive_flag,
            p.business_email AS phys_business_email,
            p.direct_email_primary AS phys_direct_email_primary,
            p.direct_email_secondary AS phys_direct_email_secondary,
            p.mobile_phone_primary AS phys_mobile_primary,
            p.mobile_phone_secondary AS phys_mobile_secondary,
            f.physician_group_name AS phys_group_name
        FROM reference.physician_contacts p
        JOIN filtered_orgs f ON p.definitive_id = f.definitive_id
        WHERE p.direct_email_primary IS NOT NULL
           OR p.direct_email_secondary IS NOT NULL
           OR p.mobile_phone_primary IS NOT NULL
           OR p.mobile_phone_secondary IS NOT NULL
    ),
    executives AS (
        SELECT
            e.definitive_id AS exec_definitive_id,
            e.first_name AS exec_first_name,
            e.last_name AS exec_last_name,
            e.physician_leader AS exec_physician_leader,
            e.title AS exec_title,
            e.business_email AS exec_business_email,
            e.direct_email_primary AS exec_direct_email_primary,
            e.direct_email_secondary AS exec_direct_email_secondary,
            e.mobile_phone_primary AS exec_mobile_primary,
            e.mobile_phone_secondary AS exec_mobile_secondary,
            e.linkedin_profile AS exec_linkedin_profile,
            f.physician_group_name AS exec_group_name
        FROM reference.executive_contacts e
        JOIN filtered_orgs f ON e.definitive_id = f.definitive_id
        WHERE e.linkedin_profile IS NOT NULL
           OR e.direct_email_primary IS NOT NULL
           OR e.direct_email_secondary IS NOT NULL
           OR e.mobile_phone_primary IS NOT NULL
           OR e.mobile_phone_secondary IS NOT NULL
    )
    SELECT o.*, p.*, e.*
    FROM filtered_orgs o
    LEFT JOIN physicians p ON o.definitive_id = p.phys_definitive_id
    LEFT JOIN executives e ON o.definitive_id = e.exec_definitive_id";

const DISTINCT_SPECIALTIES_SQL: &str = "
    SELECT DISTINCT combined_main_specialty
    FROM reference.physician_companies
    WHERE combined_main_specialty IS NOT NULL";

/// Reads organizations and their contacts from the reference tables.
#[derive(Clone)]
pub struct PostgresOrganizationSource {
    pool: PgPool,
}

impl PostgresOrganizationSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Every individual specialty present in the reference data, sorted.
    /// Used as the controlled vocabulary for specialty expansion.
    pub async fn distinct_specialties(&self) -> Result<Vec<String>> {
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for specialty vocabulary")?;
        let rows = conn
            .query(DISTINCT_SPECIALTIES_SQL, &[])
            .await
            .context("Failed to query distinct specialties")?;

        let mut specialties = BTreeSet::new();
        for row in &rows {
            let combined: String = row
                .try_get("combined_main_specialty")
                .context("Unexpected combined_main_specialty column type")?;
            specialties.extend(split_specialties(&combined));
        }
        info!("Loaded {} distinct specialties", specialties.len());
        Ok(specialties.into_iter().collect())
    }
}

#[async_trait]
impl OrganizationDataSource for PostgresOrganizationSource {
    async fn fetch_organizations(&self, query: &OrganizationQuery) -> Result<Vec<JoinedRow>> {
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for organization query")?;

        let patterns = query.like_patterns();
        let sql = if query.include_contacts {
            ORGANIZATIONS_WITH_CONTACTS_SQL
        } else {
            ORGANIZATIONS_SQL
        };
        debug!(
            "Querying organizations: state={}, patterns={:?}, contacts={}",
            query.state, patterns, query.include_contacts
        );

        let rows = conn
            .query(sql, &[&query.state, &patterns])
            .await
            .context("Failed to query organizations")?;

        rows.iter()
            .map(|row| -> Result<JoinedRow> {
                let organization = organization_from_row(row)?;
                if !query.include_contacts {
                    return Ok(JoinedRow::organization_only(organization));
                }
                Ok(JoinedRow {
                    organization,
                    physician: physician_from_row(row)?,
                    executive: executive_from_row(row)?,
                })
            })
            .collect()
    }
}

fn text(row: &Row, column: &str) -> Result<Option<String>> {
    row.try_get(column)
        .with_context(|| format!("Failed to read column {}", column))
}

fn flag(row: &Row, column: &str) -> Result<Option<bool>> {
    row.try_get(column)
        .with_context(|| format!("Failed to read column {}", column))
}

fn organization_from_row(row: &Row) -> Result<Organization> {
    Ok(Organization {
        definitive_id: row
            .try_get("definitive_id")
            .context("Failed to read column definitive_id")?,
        physician_group_name: text(row, "physician_group_name")?,
        combined_main_specialty: text(row, "combined_main_specialty")?,
        state: text(row, "state")?,
        city: text(row, "city")?,
        zip_code: text(row, "zip_code")?,
        physician_count: row
            .try_get("physician_count")
            .context("Failed to read column physician_count")?,
        ambulatory_emr: text(row, "ambulatory_emr")?,
        hs_id: text(row, "hs_id")?,
        website: text(row, "website")?,
        physicians: Vec::new(),
        executives: Vec::new(),
    })
}

/// `None` when the left join found no physician for this row.
fn physician_from_row(row: &Row) -> Result<Option<Physician>> {
    let first_name = text(row, "phys_first_name")?;
    if first_name.is_none() {
        return Ok(None);
    }
    Ok(Some(Physician {
        first_name,
        last_name: text(row, "phys_last_name")?,
        primary_specialty: text(row, "phys_primary_specialty")?,
        executive_flag: flag(row, "phys_executive_flag")?,
        business_email: text(row, "phys_business_email")?,
        direct_email_primary: text(row, "phys_direct_email_primary")?,
        direct_email_secondary: text(row, "phys_direct_email_secondary")?,
        mobile_phone_primary: text(row, "phys_mobile_primary")?,
        mobile_phone_secondary: text(row, "phys_mobile_secondary")?,
        group_name: text(row, "phys_group_name")?,
    }))
}

fn executive_from_row(row: &Row) -> Result<Option<Executive>> {
    let first_name = text(row, "exec_first_name")?;
    if first_name.is_none() {
        return Ok(None);
    }
    Ok(Some(Executive {
        first_name,
        last_name: text(row, "exec_last_name")?,
        physician_leader: flag(row, "exec_physician_leader")?,
        title: text(row, "exec_title")?,
        business_email: text(row, "exec_business_email")?,
        direct_email_primary: text(row, "exec_direct_email_primary")?,
        direct_email_secondary: text(row, "exec_direct_email_secondary")?,
        mobile_phone_primary: text(row, "exec_mobile_primary")?,
        mobile_phone_secondary: text(row, "exec_mobile_secondary")?,
        linkedin_profile: text(row, "exec_linkedin_profile")?,
        group_name: text(row, "exec_group_name")?,
    }))
}
