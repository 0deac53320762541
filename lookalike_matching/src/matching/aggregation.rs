// src/matching/aggregation.rs
use std::collections::HashMap;

use crate::models::organization::{is_populated, Executive, JoinedRow, Organization, Physician};

/// Physicians are reachable only through a direct email or a mobile phone.
pub fn physician_has_valid_contact(physician: &Physician) -> bool {
    physician.has_direct_email() || physician.has_mobile_phone()
}

/// Executives are also reachable through LinkedIn.
pub fn executive_has_valid_contact(executive: &Executive) -> bool {
    executive.has_linkedin() || executive.has_direct_email() || executive.has_mobile_phone()
}

/// Counters describing one aggregation pass, for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AggregationStats {
    pub rows: usize,
    pub organizations: usize,
    pub physicians: usize,
    pub executives: usize,
    pub contacts_rejected: usize,
}

/// Groups flat joined rows into one record per organization id.
///
/// Organizations keep the order in which their id first appears. Contacts are
/// attached only when `include_contacts` is set, only when the join produced
/// a named contact with a valid channel, and only once per structurally
/// identical record.
pub fn aggregate_rows(rows: Vec<JoinedRow>, include_contacts: bool) -> (Vec<Organization>, AggregationStats) {
    let mut stats = AggregationStats {
        rows: rows.len(),
        ..Default::default()
    };
    let mut organizations: Vec<Organization> = Vec::new();
    let mut index_by_id: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let JoinedRow {
            organization,
            physician,
            executive,
        } = row;

        let idx = match index_by_id.get(&organization.definitive_id) {
            Some(&idx) => idx,
            None => {
                index_by_id.insert(organization.definitive_id.clone(), organizations.len());
                organizations.push(Organization {
                    physicians: Vec::new(),
                    executives: Vec::new(),
                    ..organization
                });
                organizations.len() - 1
            }
        };

        if !include_contacts {
            continue;
        }
        let target = &mut organizations[idx];

        if let Some(physician) = physician.filter(|p| is_populated(&p.first_name)) {
            if !physician_has_valid_contact(&physician) {
                stats.contacts_rejected += 1;
            } else if !target.physicians.contains(&physician) {
                target.physicians.push(physician);
            }
        }

        if let Some(executive) = executive.filter(|e| is_populated(&e.first_name)) {
            if !executive_has_valid_contact(&executive) {
                stats.contacts_rejected += 1;
            } else if !target.executives.contains(&executive) {
                target.executives.push(executive);
            }
        }
    }

    stats.organizations = organizations.len();
    stats.physicians = organizations.iter().map(|o| o.physicians.len()).sum();
    stats.executives = organizations.iter().map(|o| o.executives.len()).sum();
    (organizations, stats)
}

/// Final pass before results leave the engine: drops any contact without a
/// reachable channel, whatever produced the organization record.
pub fn retain_valid_contacts(organization: &mut Organization) {
    organization.physicians.retain(physician_has_valid_contact);
    organization.executives.retain(executive_has_valid_contact);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org(id: &str) -> Organization {
        Organization {
            definitive_id: id.to_string(),
            physician_group_name: Some(format!("Group {}", id)),
            state: Some("TX".to_string()),
            ..Default::default()
        }
    }

    fn physician(first: &str, direct_email: Option<&str>, mobile: Option<&str>) -> Physician {
        Physician {
            first_name: Some(first.to_string()),
            last_name: Some("Smith".to_string()),
            business_email: Some(format!("{}@clinic.example", first.to_lowercase())),
            direct_email_primary: direct_email.map(str::to_string),
            mobile_phone_primary: mobile.map(str::to_string),
            ..Default::default()
        }
    }

    fn executive(first: &str, linkedin: Option<&str>) -> Executive {
        Executive {
            first_name: Some(first.to_string()),
            title: Some("CEO".to_string()),
            linkedin_profile: linkedin.map(str::to_string),
            ..Default::default()
        }
    }

    fn row(id: &str, p: Option<Physician>, e: Option<Executive>) -> JoinedRow {
        JoinedRow {
            organization: org(id),
            physician: p,
            executive: e,
        }
    }

    #[test]
    fn test_physician_with_only_business_email_is_excluded() {
        let p = physician("Ann", None, None);
        assert!(p.business_email.is_some());
        assert!(!physician_has_valid_contact(&p));
        assert!(physician_has_valid_contact(&physician("Ann", Some("ann@direct.example"), None)));
        assert!(physician_has_valid_contact(&physician("Ann", None, Some("512-555-0100"))));
    }

    #[test]
    fn test_executive_with_only_linkedin_is_included() {
        assert!(executive_has_valid_contact(&executive("Bob", Some("https://linkedin.com/in/bob"))));
        assert!(!executive_has_valid_contact(&executive("Bob", None)));
        // LinkedIn alone is not enough for a physician: there is no field for it.
        assert!(!physician_has_valid_contact(&Physician::default()));
    }

    #[test]
    fn test_groups_rows_by_organization_in_first_seen_order() {
        let alice = physician("Alice", Some("alice@direct.example"), None);
        let carol = executive("Carol", Some("https://linkedin.com/in/carol"));
        let rows = vec![
            row("B", Some(alice.clone()), Some(carol.clone())),
            row("A", None, None),
            row("B", Some(alice.clone()), None),
            row("B", None, Some(carol.clone())),
        ];

        let (orgs, stats) = aggregate_rows(rows, true);
        let ids: Vec<&str> = orgs.iter().map(|o| o.definitive_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A"]);
        assert_eq!(orgs[0].physicians, vec![alice]);
        assert_eq!(orgs[0].executives, vec![carol]);
        assert!(orgs[1].physicians.is_empty());
        assert_eq!(stats.rows, 4);
        assert_eq!(stats.organizations, 2);
        assert_eq!(stats.physicians, 1);
        assert_eq!(stats.executives, 1);
    }

    #[test]
    fn test_filters_invalid_and_unnamed_contacts() {
        let unreachable = physician("Dan", None, None);
        let mut unnamed = physician("", Some("x@direct.example"), None);
        unnamed.first_name = None;
        let rows = vec![
            row("A", Some(unreachable), Some(executive("Eve", None))),
            row("A", Some(unnamed), None),
        ];

        let (orgs, stats) = aggregate_rows(rows, true);
        assert_eq!(orgs.len(), 1);
        assert!(orgs[0].physicians.is_empty());
        assert!(orgs[0].executives.is_empty());
        assert_eq!(stats.contacts_rejected, 2);
    }

    #[test]
    fn test_structurally_different_contacts_are_kept() {
        let first = physician("Fay", Some("fay@direct.example"), None);
        let mut second = first.clone();
        second.mobile_phone_primary = Some("512-555-0199".to_string());
        let rows = vec![row("A", Some(first), None), row("A", Some(second), None)];

        let (orgs, _) = aggregate_rows(rows, true);
        assert_eq!(orgs[0].physicians.len(), 2);
    }

    #[test]
    fn test_without_contacts_ignores_contact_columns() {
        let rows = vec![
            row("A", Some(physician("Gus", Some("gus@direct.example"), None)), None),
            row("B", None, Some(executive("Hal", Some("https://linkedin.com/in/hal")))),
        ];
        let (orgs, stats) = aggregate_rows(rows, false);
        assert_eq!(orgs.len(), 2);
        assert!(orgs.iter().all(|o| o.physicians.is_empty() && o.executives.is_empty()));
        assert_eq!(stats.physicians + stats.executives, 0);
    }

    #[test]
    fn test_retain_valid_contacts() {
        let mut organization = org("A");
        organization.physicians = vec![
            physician("Ida", None, None),
            physician("Jon", None, Some("512-555-0123")),
        ];
        organization.executives = vec![executive("Kim", None), executive("Lou", Some("li/lou"))];
        retain_valid_contacts(&mut organization);
        assert_eq!(organization.physicians.len(), 1);
        assert_eq!(organization.physicians[0].first_name.as_deref(), Some("Jon"));
        assert_eq!(organization.executives.len(), 1);
        assert_eq!(organization.executives[0].first_name.as_deref(), Some("Lou"));
    }
}
