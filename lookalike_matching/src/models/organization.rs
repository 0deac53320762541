// src/models/organization.rs
use serde::{Deserialize, Serialize};
use url::Url;

/// A physician attached to a reference organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Physician {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub primary_specialty: Option<String>,
    pub executive_flag: Option<bool>,
    pub business_email: Option<String>,
    pub direct_email_primary: Option<String>,
    pub direct_email_secondary: Option<String>,
    pub mobile_phone_primary: Option<String>,
    pub mobile_phone_secondary: Option<String>,
    pub group_name: Option<String>,
}

/// An executive attached to a reference organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Executive {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub physician_leader: Option<bool>,
    pub title: Option<String>,
    pub business_email: Option<String>,
    pub direct_email_primary: Option<String>,
    pub direct_email_secondary: Option<String>,
    pub mobile_phone_primary: Option<String>,
    pub mobile_phone_secondary: Option<String>,
    pub linkedin_profile: Option<String>,
    pub group_name: Option<String>,
}

/// Returns true when the field carries something other than whitespace.
pub(crate) fn is_populated(field: &Option<String>) -> bool {
    field.as_deref().map_or(false, |v| !v.trim().is_empty())
}

impl Physician {
    pub fn has_direct_email(&self) -> bool {
        is_populated(&self.direct_email_primary) || is_populated(&self.direct_email_secondary)
    }

    pub fn has_mobile_phone(&self) -> bool {
        is_populated(&self.mobile_phone_primary) || is_populated(&self.mobile_phone_secondary)
    }
}

impl Executive {
    pub fn has_direct_email(&self) -> bool {
        is_populated(&self.direct_email_primary) || is_populated(&self.direct_email_secondary)
    }

    pub fn has_mobile_phone(&self) -> bool {
        is_populated(&self.mobile_phone_primary) || is_populated(&self.mobile_phone_secondary)
    }

    pub fn has_linkedin(&self) -> bool {
        is_populated(&self.linkedin_profile)
    }
}

/// A candidate organization from the reference dataset.
///
/// `definitive_id` is the stable identifier; an aggregated result set never
/// holds two records with the same id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub definitive_id: String,
    pub physician_group_name: Option<String>,
    pub combined_main_specialty: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub physician_count: Option<i64>,
    pub ambulatory_emr: Option<String>,
    pub hs_id: Option<String>,
    pub website: Option<String>,
    #[serde(default)]
    pub physicians: Vec<Physician>,
    #[serde(default)]
    pub executives: Vec<Executive>,
}

impl Organization {
    pub fn new(definitive_id: impl Into<String>) -> Self {
        Self {
            definitive_id: definitive_id.into(),
            ..Default::default()
        }
    }

    /// Bare host of the organization's website, without scheme or `www.` prefix.
    pub fn domain(&self) -> Option<String> {
        let raw = self.website.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        let with_scheme = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("https://{}", raw)
        };
        let parsed = Url::parse(&with_scheme).ok()?;
        let host = parsed.host_str()?.to_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
        if host.is_empty() {
            None
        } else {
            Some(host)
        }
    }
}

/// One row of the organization × physician × executive left join.
/// The contact sides are `None` when the join produced no match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinedRow {
    pub organization: Organization,
    pub physician: Option<Physician>,
    pub executive: Option<Executive>,
}

impl JoinedRow {
    pub fn organization_only(organization: Organization) -> Self {
        Self {
            organization,
            physician: None,
            executive: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_strips_scheme_and_www() {
        let mut org = Organization::new("1");
        org.website = Some("https://www.AustinHeart.com/about".to_string());
        assert_eq!(org.domain().as_deref(), Some("austinheart.com"));
    }

    #[test]
    fn test_domain_without_scheme() {
        let mut org = Organization::new("1");
        org.website = Some("texascardio.org".to_string());
        assert_eq!(org.domain().as_deref(), Some("texascardio.org"));

        org.website = Some("   ".to_string());
        assert!(org.domain().is_none());

        org.website = None;
        assert!(org.domain().is_none());
    }

    #[test]
    fn test_contact_channel_helpers_ignore_whitespace() {
        let physician = Physician {
            direct_email_primary: Some("  ".to_string()),
            mobile_phone_secondary: Some("512-555-0100".to_string()),
            ..Default::default()
        };
        assert!(!physician.has_direct_email());
        assert!(physician.has_mobile_phone());

        let executive = Executive {
            linkedin_profile: Some("https://linkedin.com/in/jdoe".to_string()),
            ..Default::default()
        };
        assert!(executive.has_linkedin());
        assert!(!executive.has_direct_email());
    }
}
