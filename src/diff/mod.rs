//! Diff helpers shared by plans and reads.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::str::FromStr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::api::types::{AclRule, AclRuleRequest, Permission, Privilege};
use crate::diagnostics::{Diagnostic, Diagnostics, WarningKind};
use crate::error::ProviderError;
use crate::locality;

/// Compares two identifiers, ignoring any locality prefix.
#[must_use]
pub fn ids_equal(lhs: &str, rhs: &str) -> bool {
    locality::expand_id(lhs) == locality::expand_id(rhs)
}

/// Compares optional identifiers with [`ids_equal`].
#[must_use]
pub fn optional_ids_equal(lhs: Option<&str>, rhs: Option<&str>) -> bool {
    match (lhs, rhs) {
        (Some(left), Some(right)) => ids_equal(left, right),
        (None, None) => true,
        _ => false,
    }
}

/// One declared ACL rule.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct AclRuleConfig {
    /// Allowed range; a bare address means a single host.
    pub ip: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

impl AclRuleConfig {
    /// Builds a rule.
    #[must_use]
    pub fn new(ip: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            description: description.into(),
        }
    }
}

impl From<&AclRuleConfig> for AclRuleRequest {
    fn from(rule: &AclRuleConfig) -> Self {
        Self {
            ip: rule.ip.clone(),
            description: rule.description.clone(),
        }
    }
}

/// Parses `value` and masks it to its network address.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidAttribute`] when `value` is neither an
/// address nor a CIDR range.
pub fn canonical_network(value: &str) -> Result<IpNetwork, ProviderError> {
    let parsed = IpNetwork::from_str(value.trim()).map_err(|err| {
        ProviderError::invalid_attribute("acl_rules.ip", format!("'{value}': {err}"))
    })?;
    IpNetwork::new(parsed.network(), parsed.prefix())
        .map_err(|err| ProviderError::invalid_attribute("acl_rules.ip", err.to_string()))
}

fn address_bytes(address: IpAddr) -> Vec<u8> {
    match address {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    }
}

fn compare_networks(lhs: &IpNetwork, rhs: &IpNetwork) -> Ordering {
    address_bytes(lhs.network())
        .cmp(&address_bytes(rhs.network()))
        .then(lhs.prefix().cmp(&rhs.prefix()))
}

/// Canonicalises declared rules: masks each range, sorts by network
/// address and rejects duplicates.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidAttribute`] for a malformed or duplicated
/// range.
pub fn canonicalize_acl_rules(rules: &[AclRuleConfig]) -> Result<Vec<AclRuleConfig>, ProviderError> {
    let mut parsed = Vec::with_capacity(rules.len());
    for rule in rules {
        parsed.push((canonical_network(&rule.ip)?, rule.description.clone()));
    }
    parsed.sort_by(|(lhs, _), (rhs, _)| compare_networks(lhs, rhs));
    let mut seen = BTreeSet::new();
    let mut canonical = Vec::with_capacity(parsed.len());
    for (network, description) in parsed {
        let cidr = network.to_string();
        if !seen.insert(cidr.clone()) {
            return Err(ProviderError::invalid_attribute(
                "acl_rules",
                format!("duplicate rule for {cidr}"),
            ));
        }
        canonical.push(AclRuleConfig::new(cidr, description));
    }
    Ok(canonical)
}

fn cidr_key(value: &str) -> String {
    canonical_network(value).map_or_else(|_| value.trim().to_owned(), |network| network.to_string())
}

/// Merges observed rules into the declared list.
///
/// Declared rules found remotely take the remote description; declared
/// rules missing remotely are dropped. Remote rules that were never
/// declared are appended and reported as [`WarningKind::AclDrift`].
#[must_use]
pub fn reconcile_acl_rules(
    declared: &[AclRuleConfig],
    observed: &[AclRule],
    diagnostics: &Diagnostics,
) -> Vec<AclRuleConfig> {
    let remote: BTreeMap<String, &AclRule> = observed
        .iter()
        .map(|rule| (cidr_key(&rule.ip), rule))
        .collect();
    let declared_keys: BTreeSet<String> = declared.iter().map(|rule| cidr_key(&rule.ip)).collect();

    let mut merged: Vec<AclRuleConfig> = declared
        .iter()
        .filter_map(|rule| {
            remote
                .get(&cidr_key(&rule.ip))
                .map(|found| AclRuleConfig::new(rule.ip.clone(), found.description.clone()))
        })
        .collect();

    for rule in observed {
        let key = cidr_key(&rule.ip);
        if declared_keys.contains(&key) {
            continue;
        }
        diagnostics.warn(Diagnostic {
            kind: WarningKind::AclDrift,
            summary: format!("ACL rule {key} exists remotely but is not declared"),
            detail: format!(
                "rule {key} ({}) was added outside this configuration; it is kept in state so the next plan shows the difference",
                rule.description
            ),
            attribute: Some(String::from("acl_rules")),
        });
        merged.push(AclRuleConfig::new(key, rule.description.clone()));
    }
    merged
}

/// Grants and revocations turning one privilege set into another.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PrivilegeDiff {
    /// Privileges to set, new or with a changed permission.
    pub grant: Vec<Privilege>,
    /// Privileges to reset to [`Permission::None`].
    pub revoke: Vec<Privilege>,
}

impl PrivilegeDiff {
    /// Computes the batches turning `current` into `desired`, keyed by
    /// database and user. A `none` permission counts as absent.
    #[must_use]
    pub fn between(current: &[Privilege], desired: &[Privilege]) -> Self {
        let index = |privileges: &[Privilege]| -> BTreeMap<(String, String), Permission> {
            privileges
                .iter()
                .filter(|privilege| privilege.permission != Permission::None)
                .map(|privilege| {
                    (
                        (privilege.database_name.clone(), privilege.user_name.clone()),
                        privilege.permission,
                    )
                })
                .collect()
        };
        let before = index(current);
        let after = index(desired);
        let to_privilege = |(database_name, user_name): &(String, String), permission| Privilege {
            permission,
            database_name: database_name.clone(),
            user_name: user_name.clone(),
        };

        let grant = after
            .iter()
            .filter(|(key, permission)| before.get(*key) != Some(*permission))
            .map(|(key, permission)| to_privilege(key, *permission))
            .collect();
        let revoke = before
            .keys()
            .filter(|key| !after.contains_key(*key))
            .map(|key| to_privilege(key, Permission::None))
            .collect();
        Self { grant, revoke }
    }

    /// Returns true when nothing changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grant.is_empty() && self.revoke.is_empty()
    }
}

#[cfg(test)]
mod tests;
