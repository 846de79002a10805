//! ACL rule-set controller.
//!
//! An instance carries exactly one rule set, so the rule set shares the
//! instance's localized identifier. Writes replace every rule at once.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::ScalewayApi;
use crate::api::types::AclRuleRequest;
use crate::diff::{AclRuleConfig, canonicalize_acl_rules, ids_equal, reconcile_acl_rules};
use crate::error::{ProviderError, tolerate_not_found};
use crate::locality::{self, LocalityCheck, LocalizedId, Region};
use crate::provider::Provider;
use crate::resource::{Plan, PlanBuilder};
use crate::wait::{ConflictRetry, Operation};

/// Declared rule set.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AclConfig {
    /// Region; defaults to the instance region.
    #[serde(default)]
    pub region: Option<String>,
    /// Instance the rules protect.
    pub instance_id: String,
    /// Allowed ranges.
    pub rules: Vec<AclRuleConfig>,
}

/// Persisted rule set.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AclState {
    /// Localized instance identifier.
    pub id: String,
    /// Region of the instance.
    pub region: Region,
    /// `<region>/<uuid>` of the instance.
    pub instance_id: String,
    /// Rules in canonical order, followed by any drift found on read.
    pub rules: Vec<AclRuleConfig>,
}

impl<C: ScalewayApi> Provider<C> {
    /// Checks a declared rule set against its prior state.
    ///
    /// # Errors
    ///
    /// Returns locality errors and [`ProviderError::InvalidAttribute`] for a
    /// malformed or duplicated range.
    pub fn plan_acl(&self, prior: Option<&AclState>, config: &AclConfig) -> Result<Plan, ProviderError> {
        let region = self.region_for(config.region.as_deref(), &config.instance_id)?;
        LocalityCheck::new(region.clone())
            .attribute("instance_id", Some(config.instance_id.as_str()))
            .verify()?;
        let canonical = canonicalize_acl_rules(&config.rules)?;
        let Some(state) = prior else {
            return Ok(Plan::Create);
        };
        Ok(PlanBuilder::default()
            .replace_if("instance_id", !ids_equal(&config.instance_id, &state.instance_id))
            .replace_if("region", region != state.region)
            .update_if(canonical != state.rules)
            .build())
    }

    /// Installs the declared rules.
    ///
    /// # Errors
    ///
    /// Returns plan errors, remote failures and deadline outcomes.
    pub async fn create_acl(&self, op: &Operation, config: &AclConfig) -> Result<AclState, ProviderError> {
        self.plan_acl(None, config)?;
        self.apply_acl(op, config).await
    }

    /// Refreshes the rule set, keeping undeclared remote rules and warning
    /// about them. `None` means the instance is gone.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidId`] for a malformed identifier,
    /// non-404 remote failures and deadline outcomes.
    pub async fn read_acl(&self, op: &Operation, prior: &AclState) -> Result<Option<AclState>, ProviderError> {
        let (scope, instance_id) = locality::parse_localized(&prior.id)?;
        let region = scope.region();
        let listed = op
            .deadline
            .guard("list_instance_acl_rules", &instance_id, async {
                Ok(self
                    .client
                    .list_instance_acl_rules(&region, &instance_id)
                    .await?)
            })
            .await;
        let Some(observed) = tolerate_not_found(listed)? else {
            return Ok(None);
        };
        let rules = reconcile_acl_rules(&prior.rules, &observed, &op.diagnostics);
        Ok(Some(AclState {
            id: prior.id.clone(),
            instance_id: locality::format_localized(&region, &instance_id),
            region,
            rules,
        }))
    }

    /// Replaces the remote rules with the declared ones.
    ///
    /// # Errors
    ///
    /// Returns plan errors (a required replacement surfaces as
    /// [`ProviderError::InvalidAttribute`]), remote failures and deadline
    /// outcomes.
    pub async fn update_acl(
        &self,
        op: &Operation,
        prior: &AclState,
        config: &AclConfig,
    ) -> Result<AclState, ProviderError> {
        if let Plan::Replace { attributes } = self.plan_acl(Some(prior), config)? {
            return Err(ProviderError::invalid_attribute(
                &attributes.join(","),
                "cannot change in place; the rule set must be replaced",
            ));
        }
        self.apply_acl(op, config).await
    }

    /// Removes the rules recorded in state.
    ///
    /// # Errors
    ///
    /// Returns non-404 remote failures and deadline outcomes.
    pub async fn delete_acl(&self, op: &Operation, state: &AclState) -> Result<(), ProviderError> {
        let (scope, instance_id) = locality::parse_localized(&state.id)?;
        let region = scope.region();
        let ips: Vec<String> = state.rules.iter().map(|rule| rule.ip.clone()).collect();
        if ips.is_empty() {
            return Ok(());
        }
        info!(instance_id = %instance_id, rules = ips.len(), "deleting ACL rules");
        let deleted = ConflictRetry::new(&op.deadline, self.retry_interval)
            .run(
                "delete_instance_acl_rules",
                &instance_id,
                || async {
                    Ok(self
                        .client
                        .delete_instance_acl_rules(&region, &instance_id, &ips)
                        .await?)
                },
                || async {
                    self.wait_for_instance(&op.deadline, &region, &instance_id)
                        .await
                        .map(|_| ())
                },
            )
            .await;
        tolerate_not_found(deleted)?;
        Ok(())
    }

    async fn apply_acl(&self, op: &Operation, config: &AclConfig) -> Result<AclState, ProviderError> {
        let region = self.region_for(config.region.as_deref(), &config.instance_id)?;
        let instance_id = locality::expand_id(&config.instance_id);
        let rules = canonicalize_acl_rules(&config.rules)?;
        let requests: Vec<AclRuleRequest> = rules.iter().map(AclRuleRequest::from).collect();

        self.wait_for_instance(&op.deadline, &region, instance_id)
            .await?;
        info!(instance_id, rules = requests.len(), "setting ACL rules");
        ConflictRetry::new(&op.deadline, self.retry_interval)
            .run(
                "set_instance_acl_rules",
                instance_id,
                || async {
                    Ok(self
                        .client
                        .set_instance_acl_rules(&region, instance_id, &requests)
                        .await?)
                },
                || async {
                    self.wait_for_instance(&op.deadline, &region, instance_id)
                        .await
                        .map(|_| ())
                },
            )
            .await?;
        self.wait_for_instance(&op.deadline, &region, instance_id)
            .await?;

        Ok(AclState {
            id: LocalizedId::new(region.clone(), instance_id).to_string(),
            instance_id: locality::format_localized(&region, instance_id),
            region,
            rules,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::api::types::AclRule;
    use crate::diagnostics::WarningKind;
    use crate::test_support::{FakeScaleway, sample_instance};

    fn setup() -> (FakeScaleway, Provider<FakeScaleway>) {
        let region = Region::parse("fr-par").unwrap_or_else(|err| panic!("region: {err}"));
        let fake = FakeScaleway::new();
        fake.seed_instance(sample_instance("db1", &region));
        let provider = Provider::new(fake.clone())
            .with_default_region(region)
            .with_retry_interval(Duration::from_secs(1));
        (fake, provider)
    }

    fn declared(rules: &[(&str, &str)]) -> AclConfig {
        AclConfig {
            region: None,
            instance_id: String::from("fr-par/db1"),
            rules: rules
                .iter()
                .map(|(ip, description)| AclRuleConfig::new(*ip, *description))
                .collect(),
        }
    }

    fn operation() -> Operation {
        Operation::with_timeout(Duration::from_secs(600))
    }

    #[tokio::test(start_paused = true)]
    async fn create_submits_canonical_sorted_rules() {
        let (fake, provider) = setup();
        let state = provider
            .create_acl(
                &operation(),
                &declared(&[("10.1.2.3/8", "lan"), ("1.2.3.4", "office")]),
            )
            .await
            .unwrap_or_else(|err| panic!("create: {err}"));

        assert_eq!(state.id, "fr-par/db1");
        let remote: Vec<String> = fake
            .acl_rules("db1")
            .into_iter()
            .map(|rule| rule.ip)
            .collect();
        assert_eq!(remote, ["1.2.3.4/32", "10.0.0.0/8"]);
        assert_eq!(
            state.rules,
            [
                AclRuleConfig::new("1.2.3.4/32", "office"),
                AclRuleConfig::new("10.0.0.0/8", "lan"),
            ]
        );
        assert_eq!(
            provider
                .plan_acl(
                    Some(&state),
                    &declared(&[("1.2.3.4/32", "office"), ("10.0.0.0/8", "lan")])
                )
                .ok(),
            Some(Plan::NoOp)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_ranges_are_rejected_before_any_call() {
        let (fake, provider) = setup();
        let err = provider
            .create_acl(
                &operation(),
                &declared(&[("1.2.3.4", "a"), ("1.2.3.4/32", "b")]),
            )
            .await
            .expect_err("duplicate must fail");
        assert!(matches!(err, ProviderError::InvalidAttribute { .. }), "{err:?}");
        assert!(fake.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn read_keeps_undeclared_remote_rules_and_warns() {
        let (fake, provider) = setup();
        let op = operation();
        let state = provider
            .create_acl(&op, &declared(&[("1.2.3.4/32", "foo")]))
            .await
            .unwrap_or_else(|err| panic!("create: {err}"));
        fake.seed_acl_rules(
            "db1",
            vec![
                AclRule {
                    ip: String::from("1.2.3.4/32"),
                    description: String::from("foo"),
                    ..AclRule::default()
                },
                AclRule {
                    ip: String::from("9.9.9.9/32"),
                    description: String::from("injected"),
                    ..AclRule::default()
                },
            ],
        );

        let refreshed = provider
            .read_acl(&op, &state)
            .await
            .unwrap_or_else(|err| panic!("read: {err}"))
            .unwrap_or_else(|| panic!("rule set vanished"));

        assert_eq!(
            refreshed.rules,
            [
                AclRuleConfig::new("1.2.3.4/32", "foo"),
                AclRuleConfig::new("9.9.9.9/32", "injected"),
            ]
        );
        let drift = op.diagnostics.of_kind(WarningKind::AclDrift);
        assert_eq!(drift.len(), 1);
        assert!(
            drift.iter().any(|warning| warning.summary.contains("9.9.9.9/32")),
            "{drift:?}"
        );
        assert_eq!(
            provider
                .plan_acl(Some(&refreshed), &declared(&[("1.2.3.4/32", "foo")]))
                .ok(),
            Some(Plan::Update)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn delete_removes_recorded_rules_only() {
        let (fake, provider) = setup();
        let op = operation();
        let state = provider
            .create_acl(&op, &declared(&[("1.2.3.4/32", "foo")]))
            .await
            .unwrap_or_else(|err| panic!("create: {err}"));
        fake.seed_acl_rules(
            "db1",
            vec![
                AclRule {
                    ip: String::from("1.2.3.4/32"),
                    ..AclRule::default()
                },
                AclRule {
                    ip: String::from("8.8.8.8/32"),
                    ..AclRule::default()
                },
            ],
        );

        provider
            .delete_acl(&op, &state)
            .await
            .unwrap_or_else(|err| panic!("delete: {err}"));

        let remaining: Vec<String> = fake
            .acl_rules("db1")
            .into_iter()
            .map(|rule| rule.ip)
            .collect();
        assert_eq!(remaining, ["8.8.8.8/32"]);
    }
}
