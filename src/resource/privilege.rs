//! Privilege controller.
//!
//! A privilege is the permission one user holds on one database. Removing
//! it means setting the permission back to `none`.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::ScalewayApi;
use crate::api::types::{Permission, Privilege, SetPrivilegeRequest};
use crate::diff::{PrivilegeDiff, ids_equal};
use crate::error::{ProviderError, tolerate_not_found};
use crate::locality::{self, LocalityCheck, Region};
use crate::provider::Provider;
use crate::resource::{Plan, PlanBuilder};
use crate::wait::{ConflictRetry, Operation};

/// Declared privilege.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PrivilegeConfig {
    /// Region; defaults to the instance region.
    #[serde(default)]
    pub region: Option<String>,
    /// Owning instance, bare or localized.
    pub instance_id: String,
    /// Database the permission applies to.
    pub database_name: String,
    /// Grantee.
    pub user_name: String,
    /// Access level.
    pub permission: Permission,
}

/// Persisted privilege.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PrivilegeState {
    /// `<region>/<instance>/<database>/<user>`.
    pub id: String,
    /// Region of the owning instance.
    pub region: Region,
    /// `<region>/<uuid>` of the owning instance.
    pub instance_id: String,
    /// Database the permission applies to.
    pub database_name: String,
    /// Grantee.
    pub user_name: String,
    /// Access level.
    pub permission: Permission,
}

/// Decoded privilege identifier.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PrivilegeId {
    /// Region of the owning instance.
    pub region: Region,
    /// Bare instance identifier.
    pub instance_id: String,
    /// Database name.
    pub database_name: String,
    /// User name.
    pub user_name: String,
}

impl PrivilegeId {
    /// Parses `<region>/<instance>/<database>/<user>`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidId`] for any other shape.
    pub fn parse(value: &str) -> Result<Self, ProviderError> {
        let (scope, parts) = locality::split_localized(value, 3)?;
        let [instance_id, database_name, user_name] = parts.as_slice() else {
            return Err(ProviderError::InvalidId {
                value: value.to_owned(),
                reason: String::from("expected <region>/<instance>/<database>/<user>"),
            });
        };
        Ok(Self {
            region: scope.region(),
            instance_id: (*instance_id).to_owned(),
            database_name: (*database_name).to_owned(),
            user_name: (*user_name).to_owned(),
        })
    }

    fn privilege(&self, permission: Permission) -> Privilege {
        Privilege {
            permission,
            database_name: self.database_name.clone(),
            user_name: self.user_name.clone(),
        }
    }

    fn state(&self, permission: Permission) -> PrivilegeState {
        PrivilegeState {
            id: self.to_string(),
            region: self.region.clone(),
            instance_id: locality::format_localized(&self.region, &self.instance_id),
            database_name: self.database_name.clone(),
            user_name: self.user_name.clone(),
            permission,
        }
    }
}

impl std::fmt::Display for PrivilegeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.region, self.instance_id, self.database_name, self.user_name
        )
    }
}

impl<C: ScalewayApi> Provider<C> {
    /// Checks a declared privilege against its prior state.
    ///
    /// # Errors
    ///
    /// Returns locality errors.
    pub fn plan_privilege(
        &self,
        prior: Option<&PrivilegeState>,
        config: &PrivilegeConfig,
    ) -> Result<Plan, ProviderError> {
        let region = self.region_for(config.region.as_deref(), &config.instance_id)?;
        LocalityCheck::new(region.clone())
            .attribute("instance_id", Some(config.instance_id.as_str()))
            .verify()?;
        let Some(state) = prior else {
            return Ok(Plan::Create);
        };
        Ok(PlanBuilder::default()
            .replace_if("instance_id", !ids_equal(&config.instance_id, &state.instance_id))
            .replace_if("database_name", config.database_name != state.database_name)
            .replace_if("user_name", config.user_name != state.user_name)
            .replace_if("region", region != state.region)
            .update_if(config.permission != state.permission)
            .build())
    }

    /// Grants the declared permission.
    ///
    /// # Errors
    ///
    /// Returns plan errors, remote failures and deadline outcomes.
    pub async fn create_privilege(
        &self,
        op: &Operation,
        config: &PrivilegeConfig,
    ) -> Result<PrivilegeState, ProviderError> {
        self.plan_privilege(None, config)?;
        let id = PrivilegeId {
            region: self.region_for(config.region.as_deref(), &config.instance_id)?,
            instance_id: locality::expand_id(&config.instance_id).to_owned(),
            database_name: config.database_name.clone(),
            user_name: config.user_name.clone(),
        };
        self.set_permission(op, &id, config.permission).await?;
        Ok(id.state(config.permission))
    }

    /// Refreshes a privilege; `None` means the grant, its user or its
    /// instance is gone.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidId`] for a malformed identifier,
    /// non-404 remote failures and deadline outcomes.
    pub async fn read_privilege(
        &self,
        op: &Operation,
        prior: &PrivilegeState,
    ) -> Result<Option<PrivilegeState>, ProviderError> {
        let id = PrivilegeId::parse(&prior.id)?;
        let listed = op
            .deadline
            .guard("list_privileges", &id.instance_id, async {
                Ok(self
                    .client
                    .list_privileges(
                        &id.region,
                        &id.instance_id,
                        Some(&id.database_name),
                        Some(&id.user_name),
                    )
                    .await?)
            })
            .await;
        let found = tolerate_not_found(listed)?
            .unwrap_or_default()
            .into_iter()
            .find(|privilege| {
                privilege.database_name == id.database_name && privilege.user_name == id.user_name
            });
        Ok(found.map(|privilege| id.state(privilege.permission)))
    }

    /// Changes the granted permission.
    ///
    /// # Errors
    ///
    /// Returns plan errors (a required replacement surfaces as
    /// [`ProviderError::InvalidAttribute`]), remote failures and deadline
    /// outcomes.
    pub async fn update_privilege(
        &self,
        op: &Operation,
        prior: &PrivilegeState,
        config: &PrivilegeConfig,
    ) -> Result<PrivilegeState, ProviderError> {
        if let Plan::Replace { attributes } = self.plan_privilege(Some(prior), config)? {
            return Err(ProviderError::invalid_attribute(
                &attributes.join(","),
                "cannot change in place; the privilege must be replaced",
            ));
        }
        let id = PrivilegeId::parse(&prior.id)?;
        let diff = PrivilegeDiff::between(
            &[id.privilege(prior.permission)],
            &[id.privilege(config.permission)],
        );
        for change in diff.grant.iter().chain(&diff.revoke) {
            self.set_permission(op, &id, change.permission).await?;
        }
        Ok(id.state(config.permission))
    }

    /// Revokes a privilege. Nothing is sent when the user no longer exists.
    ///
    /// # Errors
    ///
    /// Returns non-404 remote failures and deadline outcomes.
    pub async fn delete_privilege(
        &self,
        op: &Operation,
        state: &PrivilegeState,
    ) -> Result<(), ProviderError> {
        let id = PrivilegeId::parse(&state.id)?;
        let listed = op
            .deadline
            .guard("list_users", &id.instance_id, async {
                Ok(self
                    .client
                    .list_users(&id.region, &id.instance_id, Some(&id.user_name))
                    .await?)
            })
            .await;
        let users = tolerate_not_found(listed)?.unwrap_or_default();
        if users.is_empty() {
            info!(privilege = %id, "user is gone; nothing to revoke");
            return Ok(());
        }
        let revoked = self.set_permission(op, &id, Permission::None).await;
        tolerate_not_found(revoked)?;
        Ok(())
    }

    async fn set_permission(
        &self,
        op: &Operation,
        id: &PrivilegeId,
        permission: Permission,
    ) -> Result<(), ProviderError> {
        let request = SetPrivilegeRequest {
            database_name: id.database_name.clone(),
            user_name: id.user_name.clone(),
            permission,
        };
        info!(privilege = %id, permission = permission.as_str(), "setting privilege");
        ConflictRetry::new(&op.deadline, self.retry_interval)
            .run(
                "set_privilege",
                &id.instance_id,
                || async {
                    Ok(self
                        .client
                        .set_privilege(&id.region, &id.instance_id, &request)
                        .await?)
                },
                || async {
                    self.wait_for_instance(&op.deadline, &id.region, &id.instance_id)
                        .await
                        .map(|_| ())
                },
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::*;
    use crate::api::{ApiError, RdbApi};
    use crate::api::types::User;
    use crate::test_support::{FakeScaleway, sample_instance};

    fn setup() -> (FakeScaleway, Provider<FakeScaleway>) {
        let region = Region::parse("fr-par").unwrap_or_else(|err| panic!("region: {err}"));
        let fake = FakeScaleway::new();
        fake.seed_instance(sample_instance("db1", &region));
        fake.seed_user(
            "db1",
            User {
                name: String::from("alice"),
                is_admin: false,
            },
            "pw",
        );
        let provider = Provider::new(fake.clone())
            .with_default_region(region)
            .with_retry_interval(Duration::from_secs(1));
        (fake, provider)
    }

    fn declared(permission: Permission) -> PrivilegeConfig {
        PrivilegeConfig {
            region: None,
            instance_id: String::from("fr-par/db1"),
            database_name: String::from("orders"),
            user_name: String::from("alice"),
            permission,
        }
    }

    fn operation() -> Operation {
        Operation::with_timeout(Duration::from_secs(600))
    }

    #[rstest]
    #[case("fr-par/db1/orders/alice", true)]
    #[case("fr-par/db1/orders", false)]
    #[case("fr-par/db1/orders/alice/extra", false)]
    #[case("nowhere/db1/orders/alice", false)]
    fn identifiers_have_four_segments(#[case] value: &str, #[case] valid: bool) {
        let parsed = PrivilegeId::parse(value);
        assert_eq!(parsed.is_ok(), valid, "{value}: {parsed:?}");
        if let Ok(id) = parsed {
            assert_eq!(id.to_string(), value);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn grant_retries_conflicts_then_updates_in_place() {
        let (fake, provider) = setup();
        let op = operation();
        fake.fail_next("set_privilege", ApiError::Conflict(String::from("busy")));

        let state = provider
            .create_privilege(&op, &declared(Permission::Readonly))
            .await
            .unwrap_or_else(|err| panic!("create: {err}"));
        assert_eq!(state.id, "fr-par/db1/orders/alice");
        assert_eq!(fake.call_count("set_privilege"), 2);

        assert_eq!(
            provider
                .plan_privilege(Some(&state), &declared(Permission::All))
                .ok(),
            Some(Plan::Update)
        );
        let updated = provider
            .update_privilege(&op, &state, &declared(Permission::All))
            .await
            .unwrap_or_else(|err| panic!("update: {err}"));
        assert_eq!(updated.permission, Permission::All);
        let read = provider
            .read_privilege(&op, &updated)
            .await
            .unwrap_or_else(|err| panic!("read: {err}"));
        assert_eq!(read.map(|found| found.permission), Some(Permission::All));
    }

    #[tokio::test(start_paused = true)]
    async fn update_sends_only_real_changes() {
        let (fake, provider) = setup();
        let op = operation();
        let state = provider
            .create_privilege(&op, &declared(Permission::Readwrite))
            .await
            .unwrap_or_else(|err| panic!("create: {err}"));
        fake.clear_calls();

        provider
            .update_privilege(&op, &state, &declared(Permission::Readwrite))
            .await
            .unwrap_or_else(|err| panic!("unchanged update: {err}"));
        assert_eq!(fake.call_count("set_privilege"), 0);

        let revoked = provider
            .update_privilege(&op, &state, &declared(Permission::None))
            .await
            .unwrap_or_else(|err| panic!("revoking update: {err}"));
        assert_eq!(revoked.permission, Permission::None);
        let details: Vec<String> = fake
            .calls_named("set_privilege")
            .into_iter()
            .map(|call| call.detail)
            .collect();
        assert_eq!(details, ["orders/alice=none"]);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_sets_permission_to_none() {
        let (fake, provider) = setup();
        let op = operation();
        let state = provider
            .create_privilege(&op, &declared(Permission::Readwrite))
            .await
            .unwrap_or_else(|err| panic!("create: {err}"));
        fake.clear_calls();

        provider
            .delete_privilege(&op, &state)
            .await
            .unwrap_or_else(|err| panic!("delete: {err}"));

        let details: Vec<String> = fake
            .calls_named("set_privilege")
            .into_iter()
            .map(|call| call.detail)
            .collect();
        assert_eq!(details, ["orders/alice=none"]);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_is_a_noop_when_the_user_is_gone() {
        let (fake, provider) = setup();
        let op = operation();
        let state = provider
            .create_privilege(&op, &declared(Permission::Readwrite))
            .await
            .unwrap_or_else(|err| panic!("create: {err}"));
        provider
            .client()
            .delete_user(&state.region, "db1", "alice")
            .await
            .unwrap_or_else(|err| panic!("drop user: {err}"));
        fake.clear_calls();

        provider
            .delete_privilege(&op, &state)
            .await
            .unwrap_or_else(|err| panic!("delete: {err}"));

        assert_eq!(fake.call_count("list_users"), 1);
        assert_eq!(fake.call_count("set_privilege"), 0);
    }
}
