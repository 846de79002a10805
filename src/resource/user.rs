//! Database user controller.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::ScalewayApi;
use crate::api::types::{CreateUserRequest, UpdateUserRequest, User};
use crate::diff::ids_equal;
use crate::error::{ProviderError, tolerate_not_found};
use crate::locality::{self, LocalityCheck, LocalizedId, Region};
use crate::provider::Provider;
use crate::resource::{PasswordConfig, PasswordState, Plan, PlanBuilder};
use crate::wait::{ConflictRetry, Operation};

/// Declared database user.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct UserConfig {
    /// Region; defaults to the instance region.
    #[serde(default)]
    pub region: Option<String>,
    /// Owning instance, bare or localized.
    pub instance_id: String,
    /// User name.
    pub name: String,
    /// Password source.
    pub password: PasswordConfig,
    /// Grants administrator rights.
    #[serde(default)]
    pub is_admin: bool,
}

/// Persisted database user.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct UserState {
    /// `<region>/<instance>/<name>`.
    pub id: String,
    /// Region of the owning instance.
    pub region: Region,
    /// `<region>/<uuid>` of the owning instance.
    pub instance_id: String,
    /// User name.
    pub name: String,
    /// Administrator flag.
    pub is_admin: bool,
    /// Password source last applied.
    pub password: Option<PasswordState>,
}

fn user_state(
    region: &Region,
    instance_id: &str,
    user: User,
    password: Option<PasswordState>,
) -> UserState {
    UserState {
        id: LocalizedId::nested(region.clone(), instance_id, user.name.clone()).to_string(),
        region: region.clone(),
        instance_id: locality::format_localized(region, instance_id),
        name: user.name,
        is_admin: user.is_admin,
        password,
    }
}

fn user_update(prior: &UserState, config: &UserConfig) -> UpdateUserRequest {
    UpdateUserRequest {
        password: config
            .password
            .needs_update(prior.password.as_ref())
            .then(|| config.password.secret().to_owned()),
        is_admin: (config.is_admin != prior.is_admin).then_some(config.is_admin),
    }
}

const fn is_noop(request: &UpdateUserRequest) -> bool {
    request.password.is_none() && request.is_admin.is_none()
}

impl<C: ScalewayApi> Provider<C> {
    /// Checks a declared user against its prior state.
    ///
    /// # Errors
    ///
    /// Returns locality errors and [`ProviderError::InvalidAttribute`] for
    /// an empty name.
    pub fn plan_user(
        &self,
        prior: Option<&UserState>,
        config: &UserConfig,
    ) -> Result<Plan, ProviderError> {
        let region = self.region_for(config.region.as_deref(), &config.instance_id)?;
        LocalityCheck::new(region.clone())
            .attribute("instance_id", Some(config.instance_id.as_str()))
            .verify()?;
        if config.name.trim().is_empty() {
            return Err(ProviderError::invalid_attribute("name", "must not be empty"));
        }
        let Some(state) = prior else {
            return Ok(Plan::Create);
        };
        Ok(PlanBuilder::default()
            .replace_if("instance_id", !ids_equal(&config.instance_id, &state.instance_id))
            .replace_if("name", config.name != state.name)
            .replace_if("region", region != state.region)
            .update_if(!is_noop(&user_update(state, config)))
            .build())
    }

    /// Creates a user, retrying while the instance is busy.
    ///
    /// # Errors
    ///
    /// Returns plan errors, remote failures and deadline outcomes.
    pub async fn create_user(
        &self,
        op: &Operation,
        config: &UserConfig,
    ) -> Result<UserState, ProviderError> {
        self.plan_user(None, config)?;
        let region = self.region_for(config.region.as_deref(), &config.instance_id)?;
        let instance_id = locality::expand_id(&config.instance_id);
        let request = CreateUserRequest {
            name: config.name.clone(),
            password: config.password.secret().to_owned(),
            is_admin: config.is_admin,
        };
        info!(instance_id, user = %config.name, is_admin = config.is_admin, "creating user");
        let created = ConflictRetry::new(&op.deadline, self.retry_interval)
            .run(
                "create_user",
                instance_id,
                || async { Ok(self.client.create_user(&region, instance_id, &request).await?) },
                || async {
                    self.wait_for_instance(&op.deadline, &region, instance_id)
                        .await
                        .map(|_| ())
                },
            )
            .await?;
        Ok(user_state(
            &region,
            instance_id,
            created,
            Some(config.password.to_state()),
        ))
    }

    /// Refreshes a user; `None` means it or its instance is gone.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidId`] for a malformed identifier,
    /// non-404 remote failures and deadline outcomes.
    pub async fn read_user(
        &self,
        op: &Operation,
        prior: &UserState,
    ) -> Result<Option<UserState>, ProviderError> {
        let (scope, instance_id, name) = locality::parse_localized_nested(&prior.id)?;
        let region = scope.region();
        let listed = op
            .deadline
            .guard("list_users", &instance_id, async {
                Ok(self
                    .client
                    .list_users(&region, &instance_id, Some(&name))
                    .await?)
            })
            .await;
        let found = tolerate_not_found(listed)?
            .unwrap_or_default()
            .into_iter()
            .find(|user| user.name == name);
        Ok(found.map(|user| user_state(&region, &instance_id, user, prior.password.clone())))
    }

    /// Applies password and administrator changes.
    ///
    /// The password is sent only when its source changed as decided by
    /// [`PasswordConfig::needs_update`].
    ///
    /// # Errors
    ///
    /// Returns plan errors (a required replacement surfaces as
    /// [`ProviderError::InvalidAttribute`]), remote failures and deadline
    /// outcomes.
    pub async fn update_user(
        &self,
        op: &Operation,
        prior: &UserState,
        config: &UserConfig,
    ) -> Result<UserState, ProviderError> {
        if let Plan::Replace { attributes } = self.plan_user(Some(prior), config)? {
            return Err(ProviderError::invalid_attribute(
                &attributes.join(","),
                "cannot change in place; the user must be replaced",
            ));
        }
        let (scope, instance_id, name) = locality::parse_localized_nested(&prior.id)?;
        let region = scope.region();
        let request = user_update(prior, config);
        let password = Some(config.password.settled_state(prior.password.as_ref()));
        if is_noop(&request) {
            debug!(user = %prior.id, "user already matches declaration");
            return Ok(UserState {
                password,
                ..prior.clone()
            });
        }
        info!(
            user = %prior.id,
            password = request.password.is_some(),
            is_admin = ?request.is_admin,
            "updating user"
        );
        let updated = ConflictRetry::new(&op.deadline, self.retry_interval)
            .run(
                "update_user",
                &instance_id,
                || async {
                    Ok(self
                        .client
                        .update_user(&region, &instance_id, &name, &request)
                        .await?)
                },
                || async {
                    self.wait_for_instance(&op.deadline, &region, &instance_id)
                        .await
                        .map(|_| ())
                },
            )
            .await?;
        Ok(user_state(&region, &instance_id, updated, password))
    }

    /// Deletes a user; a missing user or instance counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns non-404 remote failures and deadline outcomes.
    pub async fn delete_user(&self, op: &Operation, state: &UserState) -> Result<(), ProviderError> {
        let (scope, instance_id, name) = locality::parse_localized_nested(&state.id)?;
        let region = scope.region();
        info!(user = %state.id, "deleting user");
        let deleted = ConflictRetry::new(&op.deadline, self.retry_interval)
            .run(
                "delete_user",
                &instance_id,
                || async { Ok(self.client.delete_user(&region, &instance_id, &name).await?) },
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
}
