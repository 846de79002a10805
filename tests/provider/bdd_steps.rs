//! BDD step definitions for provider behaviour.

use rstest_bdd_macros::{given, then, when};
use scaleway_provider::api::RdbApi;
use scaleway_provider::api::types::{
    AclRule, Database, InstanceStatus, Permission, User, VolumeType,
};
use scaleway_provider::diff::AclRuleConfig;
use scaleway_provider::endpoint::PrivateNetworkBlock;
use scaleway_provider::resource::acl::AclConfig;
use scaleway_provider::resource::instance::{InstanceConfig, InstanceState};
use scaleway_provider::resource::privilege::PrivilegeConfig;
use scaleway_provider::resource::{PasswordConfig, Plan};
use scaleway_provider::test_support::sample_instance;

use super::test_helpers::{
    ProviderContext, bare, block_on, list, operation, region, variant_name,
};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

fn base_config(node_type: &str) -> InstanceConfig {
    InstanceConfig {
        name: String::from("orders"),
        engine: String::from("PostgreSQL-15"),
        node_type: node_type.to_owned(),
        user_name: Some(String::from("admin")),
        password: Some(PasswordConfig::Inline(String::from("S3cret!first"))),
        ..InstanceConfig::default()
    }
}

fn create(provider_context: &mut ProviderContext, config: InstanceConfig) {
    let state = block_on(
        provider_context
            .provider
            .create_instance(&operation(), &config),
    )
    .unwrap_or_else(|err| panic!("instance creation should succeed: {err}"));
    provider_context.fake.clear_calls();
    provider_context.declared = Some(config);
    provider_context.instance = Some(state);
}

fn current(provider_context: &ProviderContext) -> (InstanceState, InstanceConfig) {
    let Some(state) = provider_context.instance.clone() else {
        panic!("test setup requires an instance");
    };
    let Some(declared) = provider_context.declared.clone() else {
        panic!("test setup requires a declaration");
    };
    (state, declared)
}

/// Applies `config` over the current state, recording the new state or the
/// failure. Calls made by earlier steps are forgotten first.
fn apply(mut provider_context: ProviderContext, config: InstanceConfig) -> ProviderContext {
    let (state, _) = current(&provider_context);
    provider_context.fake.clear_calls();
    let op = operation();
    match block_on(provider_context.provider.update_instance(&op, &state, &config)) {
        Ok(updated) => {
            provider_context.instance = Some(updated);
            provider_context.declared = Some(config);
            provider_context.failure = None;
        }
        Err(err) => provider_context.failure = Some(err),
    }
    provider_context.warnings = op.diagnostics.take();
    provider_context
}

fn expect_failure(provider_context: &ProviderContext, variant: &str) -> Result<(), StepError> {
    let Some(err) = provider_context.failure.as_ref() else {
        return Err(StepError::Assertion(String::from(
            "expected a failure, got success",
        )));
    };
    if variant_name(err) == variant {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {variant}, got: {err:?}"
        )))
    }
}

#[given("an instance created on local storage with node type \"{node_type}\"")]
fn instance_on_local_storage(
    mut provider_context: ProviderContext,
    node_type: String,
) -> ProviderContext {
    create(&mut provider_context, base_config(node_type.trim()));
    provider_context
}

#[given("an instance on block storage of {size:u64} GB")]
fn instance_on_block_storage(mut provider_context: ProviderContext, size: u64) -> ProviderContext {
    let config = InstanceConfig {
        volume_type: VolumeType::Sbs5k,
        volume_size_in_gb: Some(size),
        ..base_config("DB-DEV-S")
    };
    create(&mut provider_context, config);
    provider_context
}

#[given("the instance reports a full disk")]
fn instance_reports_full_disk(mut provider_context: ProviderContext) -> ProviderContext {
    let (state, _) = current(&provider_context);
    provider_context
        .fake
        .set_instance_status(&bare(&state.id), InstanceStatus::DiskFull);
    let refreshed = block_on(provider_context.provider.read_instance(&operation(), &state))
        .unwrap_or_else(|err| panic!("refresh should succeed: {err}"))
        .unwrap_or_else(|| panic!("instance should still exist"));
    provider_context.fake.clear_calls();
    provider_context.instance = Some(refreshed);
    provider_context
}

#[given("an instance attached to private network \"{pn_id}\" through IPAM")]
fn instance_with_ipam_endpoint(
    mut provider_context: ProviderContext,
    pn_id: String,
) -> ProviderContext {
    let config = InstanceConfig {
        private_network: Some(PrivateNetworkBlock {
            pn_id: pn_id.trim().to_owned(),
            service_ip: None,
            enable_ipam: true,
        }),
        ..base_config("DB-DEV-S")
    };
    create(&mut provider_context, config);
    provider_context
}

#[when("the volume moves to block storage of {size:u64} GB")]
fn volume_moves_to_block(provider_context: ProviderContext, size: u64) -> ProviderContext {
    let (_, declared) = current(&provider_context);
    let config = InstanceConfig {
        volume_type: VolumeType::Sbs5k,
        volume_size_in_gb: Some(size),
        ..declared
    };
    apply(provider_context, config)
}

#[when("the node type changes to \"{node_type}\"")]
fn node_type_changes(provider_context: ProviderContext, node_type: String) -> ProviderContext {
    let (_, declared) = current(&provider_context);
    let config = InstanceConfig {
        node_type: node_type.trim().to_owned(),
        ..declared
    };
    apply(provider_context, config)
}

#[when("the volume grows to {size:u64} GB alongside node type \"{node_type}\"")]
fn volume_grows_with_node_type(
    provider_context: ProviderContext,
    size: u64,
    node_type: String,
) -> ProviderContext {
    let (_, declared) = current(&provider_context);
    let config = InstanceConfig {
        node_type: node_type.trim().to_owned(),
        volume_size_in_gb: Some(size),
        ..declared
    };
    apply(provider_context, config)
}

#[when("a volume of {size:u64} GB is planned")]
fn volume_is_planned(mut provider_context: ProviderContext, size: u64) -> ProviderContext {
    let (state, declared) = current(&provider_context);
    let config = InstanceConfig {
        volume_size_in_gb: Some(size),
        ..declared
    };
    provider_context.failure = provider_context
        .provider
        .plan_instance(Some(&state), &config)
        .err();
    provider_context
}

#[when("the private network switches to the static address \"{service_ip}\"")]
fn private_network_goes_static(
    provider_context: ProviderContext,
    service_ip: String,
) -> ProviderContext {
    let (_, declared) = current(&provider_context);
    let pn_id = declared
        .private_network
        .as_ref()
        .map(|block| block.pn_id.clone())
        .unwrap_or_else(|| panic!("test setup requires a private network"));
    let config = InstanceConfig {
        private_network: Some(PrivateNetworkBlock {
            pn_id,
            service_ip: Some(service_ip.trim().to_owned()),
            enable_ipam: false,
        }),
        ..declared
    };
    apply(provider_context, config)
}

#[then("the upgrade requests are \"{expected}\"")]
fn upgrade_requests_are(provider_context: &ProviderContext, expected: String) -> Result<(), StepError> {
    if let Some(err) = provider_context.failure.as_ref() {
        return Err(StepError::Assertion(format!("apply failed: {err}")));
    }
    let details = provider_context.fake.upgrade_details();
    if details == list(&expected) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected upgrades {expected}, got {details:?}"
        )))
    }
}

#[then("the plan fails with \"{variant}\"")]
fn plan_fails_with(provider_context: &ProviderContext, variant: String) -> Result<(), StepError> {
    expect_failure(provider_context, variant.trim())
}

#[then("the apply fails with \"{variant}\"")]
fn apply_fails_with(provider_context: &ProviderContext, variant: String) -> Result<(), StepError> {
    expect_failure(provider_context, variant.trim())
}

#[then("no remote call was made")]
fn no_remote_call(provider_context: &ProviderContext) -> Result<(), StepError> {
    let calls = provider_context.fake.calls();
    if calls.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!("unexpected calls: {calls:?}")))
    }
}

#[then("no remote mutation was made")]
fn no_remote_mutation(provider_context: &ProviderContext) -> Result<(), StepError> {
    let mutations = provider_context.fake.mutations();
    if mutations.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "unexpected mutations: {mutations:?}"
        )))
    }
}

#[then("the remote mutations are \"{expected}\"")]
fn remote_mutations_are(provider_context: &ProviderContext, expected: String) -> Result<(), StepError> {
    let mutations = provider_context.fake.mutations();
    if mutations == list(&expected) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected mutations {expected}, got {mutations:?}"
        )))
    }
}

#[then("the new endpoint uses service IP \"{service_ip}\" without IPAM")]
fn endpoint_is_static(provider_context: &ProviderContext, service_ip: String) -> Result<(), StepError> {
    let created = provider_context.fake.calls_named("create_endpoint");
    let detail = created
        .first()
        .map(|call| call.detail.as_str())
        .ok_or_else(|| StepError::Assertion(String::from("missing create_endpoint call")))?;
    if !detail.contains(service_ip.trim()) || !detail.contains("ipam_config: None") {
        return Err(StepError::Assertion(format!(
            "endpoint request should be static: {detail}"
        )));
    }
    let attachment = provider_context
        .instance
        .as_ref()
        .and_then(|state| state.private_network.first())
        .ok_or_else(|| StepError::Assertion(String::from("missing private network state")))?;
    if attachment.service_ip == service_ip.trim() && !attachment.enable_ipam {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "state should record the static address: {attachment:?}"
        )))
    }
}

#[then("no \"{kind}\" warning was raised")]
fn no_warning_of_kind(provider_context: &ProviderContext, kind: String) -> Result<(), StepError> {
    let raised: Vec<_> = provider_context
        .warnings
        .iter()
        .filter(|warning| format!("{:?}", warning.kind) == kind.trim())
        .collect();
    if raised.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!("unexpected warnings: {raised:?}")))
    }
}

#[given("instance \"{instance}\" allows \"{ip}\" described as \"{description}\"")]
fn instance_allows(
    mut provider_context: ProviderContext,
    instance: String,
    ip: String,
    description: String,
) -> ProviderContext {
    provider_context
        .fake
        .seed_instance(sample_instance(instance.trim(), &region()));
    let config = AclConfig {
        region: None,
        instance_id: instance.trim().to_owned(),
        rules: vec![AclRuleConfig::new(ip.trim(), description.trim())],
    };
    let state = block_on(provider_context.provider.create_acl(&operation(), &config))
        .unwrap_or_else(|err| panic!("rule set creation should succeed: {err}"));
    provider_context.acl = Some(state);
    provider_context
}

#[given("the remote also allows \"{ip}\" described as \"{description}\"")]
fn remote_also_allows(
    provider_context: ProviderContext,
    ip: String,
    description: String,
) -> ProviderContext {
    let Some(state) = provider_context.acl.as_ref() else {
        panic!("test setup requires a rule set");
    };
    let instance_id = bare(&state.instance_id);
    let mut rules = provider_context.fake.acl_rules(&instance_id);
    rules.push(AclRule {
        ip: ip.trim().to_owned(),
        description: description.trim().to_owned(),
        ..AclRule::default()
    });
    provider_context.fake.seed_acl_rules(&instance_id, rules);
    provider_context
}

#[when("the rule set is refreshed")]
fn rule_set_refreshed(mut provider_context: ProviderContext) -> ProviderContext {
    let Some(state) = provider_context.acl.clone() else {
        panic!("test setup requires a rule set");
    };
    let op = operation();
    provider_context.acl = block_on(provider_context.provider.read_acl(&op, &state))
        .unwrap_or_else(|err| panic!("refresh should succeed: {err}"));
    provider_context.warnings = op.diagnostics.take();
    provider_context
}

#[then("the rule set holds \"{expected}\"")]
fn rule_set_holds(provider_context: &ProviderContext, expected: String) -> Result<(), StepError> {
    let ips: Vec<String> = provider_context
        .acl
        .as_ref()
        .map(|state| state.rules.iter().map(|rule| rule.ip.clone()).collect())
        .unwrap_or_default();
    if ips == list(&expected) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected rules {expected}, got {ips:?}"
        )))
    }
}

#[then("an \"{kind}\" warning names \"{needle}\"")]
fn warning_names(
    provider_context: &ProviderContext,
    kind: String,
    needle: String,
) -> Result<(), StepError> {
    let matching = provider_context
        .warnings
        .iter()
        .filter(|warning| format!("{:?}", warning.kind) == kind.trim())
        .filter(|warning| {
            warning.summary.contains(needle.trim()) || warning.detail.contains(needle.trim())
        })
        .count();
    if matching == 1 {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected one {kind} warning naming {needle}, got {:?}",
            provider_context.warnings
        )))
    }
}

#[then("the next rule set plan is an update")]
fn next_plan_is_update(provider_context: &ProviderContext) -> Result<(), StepError> {
    let Some(state) = provider_context.acl.as_ref() else {
        return Err(StepError::Assertion(String::from("rule set vanished")));
    };
    let declared: Vec<AclRuleConfig> = state.rules.iter().take(1).cloned().collect();
    let config = AclConfig {
        region: None,
        instance_id: state.instance_id.clone(),
        rules: declared,
    };
    match provider_context.provider.plan_acl(Some(state), &config) {
        Ok(Plan::Update) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected an update plan, got {other:?}"
        ))),
    }
}

#[given("user \"{user}\" holds \"{permission}\" on database \"{database}\" of instance \"{instance}\"")]
fn user_holds_privilege(
    mut provider_context: ProviderContext,
    user: String,
    permission: String,
    database: String,
    instance: String,
) -> ProviderContext {
    let instance_id = instance.trim();
    let database_name = database.trim();
    let user_name = user.trim();
    provider_context
        .fake
        .seed_instance(sample_instance(instance_id, &region()));
    provider_context.fake.seed_database(
        instance_id,
        Database {
            name: database_name.to_owned(),
            ..Database::default()
        },
    );
    provider_context.fake.seed_user(
        instance_id,
        User {
            name: user_name.to_owned(),
            is_admin: false,
        },
        "pw",
    );
    let level: Permission =
        serde_json::from_value(serde_json::Value::String(permission.trim().to_owned()))
            .unwrap_or_else(|err| panic!("permission should parse: {err}"));
    let config = PrivilegeConfig {
        region: None,
        instance_id: instance_id.to_owned(),
        database_name: database_name.to_owned(),
        user_name: user_name.to_owned(),
        permission: level,
    };
    let state = block_on(provider_context.provider.create_privilege(&operation(), &config))
        .unwrap_or_else(|err| panic!("privilege creation should succeed: {err}"));
    provider_context.privilege = Some(state);
    provider_context
}

#[given("user \"{user}\" has been dropped from instance \"{instance}\"")]
fn user_dropped(provider_context: ProviderContext, user: String, instance: String) -> ProviderContext {
    block_on(
        provider_context
            .provider
            .client()
            .delete_user(&region(), instance.trim(), user.trim()),
    )
    .unwrap_or_else(|err| panic!("user removal should succeed: {err}"));
    provider_context.fake.clear_calls();
    provider_context
}

#[when("the privilege is deleted")]
fn privilege_deleted(mut provider_context: ProviderContext) -> ProviderContext {
    let Some(state) = provider_context.privilege.clone() else {
        panic!("test setup requires a privilege");
    };
    match block_on(provider_context.provider.delete_privilege(&operation(), &state)) {
        Ok(()) => {
            provider_context.completed = true;
            provider_context.privilege = None;
        }
        Err(err) => provider_context.failure = Some(err),
    }
    provider_context
}

#[then("the delete succeeds")]
fn delete_succeeds(provider_context: &ProviderContext) -> Result<(), StepError> {
    if provider_context.completed && provider_context.failure.is_none() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected success, got {:?}",
            provider_context.failure
        )))
    }
}

#[then("the remote call count for \"{operation}\" is {count:u32}")]
fn remote_call_count(
    provider_context: &ProviderContext,
    operation: String,
    count: u32,
) -> Result<(), StepError> {
    let observed = provider_context.fake.call_count(operation.trim());
    if observed == count as usize {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} {operation} calls, got {observed}"
        )))
    }
}
