//! Unit tests for the instance controller and upgrade planner.

use std::time::Duration;

use rstest::rstest;

use super::*;
use crate::api::RdbApi;
use crate::api::types::CreateSnapshotRequest;
use crate::diagnostics::WarningKind;
use crate::test_support::{FAKE_CERTIFICATE, FakeScaleway, GB, sample_instance};

const PN: &str = "11111111-2222-3333-4444-555555555555";

fn region() -> Region {
    Region::parse("fr-par").unwrap_or_else(|err| panic!("region: {err}"))
}

fn provider(fake: &FakeScaleway) -> Provider<FakeScaleway> {
    Provider::new(fake.clone())
        .with_default_region(region())
        .with_default_project("project")
        .with_retry_interval(Duration::from_secs(1))
}

fn operation() -> Operation {
    Operation::with_timeout(Duration::from_secs(600))
}

fn declared() -> InstanceConfig {
    InstanceConfig {
        name: String::from("orders"),
        engine: String::from("PostgreSQL-15"),
        node_type: String::from("DB-DEV-S"),
        user_name: Some(String::from("admin")),
        password: Some(PasswordConfig::Inline(String::from("S3cret!first"))),
        ..InstanceConfig::default()
    }
}

fn config_from(state: &InstanceState) -> InstanceConfig {
    InstanceConfig {
        name: state.name.clone(),
        region: Some(state.region.to_string()),
        engine: state.engine.clone(),
        node_type: state.node_type.clone(),
        is_ha_cluster: state.is_ha_cluster,
        user_name: state.user_name.clone(),
        volume_type: state.volume_type,
        volume_size_in_gb: state.volume_size_in_gb,
        encryption_at_rest: state.encryption_at_rest,
        disable_backup: state.disable_backup,
        settings: state.settings.clone(),
        init_settings: state.init_settings.clone(),
        tags: state.tags.clone(),
        ..InstanceConfig::default()
    }
}

fn shape(volume_type: VolumeType, size_gb: Option<u64>, node_type: &str) -> InstanceShape {
    InstanceShape {
        node_type: node_type.to_owned(),
        volume_type,
        volume_size_gb: size_gb,
        ..InstanceShape::default()
    }
}

fn bare(id: &str) -> String {
    locality::expand_id(id).to_owned()
}

async fn seeded_state(
    provider: &Provider<FakeScaleway>,
    fake: &FakeScaleway,
    status: InstanceStatus,
) -> InstanceState {
    let mut instance = sample_instance("seeded", &region());
    instance.status = status;
    fake.seed_instance(instance);
    provider
        .refresh_instance(&operation(), "fr-par/seeded", Carried::default())
        .await
        .unwrap_or_else(|err| panic!("refresh: {err}"))
        .unwrap_or_else(|| panic!("seeded instance must exist"))
}

#[rstest]
fn shrinking_the_volume_is_rejected() {
    let err = plan_upgrades(
        "fr-par/db",
        &shape(VolumeType::Sbs5k, Some(20), "DB-DEV-S"),
        &shape(VolumeType::Sbs5k, Some(15), "DB-DEV-S"),
        InstanceStatus::Ready,
    )
    .expect_err("shrink must fail");
    assert_eq!(
        err,
        ProviderError::VolumeShrink {
            current_gb: 20,
            requested_gb: 15
        }
    );
}

#[rstest]
#[case::not_a_multiple(VolumeType::Sbs5k, Some(13), "granularity")]
#[case::zero(VolumeType::Sbs15k, Some(0), "granularity")]
#[case::local_with_size(VolumeType::Lssd, Some(10), "local")]
fn malformed_volumes_are_rejected(
    #[case] volume_type: VolumeType,
    #[case] size_gb: Option<u64>,
    #[case] expected: &str,
) {
    let err = validate_volume(volume_type, size_gb).expect_err("volume must be rejected");
    match expected {
        "granularity" => assert!(matches!(err, ProviderError::VolumeGranularity { .. }), "{err:?}"),
        _ => assert_eq!(err, ProviderError::VolumeSizeOnLocal),
    }
}

#[rstest]
fn disk_full_blocks_a_lone_node_type_change() {
    let err = plan_upgrades(
        "fr-par/db",
        &shape(VolumeType::Sbs5k, Some(20), "DB-DEV-S"),
        &shape(VolumeType::Sbs5k, Some(20), "DB-GP-XS"),
        InstanceStatus::DiskFull,
    )
    .expect_err("node change must be blocked");
    assert!(
        matches!(err, ProviderError::NodeUpgradeBlockedByDiskFull { .. }),
        "{err:?}"
    );
}

#[rstest]
fn disk_full_allows_node_type_behind_a_resize() {
    let ops = plan_upgrades(
        "fr-par/db",
        &shape(VolumeType::Sbs5k, Some(20), "DB-DEV-S"),
        &shape(VolumeType::Sbs5k, Some(25), "DB-GP-XS"),
        InstanceStatus::DiskFull,
    )
    .unwrap_or_else(|err| panic!("plan: {err}"));
    assert_eq!(
        ops,
        vec![
            UpgradeOp::VolumeSize { size_gb: 25 },
            UpgradeOp::NodeType {
                node_type: String::from("DB-GP-XS")
            },
        ]
    );
}

#[rstest]
fn moving_to_local_storage_changes_node_type_first() {
    let ops = plan_upgrades(
        "fr-par/db",
        &shape(VolumeType::Sbs5k, Some(20), "DB-DEV-S"),
        &shape(VolumeType::Lssd, None, "DB-GP-XS"),
        InstanceStatus::Ready,
    )
    .unwrap_or_else(|err| panic!("plan: {err}"));
    assert_eq!(
        ops,
        vec![
            UpgradeOp::NodeType {
                node_type: String::from("DB-GP-XS")
            },
            UpgradeOp::VolumeType {
                volume_type: VolumeType::Lssd
            },
        ]
    );
}

#[rstest]
fn encryption_cannot_be_turned_off() {
    let current = InstanceShape {
        encryption_at_rest: true,
        ..shape(VolumeType::Sbs5k, Some(20), "DB-DEV-S")
    };
    let target = shape(VolumeType::Sbs5k, Some(20), "DB-DEV-S");
    let err = plan_upgrades("fr-par/db", &current, &target, InstanceStatus::Ready)
        .expect_err("downgrade must fail");
    assert_eq!(err, ProviderError::EncryptionDowngrade);
}

#[rstest]
fn volume_size_step_is_sent_in_bytes() {
    assert_eq!(
        UpgradeOp::VolumeSize { size_gb: 10 }.to_request(),
        crate::api::types::UpgradeInstanceRequest::VolumeSize(10 * GB)
    );
}

#[tokio::test(start_paused = true)]
async fn plan_rejects_shrink_and_granularity_without_remote_calls() {
    let fake = FakeScaleway::new();
    let provider = provider(&fake);
    let state = seeded_state(&provider, &fake, InstanceStatus::Ready).await;
    fake.clear_calls();

    let shrink = InstanceConfig {
        volume_size_in_gb: Some(15),
        ..config_from(&state)
    };
    let shrink_err = provider
        .plan_instance(Some(&state), &shrink)
        .expect_err("shrink must fail");
    assert!(matches!(shrink_err, ProviderError::VolumeShrink { .. }), "{shrink_err:?}");

    let odd = InstanceConfig {
        volume_size_in_gb: Some(13),
        ..config_from(&state)
    };
    let odd_err = provider
        .plan_instance(Some(&state), &odd)
        .expect_err("granularity must fail");
    assert_eq!(odd_err, ProviderError::VolumeGranularity { requested_gb: 13 });
    assert!(fake.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn plan_classifies_changes() {
    let fake = FakeScaleway::new();
    let provider = provider(&fake);
    let state = seeded_state(&provider, &fake, InstanceStatus::Ready).await;

    let unchanged = config_from(&state);
    assert_eq!(
        provider.plan_instance(Some(&state), &unchanged).ok(),
        Some(Plan::NoOp)
    );
    let renamed = InstanceConfig {
        name: String::from("renamed"),
        ..config_from(&state)
    };
    assert_eq!(
        provider.plan_instance(Some(&state), &renamed).ok(),
        Some(Plan::Update)
    );
    let new_engine = InstanceConfig {
        engine: String::from("MySQL-8"),
        ..config_from(&state)
    };
    assert_eq!(
        provider.plan_instance(Some(&state), &new_engine).ok(),
        Some(Plan::Replace {
            attributes: vec![String::from("engine")]
        })
    );
    assert_eq!(provider.plan_instance(None, &unchanged).ok(), Some(Plan::Create));
}

#[tokio::test(start_paused = true)]
async fn plan_rejects_a_private_network_in_another_region() {
    let fake = FakeScaleway::new();
    let provider = provider(&fake);
    let config = InstanceConfig {
        private_network: Some(PrivateNetworkBlock {
            pn_id: format!("nl-ams-1/{PN}"),
            service_ip: None,
            enable_ipam: true,
        }),
        ..declared()
    };
    let err = provider
        .plan_instance(None, &config)
        .expect_err("foreign network must fail");
    assert!(matches!(err, ProviderError::LocalityMismatch { .. }), "{err:?}");
}

#[tokio::test(start_paused = true)]
async fn create_attaches_endpoints_and_records_credentials() {
    let fake = FakeScaleway::new();
    let provider = provider(&fake);
    let op = operation();
    let config = InstanceConfig {
        private_network: Some(PrivateNetworkBlock {
            pn_id: format!("fr-par/{PN}"),
            service_ip: None,
            enable_ipam: true,
        }),
        load_balancer: true,
        volume_type: VolumeType::Sbs5k,
        volume_size_in_gb: Some(10),
        ..declared()
    };

    let state = provider
        .create_instance(&op, &config)
        .await
        .unwrap_or_else(|err| panic!("create: {err}"));

    assert_eq!(fake.mutations(), ["create_instance"]);
    assert!(state.id.starts_with("fr-par/"));
    assert_eq!(state.user_name.as_deref(), Some("admin"));
    assert_eq!(
        state.password,
        Some(PasswordState::Inline(String::from("S3cret!first")))
    );
    assert_eq!(state.volume_size_in_gb, Some(10));
    assert_eq!(state.certificate, FAKE_CERTIFICATE);
    assert_eq!(state.load_balancer.len(), 1);
    assert!(state.endpoint_ip.is_some());
    let attachment = state
        .private_network
        .first()
        .unwrap_or_else(|| panic!("private network endpoint expected"));
    assert!(attachment.enable_ipam);
    assert_eq!(attachment.pn_id, format!("fr-par/{PN}"));
    assert_eq!(
        fake.user_password(&bare(&state.id), "admin").as_deref(),
        Some("S3cret!first")
    );
}

#[tokio::test(start_paused = true)]
async fn create_defers_backup_fields_and_settings() {
    let fake = FakeScaleway::new();
    let provider = provider(&fake);
    let config = InstanceConfig {
        backup_schedule_frequency: Some(12),
        backup_schedule_retention: Some(3),
        settings: BTreeMap::from([(String::from("work_mem"), String::from("8"))]),
        ..declared()
    };

    let state = provider
        .create_instance(&operation(), &config)
        .await
        .unwrap_or_else(|err| panic!("create: {err}"));

    assert_eq!(
        fake.mutations(),
        ["create_instance", "update_instance", "set_instance_settings"]
    );
    assert_eq!(state.backup_schedule_frequency, Some(12));
    assert_eq!(state.backup_schedule_retention, Some(3));
    assert_eq!(state.settings.get("work_mem").map(String::as_str), Some("8"));
}

#[tokio::test(start_paused = true)]
async fn create_requires_admin_credentials() {
    let fake = FakeScaleway::new();
    let provider = provider(&fake);
    let config = InstanceConfig {
        password: None,
        ..declared()
    };
    let err = provider
        .create_instance(&operation(), &config)
        .await
        .expect_err("missing password must fail");
    assert!(matches!(err, ProviderError::InvalidAttribute { .. }), "{err:?}");
    assert!(fake.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn local_to_block_then_node_type_runs_in_two_applies() {
    let fake = FakeScaleway::new();
    let provider = provider(&fake);
    let op = operation();
    let created = provider
        .create_instance(&op, &declared())
        .await
        .unwrap_or_else(|err| panic!("create: {err}"));
    assert_eq!(created.volume_type, VolumeType::Lssd);
    assert_eq!(created.volume_size_in_gb, None);

    fake.clear_calls();
    let to_block = InstanceConfig {
        volume_type: VolumeType::Sbs5k,
        volume_size_in_gb: Some(10),
        ..declared()
    };
    let resized = provider
        .update_instance(&op, &created, &to_block)
        .await
        .unwrap_or_else(|err| panic!("first apply: {err}"));
    assert_eq!(
        fake.upgrade_details(),
        ["volume_type=sbs_5k", format!("volume_size={}", 10 * GB).as_str()]
    );
    assert_eq!(resized.volume_size_in_gb, Some(10));

    fake.clear_calls();
    let bigger_node = InstanceConfig {
        node_type: String::from("DB-GP-XS"),
        ..to_block
    };
    let upgraded = provider
        .update_instance(&op, &resized, &bigger_node)
        .await
        .unwrap_or_else(|err| panic!("second apply: {err}"));
    assert_eq!(fake.upgrade_details(), ["node_type=DB-GP-XS"]);
    assert_eq!(upgraded.node_type, "DB-GP-XS");
}

#[tokio::test(start_paused = true)]
async fn disk_full_instance_is_resized_before_node_change() {
    let fake = FakeScaleway::new();
    let provider = provider(&fake);
    let state = seeded_state(&provider, &fake, InstanceStatus::DiskFull).await;
    fake.clear_calls();

    let node_only = InstanceConfig {
        node_type: String::from("DB-GP-XS"),
        ..config_from(&state)
    };
    let err = provider
        .update_instance(&operation(), &state, &node_only)
        .await
        .expect_err("node change must be blocked");
    assert!(
        matches!(err, ProviderError::NodeUpgradeBlockedByDiskFull { .. }),
        "{err:?}"
    );
    assert!(fake.mutations().is_empty());

    let with_resize = InstanceConfig {
        volume_size_in_gb: Some(25),
        ..node_only
    };
    provider
        .update_instance(&operation(), &state, &with_resize)
        .await
        .unwrap_or_else(|err| panic!("update: {err}"));
    assert_eq!(
        fake.upgrade_details(),
        [format!("volume_size={}", 25 * GB).as_str(), "node_type=DB-GP-XS"]
    );
}

#[tokio::test(start_paused = true)]
async fn switching_to_a_static_address_recreates_the_endpoint() {
    let fake = FakeScaleway::new();
    let provider = provider(&fake);
    let ipam = InstanceConfig {
        private_network: Some(PrivateNetworkBlock {
            pn_id: format!("fr-par/{PN}"),
            service_ip: None,
            enable_ipam: true,
        }),
        ..declared()
    };
    let created = provider
        .create_instance(&operation(), &ipam)
        .await
        .unwrap_or_else(|err| panic!("create: {err}"));
    assert_eq!(fake.ipam_ips().len(), 1);

    fake.clear_calls();
    let fixed = InstanceConfig {
        private_network: Some(PrivateNetworkBlock {
            pn_id: format!("fr-par/{PN}"),
            service_ip: Some(String::from("10.0.0.5/24")),
            enable_ipam: false,
        }),
        ..declared()
    };
    let op = operation();
    let updated = provider
        .update_instance(&op, &created, &fixed)
        .await
        .unwrap_or_else(|err| panic!("update: {err}"));

    assert_eq!(fake.mutations(), ["delete_endpoint", "create_endpoint"]);
    let created_endpoint = fake.calls_named("create_endpoint");
    let detail = created_endpoint
        .first()
        .map(|call| call.detail.as_str())
        .unwrap_or_default();
    assert!(detail.contains("10.0.0.5/24"), "{detail}");
    assert!(detail.contains("ipam_config: None"), "{detail}");
    assert!(op.diagnostics.of_kind(WarningKind::IpamOverridden).is_empty());
    assert!(fake.ipam_ips().is_empty());
    let attachment = updated
        .private_network
        .first()
        .unwrap_or_else(|| panic!("private network endpoint expected"));
    assert_eq!(attachment.service_ip, "10.0.0.5/24");
    assert!(!attachment.enable_ipam);
}

#[tokio::test(start_paused = true)]
async fn instance_gone_after_upgrade_counts_as_applied() {
    let fake = FakeScaleway::new();
    fake.seed_instance(sample_instance("db", &region()));
    fake.vanish_after("upgrade_instance");
    let provider = provider(&fake);

    let step = UpgradeOp::NodeType {
        node_type: String::from("DB-PRO2-XXS"),
    };
    provider
        .apply_upgrade(&operation(), &region(), "db", &step)
        .await
        .unwrap_or_else(|err| panic!("upgrade: {err}"));

    assert_eq!(fake.call_count("upgrade_instance"), 1);
    assert_eq!(fake.call_count("get_instance"), 2);
    assert!(fake.instance("db").is_none());
}

#[tokio::test(start_paused = true)]
async fn changed_inline_password_is_rotated() {
    let fake = FakeScaleway::new();
    let provider = provider(&fake);
    let created = provider
        .create_instance(&operation(), &declared())
        .await
        .unwrap_or_else(|err| panic!("create: {err}"));

    fake.clear_calls();
    let rotated = InstanceConfig {
        password: Some(PasswordConfig::Inline(String::from("S3cret!second"))),
        ..declared()
    };
    let state = provider
        .update_instance(&operation(), &created, &rotated)
        .await
        .unwrap_or_else(|err| panic!("update: {err}"));

    assert_eq!(fake.mutations(), ["update_user"]);
    assert_eq!(
        fake.user_password(&bare(&state.id), "admin").as_deref(),
        Some("S3cret!second")
    );
}

#[tokio::test(start_paused = true)]
async fn write_only_password_rotates_only_on_version_bump() {
    let fake = FakeScaleway::new();
    let provider = provider(&fake);
    let first = InstanceConfig {
        password: Some(PasswordConfig::WriteOnly {
            value: String::from("S3cret!v1"),
            version: 1,
        }),
        ..declared()
    };
    let created = provider
        .create_instance(&operation(), &first)
        .await
        .unwrap_or_else(|err| panic!("create: {err}"));
    assert_eq!(created.password, Some(PasswordState::WriteOnly { version: 1 }));

    let same_version = InstanceConfig {
        password: Some(PasswordConfig::WriteOnly {
            value: String::from("S3cret!other"),
            version: 1,
        }),
        ..declared()
    };
    assert_eq!(
        provider.plan_instance(Some(&created), &same_version).ok(),
        Some(Plan::NoOp)
    );

    fake.clear_calls();
    let bumped = InstanceConfig {
        password: Some(PasswordConfig::WriteOnly {
            value: String::from("S3cret!v2"),
            version: 2,
        }),
        ..declared()
    };
    let state = provider
        .update_instance(&operation(), &created, &bumped)
        .await
        .unwrap_or_else(|err| panic!("update: {err}"));
    assert_eq!(fake.mutations(), ["update_user"]);
    assert_eq!(state.password, Some(PasswordState::WriteOnly { version: 2 }));
}

#[tokio::test(start_paused = true)]
async fn inline_password_declared_over_write_only_is_sent_once_it_changes() {
    let fake = FakeScaleway::new();
    let provider = provider(&fake);
    let write_only = InstanceConfig {
        password: Some(PasswordConfig::WriteOnly {
            value: String::from("S3cret!v1"),
            version: 1,
        }),
        ..declared()
    };
    let created = provider
        .create_instance(&operation(), &write_only)
        .await
        .unwrap_or_else(|err| panic!("create: {err}"));

    fake.clear_calls();
    let switched = InstanceConfig {
        password: Some(PasswordConfig::Inline(String::from("S3cret!a"))),
        ..declared()
    };
    let silent = provider
        .update_instance(&operation(), &created, &switched)
        .await
        .unwrap_or_else(|err| panic!("switch: {err}"));
    assert!(fake.mutations().is_empty());
    assert_eq!(
        silent.password,
        Some(PasswordState::InlineUnapplied {
            value: String::from("S3cret!a"),
            version: 1,
        })
    );
    assert_eq!(
        fake.user_password(&bare(&silent.id), "admin").as_deref(),
        Some("S3cret!v1")
    );

    let changed = InstanceConfig {
        password: Some(PasswordConfig::Inline(String::from("S3cret!b"))),
        ..declared()
    };
    assert_eq!(
        provider.plan_instance(Some(&silent), &changed).ok(),
        Some(Plan::Update)
    );
    let state = provider
        .update_instance(&operation(), &silent, &changed)
        .await
        .unwrap_or_else(|err| panic!("update: {err}"));
    assert_eq!(fake.mutations(), ["update_user"]);
    assert_eq!(
        state.password,
        Some(PasswordState::Inline(String::from("S3cret!b")))
    );
    assert_eq!(
        fake.user_password(&bare(&state.id), "admin").as_deref(),
        Some("S3cret!b")
    );
}

#[tokio::test(start_paused = true)]
async fn update_refuses_a_required_replacement() {
    let fake = FakeScaleway::new();
    let provider = provider(&fake);
    let state = seeded_state(&provider, &fake, InstanceStatus::Ready).await;
    fake.clear_calls();
    let config = InstanceConfig {
        init_settings: BTreeMap::from([(String::from("lc_collate"), String::from("C"))]),
        ..config_from(&state)
    };
    let err = provider
        .update_instance(&operation(), &state, &config)
        .await
        .expect_err("replacement must be refused");
    assert!(matches!(err, ProviderError::InvalidAttribute { .. }), "{err:?}");
    assert!(fake.mutations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn delete_removes_the_instance_and_tolerates_absence() {
    let fake = FakeScaleway::new();
    let provider = provider(&fake);
    let op = operation();
    let created = provider
        .create_instance(&op, &declared())
        .await
        .unwrap_or_else(|err| panic!("create: {err}"));

    provider
        .delete_instance(&op, &created)
        .await
        .unwrap_or_else(|err| panic!("delete: {err}"));
    assert!(fake.instance(&bare(&created.id)).is_none());

    provider
        .delete_instance(&op, &created)
        .await
        .unwrap_or_else(|err| panic!("second delete: {err}"));
    assert_eq!(fake.call_count("delete_instance"), 1);

    let read = provider
        .read_instance(&op, &created)
        .await
        .unwrap_or_else(|err| panic!("read: {err}"));
    assert!(read.is_none());
}

#[tokio::test(start_paused = true)]
async fn name_shaped_like_an_id_does_not_pick_the_region() {
    let fake = FakeScaleway::new();
    let provider = provider(&fake);
    let config = InstanceConfig {
        name: String::from("nl-ams/orders"),
        ..declared()
    };
    assert_eq!(provider.plan_instance(None, &config).ok(), Some(Plan::Create));

    let state = provider
        .create_instance(&operation(), &config)
        .await
        .unwrap_or_else(|err| panic!("create: {err}"));
    assert_eq!(state.region, region());
    assert!(state.id.starts_with("fr-par/"), "{}", state.id);
    assert_eq!(state.name, "nl-ams/orders");
}

#[tokio::test(start_paused = true)]
async fn bare_snapshot_uuid_restores_in_the_declared_region() {
    let fake = FakeScaleway::new();
    let provider = Provider::new(fake.clone()).with_retry_interval(Duration::from_secs(1));
    let region = region();
    fake.seed_instance(sample_instance("source", &region));
    let snapshot = fake
        .create_snapshot(
            &region,
            "source",
            &CreateSnapshotRequest {
                name: String::from("nightly"),
                expires_at: None,
            },
        )
        .await
        .unwrap_or_else(|err| panic!("snapshot: {err}"));
    fake.clear_calls();

    let config = InstanceConfig {
        name: String::from("restored"),
        region: Some(String::from("fr-par")),
        node_type: String::from("DB-DEV-S"),
        snapshot_id: Some(snapshot.id.clone()),
        ..InstanceConfig::default()
    };
    let state = provider
        .create_instance(&operation(), &config)
        .await
        .unwrap_or_else(|err| panic!("restore: {err}"));

    assert_eq!(state.region, region);
    let restores = fake.calls_named("create_instance_from_snapshot");
    assert_eq!(
        restores.iter().map(|call| call.target.as_str()).collect::<Vec<_>>(),
        [snapshot.id.as_str()]
    );
}

#[tokio::test(start_paused = true)]
async fn malformed_snapshot_reference_fails_before_any_call() {
    let fake = FakeScaleway::new();
    let provider = provider(&fake);
    let config = InstanceConfig {
        name: String::from("restored"),
        node_type: String::from("DB-DEV-S"),
        snapshot_id: Some(String::from("nightly")),
        ..InstanceConfig::default()
    };
    let err = provider
        .create_instance(&operation(), &config)
        .await
        .expect_err("a snapshot reference must be a UUID or localized id");
    assert!(matches!(err, ProviderError::InvalidId { .. }), "{err:?}");
    assert!(fake.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn create_from_snapshot_restores_and_keeps_the_reference() {
    let fake = FakeScaleway::new();
    let provider = provider(&fake);
    let region = region();
    fake.seed_instance(sample_instance("source", &region));
    let snapshot = fake
        .create_snapshot(
            &region,
            "source",
            &CreateSnapshotRequest {
                name: String::from("nightly"),
                expires_at: None,
            },
        )
        .await
        .unwrap_or_else(|err| panic!("snapshot: {err}"));
    fake.clear_calls();

    let config = InstanceConfig {
        name: String::from("test-instance"),
        node_type: String::from("DB-DEV-S"),
        volume_type: VolumeType::Sbs5k,
        snapshot_id: Some(format!("fr-par/{}", snapshot.id)),
        ..InstanceConfig::default()
    };
    let state = provider
        .create_instance(&operation(), &config)
        .await
        .unwrap_or_else(|err| panic!("restore: {err}"));

    assert_eq!(fake.mutations(), ["create_instance_from_snapshot"]);
    assert_eq!(fake.call_count("get_snapshot"), 1);
    assert_eq!(state.snapshot_id, config.snapshot_id);
    assert_eq!(state.engine, "PostgreSQL-15");
    assert_eq!(
        provider.plan_instance(Some(&state), &config).ok(),
        Some(Plan::NoOp)
    );
}
