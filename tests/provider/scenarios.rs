//! BDD scenarios for instance upgrades and sub-resource reconciliation.

use rstest_bdd_macros::scenario;

use super::test_helpers::{ProviderContext, provider_context};

#[scenario(
    path = "tests/features/instance_upgrades.feature",
    name = "Move to block storage then change the node type"
)]
fn scenario_local_to_block_then_node_type(provider_context: ProviderContext) {
    let _ = provider_context;
}

#[scenario(
    path = "tests/features/instance_upgrades.feature",
    name = "Shrinking a volume is rejected at plan time"
)]
fn scenario_shrink_rejected(provider_context: ProviderContext) {
    let _ = provider_context;
}

#[scenario(
    path = "tests/features/instance_upgrades.feature",
    name = "Volume sizes off the 5 GB step are rejected at plan time"
)]
fn scenario_granularity_rejected(provider_context: ProviderContext) {
    let _ = provider_context;
}

#[scenario(
    path = "tests/features/instance_upgrades.feature",
    name = "A full disk must be resized before the node type changes"
)]
fn scenario_disk_full_blocks_node_change(provider_context: ProviderContext) {
    let _ = provider_context;
}

#[scenario(
    path = "tests/features/instance_upgrades.feature",
    name = "Switching a private network endpoint to a static address"
)]
fn scenario_endpoint_drift_to_static(provider_context: ProviderContext) {
    let _ = provider_context;
}

#[scenario(
    path = "tests/features/sub_resources.feature",
    name = "Undeclared ACL rules surface as drift"
)]
fn scenario_acl_drift(provider_context: ProviderContext) {
    let _ = provider_context;
}

#[scenario(
    path = "tests/features/sub_resources.feature",
    name = "Deleting a privilege of a vanished user"
)]
fn scenario_privilege_of_vanished_user(provider_context: ProviderContext) {
    let _ = provider_context;
}
