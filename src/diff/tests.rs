//! Unit tests for the diff helpers.

use rstest::rstest;

use super::*;

fn remote(ip: &str, description: &str) -> AclRule {
    AclRule {
        ip: ip.to_owned(),
        description: description.to_owned(),
        ..AclRule::default()
    }
}

fn privilege(database: &str, user: &str, permission: Permission) -> Privilege {
    Privilege {
        permission,
        database_name: database.to_owned(),
        user_name: user.to_owned(),
    }
}

#[rstest]
#[case("fr-par/abc", "abc", true)]
#[case("fr-par-1/abc", "fr-par/abc", true)]
#[case("abc", "abd", false)]
fn ids_compare_without_locality(#[case] lhs: &str, #[case] rhs: &str, #[case] expected: bool) {
    assert_eq!(ids_equal(lhs, rhs), expected);
}

#[rstest]
#[case("1.2.3.4", "1.2.3.4/32")]
#[case("10.1.2.3/8", "10.0.0.0/8")]
#[case(" 192.168.1.0/24 ", "192.168.1.0/24")]
fn ranges_are_masked(#[case] input: &str, #[case] expected: &str) {
    let network = canonical_network(input).unwrap_or_else(|err| panic!("parse {input}: {err}"));
    assert_eq!(network.to_string(), expected);
}

#[rstest]
fn canonical_rules_sort_by_network_bytes() {
    let rules = [
        AclRuleConfig::new("192.168.0.0/16", "lan"),
        AclRuleConfig::new("9.9.9.9", "dns"),
        AclRuleConfig::new("10.0.0.1/8", "vpn"),
    ];
    let canonical = canonicalize_acl_rules(&rules).unwrap_or_else(|err| panic!("canonical: {err}"));
    let ips: Vec<&str> = canonical.iter().map(|rule| rule.ip.as_str()).collect();
    assert_eq!(ips, ["9.9.9.9/32", "10.0.0.0/8", "192.168.0.0/16"]);
}

#[rstest]
fn duplicate_ranges_are_rejected() {
    let rules = [
        AclRuleConfig::new("10.0.0.1/8", "a"),
        AclRuleConfig::new("10.0.0.0/8", "b"),
    ];
    let err = canonicalize_acl_rules(&rules).expect_err("duplicates must fail");
    assert!(matches!(err, ProviderError::InvalidAttribute { .. }), "{err:?}");
}

#[rstest]
fn malformed_range_is_rejected() {
    let err = canonicalize_acl_rules(&[AclRuleConfig::new("not-an-ip", "x")])
        .expect_err("malformed range must fail");
    assert!(matches!(err, ProviderError::InvalidAttribute { .. }), "{err:?}");
}

#[rstest]
fn reconcile_appends_drift_with_warning() {
    let diagnostics = Diagnostics::new();
    let declared = [AclRuleConfig::new("1.2.3.4/32", "foo")];
    let observed = [remote("1.2.3.4/32", "foo"), remote("9.9.9.9/32", "injected")];

    let merged = reconcile_acl_rules(&declared, &observed, &diagnostics);

    assert_eq!(
        merged,
        vec![
            AclRuleConfig::new("1.2.3.4/32", "foo"),
            AclRuleConfig::new("9.9.9.9/32", "injected"),
        ]
    );
    let drift = diagnostics.of_kind(WarningKind::AclDrift);
    assert_eq!(drift.len(), 1);
    assert!(drift.iter().all(|warning| warning.summary.contains("9.9.9.9/32")));
}

#[rstest]
fn reconcile_takes_remote_description_and_drops_missing_rules() {
    let diagnostics = Diagnostics::new();
    let declared = [
        AclRuleConfig::new("1.2.3.4", "old"),
        AclRuleConfig::new("5.6.7.8/32", "gone"),
    ];
    let observed = [remote("1.2.3.4/32", "renamed")];

    let merged = reconcile_acl_rules(&declared, &observed, &diagnostics);

    assert_eq!(merged, vec![AclRuleConfig::new("1.2.3.4", "renamed")]);
    assert!(diagnostics.snapshot().is_empty());
}

#[rstest]
fn privilege_diff_splits_grants_and_revocations() {
    let current = [
        privilege("db", "alice", Permission::Readonly),
        privilege("db", "bob", Permission::All),
        privilege("db", "carol", Permission::Readwrite),
    ];
    let desired = [
        privilege("db", "alice", Permission::Readwrite),
        privilege("db", "carol", Permission::Readwrite),
        privilege("db", "dave", Permission::Readonly),
        privilege("db", "erin", Permission::None),
    ];

    let diff = PrivilegeDiff::between(&current, &desired);

    assert_eq!(
        diff.grant,
        vec![
            privilege("db", "alice", Permission::Readwrite),
            privilege("db", "dave", Permission::Readonly),
        ]
    );
    assert_eq!(diff.revoke, vec![privilege("db", "bob", Permission::None)]);
}

#[rstest]
fn identical_privilege_sets_produce_no_diff() {
    let set = [privilege("db", "alice", Permission::All)];
    assert!(PrivilegeDiff::between(&set, &set).is_empty());
}
