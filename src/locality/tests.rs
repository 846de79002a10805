//! Unit tests for the identity codec.

use rstest::rstest;

use super::*;

const UUID: &str = "11111111-2222-3333-4444-555555555555";

fn region(value: &str) -> Region {
    Region::parse(value).unwrap_or_else(|err| panic!("region {value}: {err}"))
}

#[rstest]
#[case("fr-par/11111111-2222-3333-4444-555555555555")]
#[case("nl-ams-1/abc")]
#[case("pl-waw/instance-name")]
fn parse_then_format_round_trips(#[case] value: &str) {
    let (locality, id) =
        parse_localized(value).unwrap_or_else(|err| panic!("parse {value}: {err}"));
    assert_eq!(format_localized(&locality, &id), value);
}

#[rstest]
#[case("")]
#[case("fr-par")]
#[case("fr-par/")]
#[case("fr-par/a/b")]
#[case("nowhere/abc")]
fn parse_localized_rejects_malformed(#[case] value: &str) {
    let err = parse_localized(value).expect_err("malformed id must fail");
    assert!(matches!(err, ProviderError::InvalidId { .. }), "{err:?}");
}

#[test]
fn parse_localized_nested_splits_three_parts() {
    let (locality, outer, inner) = parse_localized_nested("fr-par/inst/db")
        .unwrap_or_else(|err| panic!("nested parse: {err}"));
    assert_eq!(locality, Locality::Region(region("fr-par")));
    assert_eq!(outer, "inst");
    assert_eq!(inner, "db");
}

#[rstest]
#[case("fr-par/inst")]
#[case("fr-par/a/b/c")]
fn parse_localized_nested_requires_two_separators(#[case] value: &str) {
    assert!(parse_localized_nested(value).is_err());
}

#[test]
fn expand_id_strips_prefix() {
    let formatted = format_localized(&region("fr-par"), UUID);
    assert_eq!(expand_id(&formatted), UUID);
    assert_eq!(expand_id(UUID), UUID);
    assert_eq!(expand_id("fr-par-2/abc"), "abc");
}

#[test]
fn expand_id_leaves_nested_and_unknown_prefixes() {
    assert_eq!(expand_id("fr-par/a/b"), "fr-par/a/b");
    assert_eq!(expand_id("something/abc"), "something/abc");
}

#[rstest]
#[case("fr-par-1", "fr-par", true)]
#[case("fr-par-3", "fr-par", true)]
#[case("fr-par-1", "fr-par-2", true)]
#[case("nl-ams-1", "fr-par", false)]
#[case("fr-par", "garbage", false)]
fn compare_localities_by_region(#[case] lhs: &str, #[case] rhs: &str, #[case] expected: bool) {
    assert_eq!(compare_localities(lhs, rhs), expected);
}

#[test]
fn zone_region_strips_index() {
    let zone = Zone::parse("pl-waw-2").unwrap_or_else(|err| panic!("zone: {err}"));
    assert_eq!(zone.region(), region("pl-waw"));
}

#[test]
fn resolve_reference_accepts_bare_uuid_with_default() {
    let default = region("nl-ams");
    let id = resolve_reference(UUID, Some(&default))
        .unwrap_or_else(|err| panic!("resolve: {err}"));
    assert_eq!(id.to_string(), format!("nl-ams/{UUID}"));
}

#[test]
fn resolve_reference_requires_default_for_bare_uuid() {
    let err = resolve_reference(UUID, None).expect_err("no default region");
    assert!(matches!(err, ProviderError::LocalityUnresolved { .. }));
}

#[test]
fn resolve_region_prefers_explicit_then_id_then_default() {
    let default = region("pl-waw");
    let explicit = resolve_region(Some("nl-ams"), "fr-par/x", Some(&default))
        .unwrap_or_else(|err| panic!("explicit: {err}"));
    assert_eq!(explicit, region("nl-ams"));

    let from_id = resolve_region(None, "fr-par-2/x", Some(&default))
        .unwrap_or_else(|err| panic!("from id: {err}"));
    assert_eq!(from_id, region("fr-par"));

    let fallback =
        resolve_region(None, UUID, Some(&default)).unwrap_or_else(|err| panic!("default: {err}"));
    assert_eq!(fallback, default);

    let err = resolve_region(None, UUID, None).expect_err("nothing to resolve");
    assert!(matches!(err, ProviderError::LocalityUnresolved { .. }));
}

#[test]
fn locality_check_accepts_same_region_zone() {
    let check = LocalityCheck::new(region("fr-par"))
        .attribute("instance_id", Some("fr-par/abc"))
        .attribute("private_network.0.pn_id", Some("fr-par-2/pn"))
        .attribute("snapshot_id", Some(UUID));
    assert!(check.verify().is_ok());
}

#[test]
fn locality_check_names_offending_attribute() {
    let check = LocalityCheck::new(region("fr-par"))
        .attribute("instance_id", Some("fr-par/abc"))
        .attribute("private_network.0.pn_id", Some("nl-ams-1/pn"));
    let err = check.verify().expect_err("mismatch expected");
    assert_eq!(
        err,
        ProviderError::LocalityMismatch {
            attribute: String::from("private_network.0.pn_id"),
            value: String::from("nl-ams-1/pn"),
            expected_region: String::from("fr-par"),
        }
    );
}

#[test]
fn localized_id_display_handles_nesting() {
    let id = LocalizedId::nested(region("fr-par"), "inst", "db");
    assert_eq!(id.to_string(), "fr-par/inst/db");
    assert_eq!(LocalizedId::new(region("fr-par"), "x").to_string(), "fr-par/x");
}
