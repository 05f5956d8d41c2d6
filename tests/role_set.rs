// File: tests/role_set.rs
use kehilla::error::Error;
use kehilla::model::{NO_ROLES_LABEL, RoleSet, RoleTag};
use strum::IntoEnumIterator;

fn all_tags() -> Vec<RoleTag> {
    RoleTag::iter().collect()
}

/// Every subset of the five roles, indexed by bitmask.
fn all_subsets() -> Vec<RoleSet> {
    let tags = all_tags();
    (0u32..(1 << tags.len()))
        .map(|mask| {
            tags.iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, t)| *t)
                .collect()
        })
        .collect()
}

#[test]
fn test_set_roles_deduplicates() {
    let mut set = RoleSet::new();
    let changed = set.set_roles([RoleTag::Teacher, RoleTag::Parent, RoleTag::Teacher]);
    assert!(changed);
    assert_eq!(set.len(), 2);
    assert!(set.has_all_roles(&[RoleTag::Teacher, RoleTag::Parent]));
    assert_eq!(set.encode(), r#"["teacher","parent"]"#);
}

#[test]
fn test_set_roles_empty_is_canonical_empty() {
    let mut set: RoleSet = [RoleTag::Admin].into_iter().collect();
    assert!(set.set_roles([]));
    assert!(set.is_empty());
    assert_eq!(set, RoleSet::new());
    assert_eq!(set.encode(), "[]");
}

#[test]
fn test_set_roles_same_content_reports_no_change() {
    let mut set: RoleSet = [RoleTag::Member, RoleTag::Parent].into_iter().collect();
    assert!(!set.set_roles([RoleTag::Parent, RoleTag::Member, RoleTag::Parent]));
}

#[test]
fn test_decode_absent_values_as_empty() {
    for stored in [None, Some("null"), Some(""), Some("  ")] {
        let set = RoleSet::decode(stored).unwrap();
        assert!(set.is_empty(), "{:?} should decode to empty", stored);
        assert_eq!(set.labels(), NO_ROLES_LABEL);
    }
    assert_eq!(RoleSet::new().labels(), "No roles assigned");
}

#[test]
fn test_decode_rejects_unknown_role() {
    let err = RoleSet::decode(Some(r#"["admin","rabbi"]"#)).unwrap_err();
    assert_eq!(err, Error::InvalidRole("rabbi".to_string()));
}

#[test]
fn test_decode_rejects_malformed_encoding() {
    assert!(matches!(
        RoleSet::decode(Some("{}")),
        Err(Error::InvalidEncoding(_))
    ));
    assert!(matches!(
        RoleSet::decode(Some("[1, 2]")),
        Err(Error::InvalidEncoding(_))
    ));
    assert!(matches!(
        RoleSet::decode(Some("admin")),
        Err(Error::InvalidEncoding(_))
    ));
}

#[test]
fn test_decode_collapses_duplicates_and_ignores_order() {
    let a = RoleSet::decode(Some(r#"["student","admin","student"]"#)).unwrap();
    let b = RoleSet::decode(Some(r#"["admin","student"]"#)).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 2);
}

#[test]
fn test_encode_decode_round_trip_all_subsets() {
    for set in all_subsets() {
        let encoded = set.encode();
        assert_eq!(RoleSet::decode(Some(encoded.as_str())).unwrap(), set, "{}", encoded);
    }
}

#[test]
fn test_any_and_all_agree_with_has_role() {
    let subsets = all_subsets();
    for set in &subsets {
        for query in &subsets {
            let tags: Vec<RoleTag> = query.iter().collect();
            let any = tags.iter().any(|t| set.has_role(*t));
            let all = tags.iter().all(|t| set.has_role(*t));
            assert_eq!(set.has_any_role(&tags), any);
            assert_eq!(set.has_all_roles(&tags), all);
        }
    }
}

#[test]
fn test_empty_queries() {
    let set: RoleSet = [RoleTag::Admin].into_iter().collect();
    assert!(!set.has_any_role(&[]));
    assert!(set.has_all_roles(&[]));
}

#[test]
fn test_add_then_remove_restores_original() {
    for original in all_subsets() {
        for tag in RoleTag::iter() {
            if original.has_role(tag) {
                continue;
            }
            let mut set = original.clone();
            assert!(set.add_role(tag));
            assert!(set.remove_role(tag));
            assert_eq!(set, original);
        }
    }
}

#[test]
fn test_add_and_remove_report_no_ops() {
    let mut set = RoleSet::new();
    assert!(set.add_role(RoleTag::Member));
    assert!(!set.add_role(RoleTag::Member));
    assert!(!set.remove_role(RoleTag::Admin));
    assert_eq!(set.len(), 1);
}

#[test]
fn test_labels_follow_enumeration_order() {
    let set: RoleSet = [RoleTag::Student, RoleTag::Admin, RoleTag::Parent]
        .into_iter()
        .collect();
    assert_eq!(set.labels(), "Admin, Parent, Student");
    assert_eq!(set.to_string(), "Admin, Parent, Student");
}

#[test]
fn test_from_machine_values() {
    let set = RoleSet::from_machine_values(["member", "teacher"]).unwrap();
    assert!(set.has_role(RoleTag::Member));
    assert!(set.has_role(RoleTag::Teacher));

    assert_eq!(
        RoleSet::from_machine_values(["member", "MEMBER"]),
        Err(Error::InvalidRole("MEMBER".to_string()))
    );
}

#[test]
fn test_role_labels_and_values() {
    let pairs: Vec<(&str, &str)> = RoleTag::iter()
        .map(|t| (t.machine_value(), t.label()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("admin", "Admin"),
            ("member", "Member"),
            ("teacher", "Teacher"),
            ("parent", "Parent"),
            ("student", "Student"),
        ]
    );
}

#[test]
fn test_serde_deserialize_collapses_duplicates_and_rejects_unknown() {
    let set: RoleSet = serde_json::from_str(r#"["admin","student","admin"]"#).unwrap();
    assert_eq!(set.len(), 2);
    assert!(set.has_all_roles(&[RoleTag::Admin, RoleTag::Student]));

    assert!(serde_json::from_str::<RoleSet>(r#"["admin","rabbi"]"#).is_err());
    assert!(serde_json::from_str::<RoleSet>(r#"["Admin"]"#).is_err());
}
