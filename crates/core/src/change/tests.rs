use super::*;

fn blocks(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

#[test]
fn overlapping_published_changes_go_stale() {
    let a = blocks(&["p1"]);
    let b = blocks(&["p1", "p2"]);
    let c = blocks(&["p9"]);
    let stale = stale_changes(
        1,
        &a,
        [
            ChangeFootprint {
                change_id: 1,
                status: ChangeStatus::Published,
                affected_blocks: &a,
            },
            ChangeFootprint {
                change_id: 2,
                status: ChangeStatus::Published,
                affected_blocks: &b,
            },
            ChangeFootprint {
                change_id: 3,
                status: ChangeStatus::Published,
                affected_blocks: &c,
            },
        ],
    );
    assert_eq!(stale, vec![2]);
}

#[test]
fn only_published_candidates_are_marked() {
    let merged = blocks(&["p1"]);
    let other = blocks(&["p1"]);
    let stale = stale_changes(
        1,
        &merged,
        [
            ChangeFootprint {
                change_id: 2,
                status: ChangeStatus::Draft,
                affected_blocks: &other,
            },
            ChangeFootprint {
                change_id: 3,
                status: ChangeStatus::NeedsUpdate,
                affected_blocks: &other,
            },
        ],
    );
    assert!(stale.is_empty());
}

#[test]
fn status_transitions() {
    assert!(ChangeStatus::Draft.can_publish());
    assert!(!ChangeStatus::Published.can_publish());
    assert!(ChangeStatus::Published.can_merge());
    assert!(ChangeStatus::NeedsUpdate.can_merge());
    assert!(!ChangeStatus::Draft.can_merge());
    assert!(!ChangeStatus::Merged.is_open());
}

#[test]
fn status_strings_match_serde_names() {
    for status in [
        ChangeStatus::Draft,
        ChangeStatus::Published,
        ChangeStatus::Merged,
        ChangeStatus::NeedsUpdate,
    ] {
        let encoded = serde_json::to_value(status).unwrap();
        assert_eq!(encoded, serde_json::Value::from(status.as_str()));
        assert_eq!(ChangeStatus::parse(status.as_str()), Some(status));
    }
    assert_eq!(TargetType::parse("change"), Some(TargetType::Change));
    assert_eq!(TargetType::parse("comment"), None);
}
