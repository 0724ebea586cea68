use super::*;
use crate::ops::NewBlock;

fn doc() -> Vec<Block> {
    vec![
        Block::heading("h_a", "Section A", None).with_order_key(1.0),
        Block::paragraph("p_a", "Body A", Some("h_a")).with_order_key(2.0),
        Block::heading("h_b", "Section B", None).with_order_key(3.0),
        Block::paragraph("p_b", "Body B", Some("h_b")).with_order_key(4.0),
        Block::heading("h_b1", "Sub B", Some("h_b")).with_order_key(5.0),
        Block::paragraph("p_b1", "Body B1", Some("h_b1")).with_order_key(6.0),
    ]
}

fn section(id: &str) -> ChangeTarget {
    ChangeTarget::Section(id.to_string())
}

fn update(block_id: &str) -> Operation {
    Operation::UpdateText {
        block_id: block_id.to_string(),
        new_text: "edited".to_string(),
    }
}

fn insert(after: Option<&str>, id: Option<&str>, kind: BlockKind, text: &str, parent: Option<&str>) -> Operation {
    Operation::InsertBlock {
        after_id: after.map(str::to_string),
        new_block: NewBlock {
            id: id.map(str::to_string),
            kind,
            text: text.to_string(),
            parent: parent.map(str::to_string),
        },
    }
}

fn violation_block(err: ScopeError) -> String {
    match err {
        ScopeError::Violation { block_id, .. } => block_id,
        other => panic!("expected scope violation, got {other:?}"),
    }
}

#[test]
fn update_inside_section_is_staged() {
    let staged =
        validate_and_stage_change(&doc(), &section("a"), vec![update("p_a")], Vec::new()).unwrap();
    assert_eq!(staged.affected_blocks, BTreeSet::from(["p_a".to_string()]));
    assert!(staged.after_outline.contains("‣ edited"));
    assert!(staged.before_outline.contains("‣ Body A"));
}

#[test]
fn update_outside_section_is_rejected() {
    let err = validate_and_stage_change(&doc(), &section("a"), vec![update("p_b")], Vec::new())
        .unwrap_err();
    assert_eq!(violation_block(err), "p_b");
}

#[test]
fn nested_blocks_are_in_parent_section_scope() {
    let staged =
        validate_and_stage_change(&doc(), &section("b"), vec![update("p_b1")], Vec::new()).unwrap();
    assert!(staged.affected_blocks.contains("p_b1"));
    let err = validate_and_stage_change(&doc(), &section("b1"), vec![update("p_b")], Vec::new())
        .unwrap_err();
    assert_eq!(violation_block(err), "p_b");
}

#[test]
fn unknown_section_is_reported() {
    let err = validate_and_stage_change(&doc(), &section("zzz"), vec![], Vec::new()).unwrap_err();
    assert_eq!(err, ScopeError::UnknownSection("zzz".to_string()));
}

#[test]
fn insert_mints_ids_usable_by_later_ops() {
    let ops = vec![
        insert(Some("p_a"), None, BlockKind::Paragraph, "fresh", Some("h_a")),
        insert(Some("p_a"), Some("h_a_sub"), BlockKind::Heading, "Sub A", Some("h_a")),
        insert(Some("h_a_sub"), None, BlockKind::Paragraph, "under sub", Some("h_a_sub")),
    ];
    let staged = validate_and_stage_change(&doc(), &section("a"), ops, Vec::new()).unwrap();
    assert_eq!(staged.inserted_ids.len(), 3);
    assert!(staged.inserted_ids[0].starts_with("b_"));
    match &staged.ops[0] {
        Operation::InsertBlock { new_block, .. } => {
            assert_eq!(new_block.id.as_deref(), Some(staged.inserted_ids[0].as_str()));
        }
        other => panic!("expected insert, got {other:?}"),
    }
    assert!(staged.affected_blocks.contains("h_a_sub"));
    assert!(staged.after_outline.contains("1.1 Sub A"));
}

#[test]
fn insert_rules_guard_parent_anchor_and_ids() {
    let outside_parent = vec![insert(Some("p_a"), None, BlockKind::Paragraph, "x", Some("h_b"))];
    let err = validate_and_stage_change(&doc(), &section("a"), outside_parent, Vec::new())
        .unwrap_err();
    assert_eq!(violation_block(err), "h_b");

    let outside_anchor = vec![insert(Some("p_b"), None, BlockKind::Paragraph, "x", Some("h_a"))];
    let err = validate_and_stage_change(&doc(), &section("a"), outside_anchor, Vec::new())
        .unwrap_err();
    assert_eq!(violation_block(err), "p_b");

    let root_block = vec![insert(Some("p_a"), None, BlockKind::Paragraph, "x", None)];
    assert!(validate_and_stage_change(&doc(), &section("a"), root_block, Vec::new()).is_err());

    let bad_heading_id = vec![insert(Some("p_a"), Some("sub"), BlockKind::Heading, "x", Some("h_a"))];
    let err = validate_and_stage_change(&doc(), &section("a"), bad_heading_id, Vec::new())
        .unwrap_err();
    assert_eq!(violation_block(err), "sub");

    let duplicate = vec![insert(Some("p_a"), Some("p_b"), BlockKind::Paragraph, "x", Some("h_a"))];
    let err =
        validate_and_stage_change(&doc(), &section("a"), duplicate, Vec::new()).unwrap_err();
    assert_eq!(violation_block(err), "p_b");

    let paragraph_parent = vec![insert(Some("p_a"), None, BlockKind::Paragraph, "x", Some("p_a"))];
    let err = validate_and_stage_change(&doc(), &section("a"), paragraph_parent, Vec::new())
        .unwrap_err();
    assert_eq!(violation_block(err), "p_a");
}

#[test]
fn section_heading_may_move_to_top_level() {
    let ops = vec![Operation::MoveBlock {
        block_id: "h_b1".to_string(),
        after_id: Some("p_b1".to_string()),
        new_parent: ParentChange::Detach,
    }];
    let staged = validate_and_stage_change(&doc(), &section("b1"), ops, Vec::new()).unwrap();
    assert!(staged.after_outline.contains("3 Sub B"));

    let ops = vec![Operation::MoveBlock {
        block_id: "p_b1".to_string(),
        after_id: Some("h_b1".to_string()),
        new_parent: ParentChange::Detach,
    }];
    let err = validate_and_stage_change(&doc(), &section("b1"), ops, Vec::new()).unwrap_err();
    match err {
        ScopeError::Violation { block_id, reason, .. } => {
            assert_eq!(block_id, "p_b1");
            assert!(reason.contains("top level"), "unexpected reason: {reason}");
        }
        other => panic!("expected scope violation, got {other:?}"),
    }
}

#[test]
fn section_edits_without_anchor_are_rejected() {
    let unanchored_insert = vec![insert(None, Some("b_x"), BlockKind::Paragraph, "smuggled", Some("h_b1"))];
    let err = validate_and_stage_change(&doc(), &section("b1"), unanchored_insert, Vec::new())
        .unwrap_err();
    match err {
        ScopeError::Violation { index, op, block_id, .. } => {
            assert_eq!(index, 0);
            assert_eq!(op, "INSERT_BLOCK");
            assert_eq!(block_id, "b_x");
        }
        other => panic!("expected scope violation, got {other:?}"),
    }

    let unanchored_move = vec![
        insert(Some("p_b1"), Some("b_x"), BlockKind::Paragraph, "fine", Some("h_b1")),
        Operation::MoveBlock {
            block_id: "p_b1".to_string(),
            after_id: None,
            new_parent: ParentChange::Keep,
        },
    ];
    let err = validate_and_stage_change(&doc(), &section("b1"), unanchored_move, Vec::new())
        .unwrap_err();
    match err {
        ScopeError::Violation { index, op, block_id, .. } => {
            assert_eq!(index, 1);
            assert_eq!(op, "MOVE_BLOCK");
            assert_eq!(block_id, "p_b1");
        }
        other => panic!("expected scope violation, got {other:?}"),
    }

    let empty_anchor = vec![Operation::MoveBlock {
        block_id: "p_b1".to_string(),
        after_id: Some(String::new()),
        new_parent: ParentChange::Keep,
    }];
    assert!(validate_and_stage_change(&doc(), &section("b1"), empty_anchor, Vec::new()).is_err());

    let anchored = vec![Operation::MoveBlock {
        block_id: "p_b1".to_string(),
        after_id: Some("h_b1".to_string()),
        new_parent: ParentChange::Keep,
    }];
    let staged = validate_and_stage_change(&doc(), &section("b1"), anchored, Vec::new()).unwrap();
    assert!(staged.after_outline.starts_with("1 Section A"));
}

#[test]
fn move_into_foreign_heading_is_rejected() {
    let ops = vec![Operation::MoveBlock {
        block_id: "p_b1".to_string(),
        after_id: Some("h_b1".to_string()),
        new_parent: ParentChange::Attach("h_a".to_string()),
    }];
    let err = validate_and_stage_change(&doc(), &section("b"), ops, Vec::new()).unwrap_err();
    assert_eq!(violation_block(err), "h_a");
}

#[test]
fn orphaning_delete_is_rejected_but_full_removal_passes() {
    let orphaning = vec![Operation::DeleteBlock {
        block_id: "h_b1".to_string(),
    }];
    let err = validate_and_stage_change(&doc(), &section("b"), orphaning, Vec::new()).unwrap_err();
    assert!(matches!(err, ScopeError::Apply(ApplyError::DanglingParent { .. })));

    let full = vec![
        Operation::DeleteBlock {
            block_id: "p_b1".to_string(),
        },
        Operation::DeleteBlock {
            block_id: "h_b1".to_string(),
        },
    ];
    let staged = validate_and_stage_change(&doc(), &section("b"), full, Vec::new()).unwrap();
    assert!(staged.affected_blocks.contains("h_b1"));
    assert!(!staged.after_outline.contains("Sub B"));
}

#[test]
fn new_section_needs_titled_heading() {
    let untitled = vec![insert(Some("p_b1"), None, BlockKind::Heading, "  ", None)];
    let err = validate_and_stage_change(&doc(), &ChangeTarget::NewSection, untitled, Vec::new())
        .unwrap_err();
    assert_eq!(err, ScopeError::MissingSectionTitle);

    let err = validate_and_stage_change(&doc(), &ChangeTarget::NewSection, vec![], Vec::new())
        .unwrap_err();
    assert_eq!(err, ScopeError::MissingSectionTitle);
}

#[test]
fn new_section_may_only_edit_its_own_blocks() {
    let ops = vec![
        insert(Some("p_b1"), Some("h_new"), BlockKind::Heading, "Budget", None),
        insert(Some("h_new"), None, BlockKind::Paragraph, "Dues are yearly", Some("h_new")),
        update("h_new"),
    ];
    let staged =
        validate_and_stage_change(&doc(), &ChangeTarget::NewSection, ops, Vec::new()).unwrap();
    assert!(staged.after_outline.contains("3 edited"));
    assert_eq!(staged.target.as_str(), NEW_SECTION_TARGET);

    let ops = vec![
        insert(None, Some("h_new"), BlockKind::Heading, "Budget", None),
        update("p_a"),
    ];
    let err =
        validate_and_stage_change(&doc(), &ChangeTarget::NewSection, ops, Vec::new()).unwrap_err();
    assert_eq!(violation_block(err), "p_a");
}

#[test]
fn declared_affected_blocks_must_be_in_scope() {
    let staged = validate_and_stage_change(
        &doc(),
        &section("a"),
        vec![update("p_a")],
        vec!["h_a".to_string()],
    )
    .unwrap();
    assert_eq!(staged.affected_blocks.len(), 2);

    let err = validate_and_stage_change(
        &doc(),
        &section("a"),
        vec![update("p_a")],
        vec!["p_b".to_string()],
    )
    .unwrap_err();
    assert_eq!(err, ScopeError::AffectedOutOfScope("p_b".to_string()));
}

#[test]
fn target_parses_sentinel() {
    assert_eq!(ChangeTarget::parse("root"), ChangeTarget::NewSection);
    assert_eq!(ChangeTarget::parse(""), ChangeTarget::NewSection);
    assert_eq!(ChangeTarget::parse("purpose"), section("purpose"));
}
