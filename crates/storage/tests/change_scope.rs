#![forbid(unsafe_code)]

use qd_core::block::{Block, BlockKind};
use qd_core::change::{ChangeStatus, TargetType};
use qd_core::governance::{GovernanceSettings, VoteValue};
use qd_core::ops::{ApplyError, NewBlock, Operation, ParentChange, parse_ops};
use qd_core::scope::{ChangeTarget, ScopeError};
use qd_storage::{
    CastVoteRequest, CreateChangeRequest, CreateDocumentRequest, CreateProjectRequest,
    ListChangesRequest, SqliteStore, StageChangeRequest, StoreError,
};
use serde_json::json;
use std::path::PathBuf;

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let dir = base.join(format!("qd_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn seeded_store(test_name: &str) -> (SqliteStore, i64) {
    let mut store = SqliteStore::open(temp_dir(test_name)).expect("open store");
    let project = store
        .create_project(CreateProjectRequest {
            name: "bylaws".to_string(),
            governance: GovernanceSettings::try_new(1, 1.0, 24).expect("settings"),
        })
        .expect("create project");
    let document = store
        .create_document(CreateDocumentRequest {
            project_id: project.id,
            title: "Bylaws".to_string(),
            blocks: vec![
                Block::heading("h_a", "Members", None),
                Block::paragraph("p_a", "Anyone may join.", Some("h_a")),
                Block::heading("h_b", "Meetings", None),
                Block::paragraph("p_b", "Monthly.", Some("h_b")),
                Block::heading("h_c", "Money", None),
                Block::paragraph("p_c", "Dues fund the space.", Some("h_c")),
            ],
        })
        .expect("create document");
    (store, document.id)
}

fn stage(
    store: &SqliteStore,
    document_id: i64,
    target: &str,
    ops: Vec<Operation>,
) -> Result<qd_storage::StagedChange, StoreError> {
    store.stage_change(StageChangeRequest {
        document_id,
        target: ChangeTarget::parse(target),
        ops,
        affected_blocks: Vec::new(),
    })
}

fn create_and_merge(store: &mut SqliteStore, staged: qd_storage::StagedChange) -> i64 {
    let change = store
        .create_change(CreateChangeRequest {
            staged,
            author: "ida".to_string(),
            summary: "edit".to_string(),
            publish: true,
        })
        .expect("create change");
    store.merge_change(change.id).expect("merge");
    change.id
}

fn order(store: &SqliteStore, document_id: i64) -> Vec<String> {
    store
        .document_blocks(document_id)
        .expect("blocks")
        .into_iter()
        .map(|b| b.id)
        .collect()
}

#[test]
fn out_of_scope_change_is_never_stored() {
    let (store, document_id) = seeded_store("out_of_scope_change_is_never_stored");
    let err = stage(
        &store,
        document_id,
        "a",
        vec![Operation::UpdateText {
            block_id: "p_b".to_string(),
            new_text: "Weekly.".to_string(),
        }],
    )
    .expect_err("scope violation");
    match err {
        StoreError::Scope(ScopeError::Violation { index, block_id, .. }) => {
            assert_eq!(index, 0);
            assert_eq!(block_id, "p_b");
        }
        other => panic!("expected scope violation, got {other:?}"),
    }
    let changes = store
        .list_changes(ListChangesRequest {
            document_id,
            status: None,
        })
        .expect("list");
    assert!(changes.is_empty());
}

#[test]
fn orphaning_delete_is_rejected_at_staging() {
    let (store, document_id) = seeded_store("orphaning_delete_is_rejected_at_staging");
    let err = stage(
        &store,
        document_id,
        "c",
        vec![Operation::DeleteBlock {
            block_id: "h_c".to_string(),
        }],
    )
    .expect_err("orphaning delete");
    assert!(matches!(
        err,
        StoreError::Scope(ScopeError::Apply(ApplyError::DanglingParent { .. }))
    ));
}

#[test]
fn moves_stay_inside_the_section() {
    let (mut store, document_id) = seeded_store("moves_stay_inside_the_section");
    let ops = parse_ops(&json!([
        {"type": "INSERT_BLOCK", "after_id": "p_b", "new_block": {"id": "b_agenda", "type": "p", "text": "Agenda first.", "parent": "h_b"}},
        {"type": "MOVE_BLOCK", "block_id": "b_agenda", "after_id": "h_b"}
    ]))
    .expect("parse ops");
    let staged = stage(&store, document_id, "b", ops).expect("stage");
    assert_eq!(
        staged.validated.affected_blocks.iter().cloned().collect::<Vec<_>>(),
        vec!["b_agenda".to_string()]
    );
    create_and_merge(&mut store, staged);

    assert_eq!(
        order(&store, document_id),
        vec!["h_a", "p_a", "h_b", "b_agenda", "p_b", "h_c", "p_c"]
    );
    let index = store.section_index(document_id).expect("index");
    let numbering = index
        .sections()
        .iter()
        .map(|s| (s.section_id.clone(), s.numbering.clone()))
        .collect::<Vec<_>>();
    assert_eq!(
        numbering,
        vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
            ("c".to_string(), "3".to_string()),
        ]
    );

    let err = stage(
        &store,
        document_id,
        "b",
        vec![Operation::MoveBlock {
            block_id: "p_b".to_string(),
            after_id: Some("p_a".to_string()),
            new_parent: ParentChange::Keep,
        }],
    )
    .expect_err("anchor outside section");
    assert!(matches!(err, StoreError::Scope(ScopeError::Violation { .. })));
}

#[test]
fn nested_section_is_numbered_under_its_parent() {
    let (mut store, document_id) = seeded_store("nested_section_is_numbered_under_its_parent");
    let staged = stage(
        &store,
        document_id,
        "a",
        vec![
            Operation::InsertBlock {
                after_id: Some("p_a".to_string()),
                new_block: NewBlock {
                    id: Some("h_a_dues".to_string()),
                    kind: BlockKind::Heading,
                    text: "Dues".to_string(),
                    parent: Some("h_a".to_string()),
                },
            },
            Operation::InsertBlock {
                after_id: Some("h_a_dues".to_string()),
                new_block: NewBlock {
                    text: "Members pay yearly.".to_string(),
                    parent: Some("h_a_dues".to_string()),
                    ..NewBlock::default()
                },
            },
        ],
    )
    .expect("stage");
    assert!(staged.validated.after_outline.contains("  1.1 Dues"));
    create_and_merge(&mut store, staged);

    let index = store.section_index(document_id).expect("index");
    let dues = index.get_by_section("a_dues").expect("dues section");
    assert_eq!(dues.numbering, "1.1");
    assert_eq!(dues.depth, 2);
    assert_eq!(dues.parent_section_id.as_deref(), Some("a"));
    assert_eq!(dues.block_ids.len(), 2);
    let members = index.get_by_section("a").expect("members section");
    assert_eq!(members.block_ids.len(), 4);
}

#[test]
fn new_section_proposal_lands_at_the_end() {
    let (mut store, document_id) = seeded_store("new_section_proposal_lands_at_the_end");
    let staged = stage(
        &store,
        document_id,
        "root",
        vec![
            Operation::InsertBlock {
                after_id: Some("p_c".to_string()),
                new_block: NewBlock {
                    kind: BlockKind::Heading,
                    text: "Conduct".to_string(),
                    ..NewBlock::default()
                },
            },
        ],
    )
    .expect("stage");
    assert_eq!(staged.validated.target, ChangeTarget::NewSection);
    let heading_id = staged.validated.inserted_ids[0].clone();
    assert!(heading_id.starts_with("h_"));
    let change_id = create_and_merge(&mut store, staged);

    let change = store.change(change_id).expect("change");
    assert_eq!(change.status, ChangeStatus::Merged);
    assert_eq!(change.target, ChangeTarget::NewSection);
    assert!(store.outline(document_id).expect("outline").ends_with("4 Conduct"));

    let untitled = stage(
        &store,
        document_id,
        "root",
        vec![Operation::InsertBlock {
            after_id: None,
            new_block: NewBlock {
                kind: BlockKind::Heading,
                ..NewBlock::default()
            },
        }],
    )
    .expect_err("untitled section");
    assert!(matches!(
        untitled,
        StoreError::Scope(ScopeError::MissingSectionTitle)
    ));
}

#[test]
fn unknown_section_and_document_are_reported() {
    let (store, document_id) = seeded_store("unknown_section_and_document_are_reported");
    match stage(&store, document_id, "zz", Vec::new()) {
        Err(StoreError::Scope(ScopeError::UnknownSection(section))) => assert_eq!(section, "zz"),
        other => panic!("expected UnknownSection, got {other:?}"),
    }
    match stage(&store, 999, "a", Vec::new()) {
        Err(StoreError::UnknownDocument(999)) => {}
        other => panic!("expected UnknownDocument, got {other:?}"),
    }
}

#[test]
fn seeded_blocks_must_form_a_heading_tree() {
    let mut store = SqliteStore::open_in_memory().expect("open store");
    let project = store
        .create_project(CreateProjectRequest {
            name: "broken".to_string(),
            governance: GovernanceSettings::default(),
        })
        .expect("create project");

    let cases = [
        vec![Block::paragraph("p_1", "orphan", Some("h_missing"))],
        vec![
            Block::paragraph("p_1", "para", None),
            Block::paragraph("p_2", "under para", Some("p_1")),
        ],
        vec![
            Block::heading("h_1", "one", Some("h_2")),
            Block::heading("h_2", "two", Some("h_1")),
        ],
        vec![
            Block::heading("h_1", "one", None),
            Block::heading("h_1", "dup", None),
        ],
    ];
    for blocks in cases {
        let err = store
            .create_document(CreateDocumentRequest {
                project_id: project.id,
                title: "Broken".to_string(),
                blocks,
            })
            .expect_err("invalid seed");
        assert!(
            matches!(err, StoreError::InvalidInput(_) | StoreError::Arena(_)),
            "unexpected error {err:?}"
        );
    }

    match store.create_project(CreateProjectRequest {
        name: "broken".to_string(),
        governance: GovernanceSettings::default(),
    }) {
        Err(StoreError::InvalidInput(_)) => {}
        other => panic!("expected duplicate name error, got {other:?}"),
    }
}

#[test]
fn entry_votes_do_not_touch_blocks() {
    let (mut store, document_id) = seeded_store("entry_votes_do_not_touch_blocks");
    let before = store.document_blocks(document_id).expect("blocks");
    store
        .cast_vote(CastVoteRequest {
            user: "ida".to_string(),
            target_type: TargetType::Entry,
            target_id: document_id,
            value: VoteValue::Up,
        })
        .expect("vote");
    assert_eq!(store.document_blocks(document_id).expect("blocks"), before);
    assert_eq!(store.document(document_id).expect("document").version, 1);
}
