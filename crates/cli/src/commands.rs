#![forbid(unsafe_code)]

use crate::cli::{
    AutoMergeArgs, ChangeCmd, Command, DocCmd, GovernanceArgs, ProjectCmd, ProposeArgs, VoteArgs,
};
use crate::config::Config;
use crate::timestamps::ts_ms_to_rfc3339;
use anyhow::{Context, bail};
use qd_core::change::{ChangeStatus, TargetType};
use qd_core::governance::{GovernanceSettings, VoteValue};
use qd_core::ops::parse_ops_str;
use qd_core::outline::parse_outline;
use qd_core::scope::ChangeTarget;
use qd_storage::{
    CastVoteRequest, ChangeRow, CreateChangeRequest, CreateDocumentRequest, CreateProjectRequest,
    ListChangesRequest, MergeScope, SqliteStore, StageChangeRequest,
};
use serde::Serialize;
use serde_json::json;
use std::io::Read;
use std::path::Path;

pub fn run(store: &mut SqliteStore, config: &Config, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Project(cmd) => project(store, config, cmd),
        Command::Doc(cmd) => doc(store, cmd),
        Command::Change(cmd) => change(store, cmd),
        Command::Vote(args) => vote(store, args),
        Command::Merge(args) => {
            let outcome = store.merge_change(args.change)?;
            print_json(&outcome)
        }
        Command::AutoMerge(args) => auto_merge(store, args),
    }
}

fn project(store: &mut SqliteStore, config: &Config, cmd: ProjectCmd) -> anyhow::Result<()> {
    match cmd {
        ProjectCmd::Create { name, governance } => {
            let governance = resolve_governance(&governance, &config.governance)?;
            let project = store.create_project(CreateProjectRequest { name, governance })?;
            print_json(&project)
        }
        ProjectCmd::Show { id } => {
            let project = store.project(id)?;
            print_json(&json!({
                "project": project,
                "approval_threshold": project.governance.approval_threshold(),
                "required_yes_votes": project.governance.required_yes_votes(),
            }))
        }
        ProjectCmd::Governance { id, governance } => {
            let current = store.project(id)?.governance;
            let governance = resolve_governance(&governance, &current)?;
            let project = store.update_governance(id, governance)?;
            print_json(&project)
        }
    }
}

fn resolve_governance(
    args: &GovernanceArgs,
    base: &GovernanceSettings,
) -> anyhow::Result<GovernanceSettings> {
    let settings = GovernanceSettings::try_new(
        args.pool_size.unwrap_or(base.voting_pool_size),
        args.threshold.unwrap_or_else(|| base.approval_threshold()),
        args.duration_hours.unwrap_or(base.voting_duration_hours),
    )?;
    Ok(settings)
}

fn doc(store: &mut SqliteStore, cmd: DocCmd) -> anyhow::Result<()> {
    match cmd {
        DocCmd::Create {
            project,
            title,
            outline,
        } => {
            let text = read_input(&outline)?;
            let blocks = parse_outline(&text);
            if blocks.is_empty() {
                bail!("outline {} has no blocks", outline.display());
            }
            let document = store.create_document(CreateDocumentRequest {
                project_id: project,
                title,
                blocks,
            })?;
            print_json(&document)
        }
        DocCmd::Show { id, json } => {
            if json {
                let document = store.document(id)?;
                let blocks = store.document_blocks(id)?;
                return print_json(&json!({ "document": document, "blocks": blocks }));
            }
            println!("{}", store.outline(id)?);
            Ok(())
        }
        DocCmd::Sections { id } => {
            let index = store.section_index(id)?;
            print_json(&index.sections())
        }
        DocCmd::History { id } => {
            let history = store
                .history(id)?
                .into_iter()
                .map(|row| {
                    json!({
                        "version": row.version,
                        "change_id": row.change_id,
                        "created_at": ts_ms_to_rfc3339(row.created_at_ms),
                        "outline_before": row.outline_before,
                        "outline_after": row.outline_after,
                    })
                })
                .collect::<Vec<_>>();
            print_json(&history)
        }
    }
}

fn change(store: &mut SqliteStore, cmd: ChangeCmd) -> anyhow::Result<()> {
    match cmd {
        ChangeCmd::Propose(args) => propose(store, args),
        ChangeCmd::Publish { id } => {
            let change = store.publish_change(id)?;
            print_json(&change_view(store, &change)?)
        }
        ChangeCmd::Show { id } => {
            let change = store.change(id)?;
            print_json(&change_view(store, &change)?)
        }
        ChangeCmd::List { doc, status } => {
            let status = match status.as_deref() {
                Some(raw) => Some(
                    ChangeStatus::parse(raw)
                        .with_context(|| format!("unknown change status: {raw}"))?,
                ),
                None => None,
            };
            let changes = store.list_changes(ListChangesRequest {
                document_id: doc,
                status,
            })?;
            let summary = changes
                .iter()
                .map(|c| {
                    json!({
                        "id": c.id,
                        "status": c.status,
                        "target_section_id": c.target.as_str(),
                        "author": c.author,
                        "summary": c.summary,
                        "base_version": c.base_version,
                    })
                })
                .collect::<Vec<_>>();
            print_json(&summary)
        }
    }
}

fn propose(store: &mut SqliteStore, args: ProposeArgs) -> anyhow::Result<()> {
    let raw = read_input(&args.ops)?;
    let ops = parse_ops_str(&raw)?;
    let staged = store.stage_change(StageChangeRequest {
        document_id: args.doc,
        target: ChangeTarget::parse(&args.section),
        ops,
        affected_blocks: args.affected,
    })?;
    if args.dry_run {
        println!("{}", staged.validated.before_outline);
        println!("---");
        println!("{}", staged.validated.after_outline);
        return Ok(());
    }
    let change = store.create_change(CreateChangeRequest {
        staged,
        author: args.author,
        summary: args.summary,
        publish: args.publish,
    })?;
    print_json(&change_view(store, &change)?)
}

fn change_view(store: &SqliteStore, change: &ChangeRow) -> anyhow::Result<serde_json::Value> {
    let progress = store.merge_progress(change.id)?;
    Ok(json!({
        "change": change,
        "progress": progress,
        "created_at": ts_ms_to_rfc3339(change.created_at_ms),
        "published_at": change.published_at_ms.map(ts_ms_to_rfc3339),
        "closes_at": change.closes_at_ms.map(ts_ms_to_rfc3339),
        "merged_at": change.merged_at_ms.map(ts_ms_to_rfc3339),
    }))
}

fn vote(store: &mut SqliteStore, args: VoteArgs) -> anyhow::Result<()> {
    let (target_type, target_id) = match (args.change, args.entry) {
        (Some(change_id), None) => (TargetType::Change, change_id),
        (None, Some(document_id)) => (TargetType::Entry, document_id),
        _ => bail!("pass exactly one of --change or --entry"),
    };
    let value = VoteValue::try_from(args.value)?;
    let tally = store.cast_vote(CastVoteRequest {
        user: args.user,
        target_type,
        target_id,
        value,
    })?;
    let mut out = json!({
        "target_type": target_type,
        "target_id": target_id,
        "yes": tally.yes,
        "no": tally.no,
        "net": tally.net(),
    });
    if target_type == TargetType::Change {
        out["passing"] = json!(store.is_passing(target_id)?);
    }
    print_json(&out)
}

fn auto_merge(store: &mut SqliteStore, args: AutoMergeArgs) -> anyhow::Result<()> {
    let scope = match (args.doc, args.project) {
        (Some(document_id), _) => MergeScope::Document(document_id),
        (None, Some(project_id)) => MergeScope::Project(project_id),
        (None, None) => MergeScope::All,
    };
    let merged = store.auto_merge(scope)?;
    print_json(&json!({ "merged": merged }))
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
