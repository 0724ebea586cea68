#![forbid(unsafe_code)]

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "quorumdoc",
    version,
    about = "Propose, vote on and merge section-scoped document changes",
    arg_required_else_help = true
)]
pub struct Cli {
    /// YAML config file (default: $QUORUMDOC_CONFIG or ./quorumdoc.yaml).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Store directory (overrides config and QUORUMDOC_STORAGE_DIR).
    #[arg(long, global = true, value_name = "DIR")]
    pub storage_dir: Option<PathBuf>,

    /// Debug output (repeat for trace).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Projects and their governance.
    #[command(subcommand)]
    Project(ProjectCmd),

    /// Documents, sections and merge history.
    #[command(subcommand)]
    Doc(DocCmd),

    /// Change proposals.
    #[command(subcommand)]
    Change(ChangeCmd),

    /// Vote on a change or a document.
    Vote(VoteArgs),

    /// Merge one passing change.
    Merge(MergeArgs),

    /// Merge every passing published change.
    AutoMerge(AutoMergeArgs),
}

#[derive(Args, Debug, Default)]
pub struct GovernanceArgs {
    /// Size of the voting pool.
    #[arg(long, value_name = "N")]
    pub pool_size: Option<u32>,

    /// Share of the pool that must vote yes, in (0, 1].
    #[arg(long, value_name = "RATIO")]
    pub threshold: Option<f64>,

    /// Voting window after publication.
    #[arg(long, value_name = "HOURS")]
    pub duration_hours: Option<u32>,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCmd {
    /// Create a project; unset governance flags use the configured defaults.
    Create {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        governance: GovernanceArgs,
    },
    Show {
        #[arg(long)]
        id: i64,
    },
    /// Change governance; open changes are judged by the new rules.
    Governance {
        #[arg(long)]
        id: i64,
        #[command(flatten)]
        governance: GovernanceArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum DocCmd {
    /// Create a document from `#` heading outline text (`-` reads stdin).
    Create {
        #[arg(long)]
        project: i64,
        #[arg(long)]
        title: String,
        #[arg(long, value_name = "PATH")]
        outline: PathBuf,
    },
    /// Print the numbered outline.
    Show {
        #[arg(long)]
        id: i64,
        /// Print blocks as JSON instead of the outline.
        #[arg(long)]
        json: bool,
    },
    Sections {
        #[arg(long)]
        id: i64,
    },
    History {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum ChangeCmd {
    /// Validate and store a change from a JSON ops file (`-` reads stdin).
    Propose(ProposeArgs),
    Publish {
        #[arg(long)]
        id: i64,
    },
    Show {
        #[arg(long)]
        id: i64,
    },
    List {
        #[arg(long)]
        doc: i64,
        /// draft, published, merged or needs_update.
        #[arg(long)]
        status: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct ProposeArgs {
    #[arg(long)]
    pub doc: i64,

    /// Target section id, or `root` for a new top-level section.
    #[arg(long)]
    pub section: String,

    #[arg(long, value_name = "PATH")]
    pub ops: PathBuf,

    #[arg(long)]
    pub author: String,

    #[arg(long, default_value = "")]
    pub summary: String,

    /// Extra block ids the change claims, comma separated.
    #[arg(long, value_delimiter = ',')]
    pub affected: Vec<String>,

    /// Only validate and print the preview.
    #[arg(long, conflicts_with = "publish")]
    pub dry_run: bool,

    /// Publish right away (records the author's yes vote).
    #[arg(long)]
    pub publish: bool,
}

#[derive(Args, Debug)]
pub struct VoteArgs {
    #[arg(long)]
    pub user: String,

    #[arg(long, conflicts_with = "entry", required_unless_present = "entry")]
    pub change: Option<i64>,

    /// Document id, for votes on the document itself.
    #[arg(long)]
    pub entry: Option<i64>,

    /// -1, 0 (clears the vote) or 1.
    #[arg(long, allow_negative_numbers = true)]
    pub value: i64,
}

#[derive(Args, Debug)]
pub struct MergeArgs {
    #[arg(long)]
    pub change: i64,
}

#[derive(Args, Debug)]
pub struct AutoMergeArgs {
    #[arg(long, conflicts_with = "project")]
    pub doc: Option<i64>,

    #[arg(long)]
    pub project: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_negative_vote() {
        let cli = Cli::try_parse_from([
            "quorumdoc", "vote", "--user", "ana", "--change", "3", "--value", "-1",
        ])
        .unwrap();
        match cli.command {
            Command::Vote(args) => {
                assert_eq!(args.change, Some(3));
                assert_eq!(args.value, -1);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_affected_list_and_globals() {
        let cli = Cli::try_parse_from([
            "quorumdoc",
            "change",
            "propose",
            "--doc",
            "1",
            "--section",
            "rules",
            "--ops",
            "ops.json",
            "--author",
            "ana",
            "--affected",
            "p_1,p_2",
            "-vv",
            "--storage-dir",
            "/tmp/qd",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.storage_dir, Some(PathBuf::from("/tmp/qd")));
        match cli.command {
            Command::Change(ChangeCmd::Propose(args)) => {
                assert_eq!(args.affected, vec!["p_1".to_string(), "p_2".to_string()]);
                assert!(!args.publish);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
