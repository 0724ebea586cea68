#![forbid(unsafe_code)]

//! Document patch/merge engine: block tree, section index, operations,
//! scope validation and the voting state machine.

pub mod block;
pub mod change;
pub mod governance;
pub mod ids;
pub mod ops;
pub mod outline;
pub mod scope;
pub mod section;

pub use block::{Block, BlockArena, BlockKind};
pub use change::{ChangeStatus, TargetType};
pub use governance::{GovernanceSettings, MergeProgress, VoteTally, VoteValue};
pub use ops::{Operation, apply_ops, parse_ops};
pub use outline::{parse_outline, render_outline};
pub use scope::{ChangeTarget, ValidatedChange, validate_and_stage_change};
pub use section::{SectionIndex, SectionInfo, build_section_index};
