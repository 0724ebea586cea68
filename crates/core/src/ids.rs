#![forbid(unsafe_code)]

use crate::block::BlockKind;

pub const HEADING_ID_PREFIX: &str = "h_";
pub const PARAGRAPH_ID_PREFIX: &str = "b_";

const MAX_BLOCK_ID_LEN: usize = 100;
const MINTED_SUFFIX_LEN: usize = 12;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(String);

impl BlockId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, BlockIdError> {
        let value = value.into();
        validate_block_id(&value)?;
        Ok(Self(value))
    }

    /// Mints a fresh id whose prefix tells headings and paragraphs apart.
    pub fn mint(kind: BlockKind) -> Self {
        let prefix = match kind {
            BlockKind::Heading => HEADING_ID_PREFIX,
            BlockKind::Paragraph => PARAGRAPH_ID_PREFIX,
        };
        let hex = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{prefix}{}", &hex[..MINTED_SUFFIX_LEN]))
    }

    pub fn is_heading_id(&self) -> bool {
        self.0.starts_with(HEADING_ID_PREFIX)
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockIdError {
    Empty,
    TooLong,
    ContainsWhitespace,
    ContainsControl,
}

impl BlockIdError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "block id must not be empty",
            Self::TooLong => "block id is too long",
            Self::ContainsWhitespace => "block id must not contain whitespace",
            Self::ContainsControl => "block id contains control characters",
        }
    }
}

fn validate_block_id(value: &str) -> Result<(), BlockIdError> {
    if value.is_empty() {
        return Err(BlockIdError::Empty);
    }
    if value.len() > MAX_BLOCK_ID_LEN {
        return Err(BlockIdError::TooLong);
    }
    if value.chars().any(|c| c.is_control()) {
        return Err(BlockIdError::ContainsControl);
    }
    if value.chars().any(char::is_whitespace) {
        return Err(BlockIdError::ContainsWhitespace);
    }
    Ok(())
}

/// Section ids are heading ids without the heading prefix.
pub fn section_id_for_heading(heading_block_id: &str) -> &str {
    heading_block_id
        .strip_prefix(HEADING_ID_PREFIX)
        .unwrap_or(heading_block_id)
}
