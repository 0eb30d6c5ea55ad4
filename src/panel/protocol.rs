//! Message-channel types — the JSON payloads exchanged with the panel UI.
//!
//! Inbound messages are tagged by `command` in kebab-case; outbound messages
//! mirror the same shape. Everything is plain serde data so the channel stays
//! transport-agnostic (stdio here, a webview post elsewhere).

use serde::{Deserialize, Serialize};

use git_panel::{CommitGraph, Filter};

/// UI → panel commands.
#[derive(Deserialize, Debug)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum InboundMessage {
    GetHistory {
        #[serde(default)]
        filter: Filter,
        #[serde(default, rename = "forceRefresh")]
        force_refresh: bool,
    },
    GetAllBranches,
    GetAllAuthors,
    ShowCommitDetails {
        /// JSON-encoded `string[]` of commit hashes.
        #[serde(rename = "commitHashes")]
        commit_hashes: String,
    },
    ShowChangesPanel,
    ClearHistory,
}

/// Panel → UI messages.
#[derive(Serialize, Debug)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum OutboundMessage {
    History { commits: CommitGraph },
    Branches { branches: Vec<String> },
    Authors { authors: Vec<String> },
    ClearSelected,
    Error { message: String },
}
