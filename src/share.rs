// Sharing - format the ranking as text and hand it off

use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{anyhow, Context, Result};

use crate::ranking::RankedList;

/// Environment variable naming the command the share body is piped to.
pub const SHARE_CMD_ENV: &str = "REELRANK_SHARE_CMD";

/// Newline-joined, rank-ascending share block:
///
/// ```text
/// My Movies Ranked:
/// 1. Heat
/// 2. Ran
/// ```
///
/// An empty ranking produces just the heading.
pub fn share_text(ranked: &RankedList) -> String {
    let mut lines = vec!["My Movies Ranked:".to_string()];
    for entry in ranked.entries() {
        lines.push(format!("{}. {}", entry.rank, entry.title));
    }
    lines.join("\n")
}

/// Outbound message seam. The UI reports a sender that cannot send;
/// it never treats that as fatal.
pub trait MessageSender {
    fn can_send(&self) -> bool;
    fn send(&self, body: &str) -> Result<()>;
}

/// Pipes the share body to a user-configured shell command, the
/// desktop stand-in for a platform message composer.
pub struct CommandSender {
    command: String,
}

impl CommandSender {
    pub fn new(command: impl Into<String>) -> Self {
        CommandSender {
            command: command.into(),
        }
    }

    /// Sender from `REELRANK_SHARE_CMD`, if set to something non-empty.
    pub fn from_env() -> Option<Self> {
        let command = std::env::var(SHARE_CMD_ENV).ok()?;
        if command.trim().is_empty() {
            return None;
        }
        Some(CommandSender::new(command))
    }
}

impl MessageSender for CommandSender {
    fn can_send(&self) -> bool {
        !self.command.trim().is_empty()
    }

    fn send(&self, body: &str) -> Result<()> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn share command '{}'", self.command))?;

        child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("share command has no stdin"))?
            .write_all(body.as_bytes())
            .context("failed to write share body")?;

        let status = child.wait().context("share command did not finish")?;
        if !status.success() {
            return Err(anyhow!("share command exited with {status}"));
        }
        Ok(())
    }
}
