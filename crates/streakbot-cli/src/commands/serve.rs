//! Line-oriented bot host.
//!
//! Each stdin line is one group message, `<username> <text>`. Replies and
//! scheduled announcements go to stdout; logs go to stderr.

use std::sync::Arc;

use streakbot_core::{Announcer, ChatMessage, CommandHandler, Scheduler, StdoutAnnouncer};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{load_config, open_store, CliResult};

pub fn run() -> CliResult {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve())
}

/// Messages are read as coming from `group.allowed_id`.
async fn serve() -> CliResult {
    let config = load_config()?;
    let store = open_store()?;
    let announcer: Arc<dyn Announcer> = Arc::new(StdoutAnnouncer);

    let scheduler = Scheduler::from_config(&config, Arc::clone(&store), announcer)?;
    let scheduler_task = scheduler.spawn();

    let group_id = config.group.allowed_id;
    let handler = CommandHandler::new(store, group_id);
    tracing::info!(group_id, "serving chat on stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some((username, text)) = split_line(&line) else {
            continue;
        };
        let message = ChatMessage {
            username,
            group_id,
            text,
        };
        match handler.handle(message) {
            Ok(Some(reply)) => println!("@{username} {reply}"),
            Ok(None) => {}
            Err(e) => tracing::error!(username, "command failed: {e}"),
        }
    }

    tracing::info!("stdin closed, stopping scheduler");
    scheduler_task.abort();
    Ok(())
}

/// `"alice +1"` -> `("alice", "+1")`. A leading `@` on the name is dropped.
fn split_line(line: &str) -> Option<(&str, &str)> {
    let (username, text) = line.trim().split_once(char::is_whitespace)?;
    let username = username.trim_start_matches('@');
    if username.is_empty() {
        return None;
    }
    Some((username, text.trim()))
}
