//! Chat command parsing and dispatch.
//!
//! Turns the text of a group message into a [`ChatCommand`], runs it against
//! the goal store and produces the reply the bot posts back. Validation and
//! "register first" problems become reply text; only database failures are
//! returned as errors.

use std::sync::Arc;

use crate::error::{CoreError, Result, ValidationError};
use crate::goals::WeeklyGoals;
use crate::storage::GoalStore;

pub const HELP_TEXT: &str = "Available Commands:
/register 1 2 3 4 5 6 7 - Register your weekly goals.
/modify 1 2 3 4 5 6 7 - Modify your weekly goals.
/optout <days> - Opt-out for specified days.
/optin - Return to tracking.
/help - Show this help message.

Just send '+1' to log your task!";

pub const NOT_AUTHORIZED: &str = "You are not authorized to use this bot here.";
pub const REGISTER_FIRST: &str = "You need to register your goals first using /register.";
const SEVEN_NUMBERS: &str = "Please provide 7 numbers for Monday to Sunday goals.";

/// A message the bot understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Register(Vec<String>),
    Modify(Vec<String>),
    OptOut(Vec<String>),
    OptIn,
    Help,
    /// The literal `+1` message.
    CheckIn,
}

impl ChatCommand {
    /// Recognise a command, `None` for ordinary chatter.
    ///
    /// Accepts the `/command@botname` form group chats produce.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text == "+1" {
            return Some(Self::CheckIn);
        }

        let mut words = text.split_whitespace();
        let head = words.next()?.strip_prefix('/')?;
        let name = head.split('@').next().unwrap_or(head);
        let args: Vec<String> = words.map(str::to_string).collect();

        match name.to_ascii_lowercase().as_str() {
            "register" => Some(Self::Register(args)),
            "modify" => Some(Self::Modify(args)),
            "optout" => Some(Self::OptOut(args)),
            "optin" => Some(Self::OptIn),
            "help" | "start" => Some(Self::Help),
            _ => None,
        }
    }
}

/// An inbound group message.
#[derive(Debug, Clone, Copy)]
pub struct ChatMessage<'a> {
    pub username: &'a str,
    pub group_id: i64,
    pub text: &'a str,
}

/// Executes chat commands for the allow-listed group.
pub struct CommandHandler {
    store: Arc<GoalStore>,
    allowed_group: i64,
}

impl CommandHandler {
    pub fn new(store: Arc<GoalStore>, allowed_group: i64) -> Self {
        Self {
            store,
            allowed_group,
        }
    }

    /// Handle one message, returning the reply to post (if any).
    ///
    /// # Errors
    /// Returns an error only when the store itself fails.
    pub fn handle(&self, message: ChatMessage<'_>) -> Result<Option<String>> {
        let Some(command) = ChatCommand::parse(message.text) else {
            return Ok(None);
        };

        if message.group_id != self.allowed_group {
            tracing::warn!(
                group_id = message.group_id,
                username = message.username,
                "command from group that is not allow-listed"
            );
            return Ok(Some(NOT_AUTHORIZED.to_string()));
        }

        let reply = match self.dispatch(&command, message) {
            Ok(reply) => reply,
            Err(CoreError::NotRegistered { .. }) => REGISTER_FIRST.to_string(),
            Err(CoreError::Validation(err)) => {
                tracing::debug!(username = message.username, "rejected input: {err}");
                format_hint(&command, &err)
            }
            Err(err) => return Err(err),
        };
        Ok(Some(reply))
    }

    fn dispatch(&self, command: &ChatCommand, message: ChatMessage<'_>) -> Result<String> {
        let ChatMessage {
            username, group_id, ..
        } = message;
        let not_registered = || CoreError::NotRegistered {
            username: username.to_string(),
            group_id,
        };

        match command {
            ChatCommand::Register(args) => {
                let goals = WeeklyGoals::parse_args(args)?;
                self.store.register(username, group_id, &goals)?;
                Ok("Registered your goals successfully!".to_string())
            }
            ChatCommand::Modify(args) => {
                let goals = WeeklyGoals::parse_args(args)?;
                if !self.store.modify_goals(username, group_id, &goals)? {
                    return Err(not_registered());
                }
                Ok("Your goals have been updated successfully!".to_string())
            }
            ChatCommand::CheckIn => {
                if !self.store.exists(username, group_id)? {
                    return Err(not_registered());
                }
                self.store.check_in(username, group_id)?;
                Ok(format!("Task logged! Keep going, @{username}!"))
            }
            ChatCommand::OptOut(args) => {
                let raw = args.first().map(String::as_str).unwrap_or("");
                let days: i64 = raw.parse().map_err(|_| ValidationError::NotAnInteger {
                    value: raw.to_string(),
                })?;
                if !self.store.opt_out(username, group_id, days)? {
                    return Err(not_registered());
                }
                Ok(format!(
                    "Opted out for {days} day(s). We will miss you, get back soon!!"
                ))
            }
            ChatCommand::OptIn => {
                if !self.store.opt_in(username, group_id)? {
                    return Err(not_registered());
                }
                Ok("Hurrayy!!! You are now back in tracking!".to_string())
            }
            ChatCommand::Help => Ok(HELP_TEXT.to_string()),
        }
    }
}

fn format_hint(command: &ChatCommand, err: &ValidationError) -> String {
    match (command, err) {
        (_, ValidationError::WrongGoalCount { .. }) => SEVEN_NUMBERS.to_string(),
        (ChatCommand::Modify(_), _) => "Please use the format: /modify 1 2 3 4 5 6 7".to_string(),
        (ChatCommand::OptOut(_), _) => {
            "Please use the format: /optout <number_of_days>".to_string()
        }
        _ => "Please use the format: /register 1 2 3 4 5 6 7".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUP: i64 = -1001;

    fn handler() -> (Arc<GoalStore>, CommandHandler) {
        let store = Arc::new(GoalStore::open_in_memory().unwrap());
        (Arc::clone(&store), CommandHandler::new(store, GROUP))
    }

    fn say(handler: &CommandHandler, username: &str, text: &str) -> Option<String> {
        handler
            .handle(ChatMessage {
                username,
                group_id: GROUP,
                text,
            })
            .unwrap()
    }

    #[test]
    fn parse_recognises_commands() {
        assert_eq!(ChatCommand::parse(" +1 "), Some(ChatCommand::CheckIn));
        assert_eq!(ChatCommand::parse("/optin@streak_bot"), Some(ChatCommand::OptIn));
        assert_eq!(
            ChatCommand::parse("/optout 3"),
            Some(ChatCommand::OptOut(vec!["3".to_string()]))
        );
        assert_eq!(ChatCommand::parse("+1 done!"), None);
        assert_eq!(ChatCommand::parse("hello"), None);
        assert_eq!(ChatCommand::parse("/unknown"), None);
        assert_eq!(ChatCommand::parse(""), None);
    }

    #[test]
    fn register_then_check_in() {
        let (store, handler) = handler();
        assert_eq!(
            say(&handler, "alice", "/register 1 1 1 1 1 1 1").as_deref(),
            Some("Registered your goals successfully!")
        );
        assert_eq!(
            say(&handler, "alice", "+1").as_deref(),
            Some("Task logged! Keep going, @alice!")
        );
        assert_eq!(store.get("alice", GROUP).unwrap().unwrap().today_tasks, 1);
    }

    #[test]
    fn bad_register_input_gets_format_hints() {
        let (store, handler) = handler();
        assert_eq!(say(&handler, "alice", "/register 1 2").as_deref(), Some(SEVEN_NUMBERS));
        assert_eq!(
            say(&handler, "alice", "/register a b c d e f g").as_deref(),
            Some("Please use the format: /register 1 2 3 4 5 6 7")
        );
        assert!(!store.exists("alice", GROUP).unwrap());
    }

    #[test]
    fn unregistered_users_are_told_to_register() {
        let (_, handler) = handler();
        for text in ["+1", "/modify 1 1 1 1 1 1 1", "/optout 2", "/optin"] {
            assert_eq!(say(&handler, "ghost", text).as_deref(), Some(REGISTER_FIRST));
        }
    }

    #[test]
    fn opt_out_validation() {
        let (store, handler) = handler();
        say(&handler, "bob", "/register 5 5 5 5 5 5 5");
        let hint = Some("Please use the format: /optout <number_of_days>");
        assert_eq!(say(&handler, "bob", "/optout").as_deref(), hint);
        assert_eq!(say(&handler, "bob", "/optout zero").as_deref(), hint);
        assert_eq!(say(&handler, "bob", "/optout 0").as_deref(), hint);
        assert_eq!(
            say(&handler, "bob", "/optout 2").as_deref(),
            Some("Opted out for 2 day(s). We will miss you, get back soon!!")
        );
        assert_eq!(store.get("bob", GROUP).unwrap().unwrap().opt_out_days, 2);
        assert_eq!(
            say(&handler, "bob", "/optin").as_deref(),
            Some("Hurrayy!!! You are now back in tracking!")
        );
    }

    #[test]
    fn check_in_while_opted_out_still_replies() {
        let (store, handler) = handler();
        say(&handler, "bob", "/register 5 5 5 5 5 5 5");
        say(&handler, "bob", "/optout 2");
        assert_eq!(
            say(&handler, "bob", "+1").as_deref(),
            Some("Task logged! Keep going, @bob!")
        );
        assert_eq!(store.get("bob", GROUP).unwrap().unwrap().today_tasks, 0);
    }

    #[test]
    fn other_groups_are_refused() {
        let (store, handler) = handler();
        let reply = handler
            .handle(ChatMessage {
                username: "mallory",
                group_id: 42,
                text: "/register 1 1 1 1 1 1 1",
            })
            .unwrap();
        assert_eq!(reply.as_deref(), Some(NOT_AUTHORIZED));
        assert!(!store.exists("mallory", 42).unwrap());

        let chatter = handler
            .handle(ChatMessage {
                username: "mallory",
                group_id: 42,
                text: "just talking",
            })
            .unwrap();
        assert_eq!(chatter, None);
    }

    #[test]
    fn help_lists_commands() {
        let (_, handler) = handler();
        let reply = say(&handler, "alice", "/help").unwrap();
        assert!(reply.contains("/register"));
        assert!(reply.contains("'+1'"));
    }
}
