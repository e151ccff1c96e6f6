//! Update the active chat's mood label. Out of scope for the user-memory
//! store proper; normalization and persistence both live on the host side.

use serde::{Deserialize, Serialize};

pub trait MoodHost {
    fn normalize_mood(&self, requested: &str, fallback: &str) -> String;
    fn update_chat_mood(&self, chat_id: &str, mood: &str);
}

pub trait MoodRuntime {
    fn mood(&self) -> &str;
    fn chat_id(&self) -> &str;
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatMoodArgs {
    pub mood: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatMoodResult {
    pub chat_id: String,
    pub mood: String,
}

pub fn handle(args: ChatMoodArgs, runtime: &dyn MoodRuntime, host: &dyn MoodHost) -> ChatMoodResult {
    let requested = args.mood.unwrap_or_default();
    let requested = requested.trim();
    let requested = if requested.is_empty() { runtime.mood().trim() } else { requested };

    let fallback = runtime.mood().trim();
    let fallback = if fallback.is_empty() { "neutral" } else { fallback };

    let chat_id = runtime.chat_id().trim();
    let chat_id = if chat_id.is_empty() { "default" } else { chat_id };

    let mood = host.normalize_mood(requested, fallback);
    host.update_chat_mood(chat_id, &mood);
    ChatMoodResult { chat_id: chat_id.to_string(), mood }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct StubRuntime {
        mood: &'static str,
        chat_id: &'static str,
    }
    impl MoodRuntime for StubRuntime {
        fn mood(&self) -> &str {
            self.mood
        }
        fn chat_id(&self) -> &str {
            self.chat_id
        }
    }

    struct StubHost {
        updated: RefCell<Option<(String, String)>>,
    }
    impl MoodHost for StubHost {
        fn normalize_mood(&self, requested: &str, fallback: &str) -> String {
            if requested.is_empty() { fallback.to_string() } else { requested.to_lowercase() }
        }
        fn update_chat_mood(&self, chat_id: &str, mood: &str) {
            *self.updated.borrow_mut() = Some((chat_id.to_string(), mood.to_string()));
        }
    }

    #[test]
    fn falls_back_to_runtime_mood_when_no_args_mood() {
        let host = StubHost { updated: RefCell::new(None) };
        let result = handle(
            ChatMoodArgs::default(),
            &StubRuntime { mood: "Cheerful", chat_id: "chat-1" },
            &host,
        );
        assert_eq!(result.mood, "cheerful");
        assert_eq!(result.chat_id, "chat-1");
        assert_eq!(host.updated.borrow().as_ref().unwrap().1, "cheerful");
    }

    #[test]
    fn defaults_chat_id_when_missing() {
        let host = StubHost { updated: RefCell::new(None) };
        let result = handle(
            ChatMoodArgs { mood: Some("Grumpy".into()) },
            &StubRuntime { mood: "", chat_id: "" },
            &host,
        );
        assert_eq!(result.chat_id, "default");
        assert_eq!(result.mood, "grumpy");
    }
}
