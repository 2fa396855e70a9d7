//! # Feature: Chat Engagement
//!
//! Keyword-driven companionship chat. Replies come from fixed per-language
//! tables; the first keyword found in the message wins, otherwise a default
//! reply is picked at random. Spoken replies are rate limited by a short
//! cooldown so a fast typist does not get every answer read aloud.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Hindi tables, injectable randomness
//! - 1.0.0: English keyword chat

use crate::core::{Clock, Gender, Language, RandomSource};
use crate::features::notifications::{AnnouncementRequest, NotificationDispatcher, Priority};
use crate::store::ActivityLog;
use chrono::{Duration, NaiveDateTime};
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const EMPTY_MESSAGE_REPLY: &str = "Please enter a message.";
pub const COOLDOWN_SUFFIX: &str = " (Audio delayed due to cooldown)";

const EN_KEYWORDS: &[(&str, &str)] = &[
    ("happy", "I’m glad you’re feeling happy! What made your day special?"),
    ("good", "That’s great to hear! Any plans for today?"),
    ("family", "Family is so important. Who’s your favorite person to spend time with?"),
    ("tired", "I’m sorry you’re tired. Would you like a tip to relax?"),
    ("birthday", "What a surprise! Did you celebrate with cake?"),
    ("friends", "Your friends sound amazing! What do you love most about them?"),
    ("summer", "Summer sounds wonderful! What’s your favorite summer activity?"),
    ("enjoying", "I’m happy you’re enjoying yourself! What else are you doing?"),
    ("fun", "That sounds fun! What other activities do you enjoy?"),
    ("great", "Great to know! What’s making your day great?"),
];

const EN_DEFAULTS: &[&str] = &[
    "That’s interesting! Tell me more about what you enjoy related to that.",
    "I’d love to hear more about that topic. What else can you share?",
    "That sounds lovely! Can you tell me more about your experience?",
];

const HI_KEYWORDS: &[(&str, &str)] = &[
    ("खुश", "मुझे खुशी है कि आप खुश हैं! आपके दिन को खास क्या बनाया?"),
    ("अच्छा", "यह सुनकर अच्छा लगा! आज आपके कोई प्लान हैं?"),
    ("परिवार", "परिवार बहुत महत्वपूर्ण है। आपका पसंदीदा व्यक्ति कौन है?"),
    ("थका", "मुझे दुख है कि आप थके हैं। क्या आपको आराम की सलाह चाहिए?"),
    ("जन्मदिन", "क्या आश्चर्यजनक पल! क्या आपने केक के साथ जश्न मनाया?"),
    ("दोस्त", "आपके दोस्त शानदार लगते हैं! आप उन्हें सबसे ज्यादा क्या पसंद करते हैं?"),
    ("गर्मी", "गर्मी अद्भुत लगती है! आपका पसंदीदा गर्मी का काम क्या है?"),
    ("आनंद", "मुझे खुशी है कि आप आनंद ले रहे हैं! और क्या कर रहे हैं?"),
    ("मज़ा", "यह मज़ेदार लगता है! आप और कौन सी गतिविधियाँ पसंद करते हैं?"),
    ("शानदार", "शानदार जानकर अच्छा लगा! आपका दिन शानदार क्यों है?"),
];

const HI_DEFAULTS: &[&str] = &[
    "यह रोचक है! उससे संबंधित और बताएं।",
    "मुझे उस विषय पर और सुनना अच्छा लगेगा। और क्या बता सकते हैं?",
    "यह प्यारा लगता है! अपने अनुभव के बारे में और बताएं।",
];

fn keywords(language: Language) -> &'static [(&'static str, &'static str)] {
    match language {
        Language::English => EN_KEYWORDS,
        Language::Hindi => HI_KEYWORDS,
    }
}

fn defaults(language: Language) -> &'static [&'static str] {
    match language {
        Language::English => EN_DEFAULTS,
        Language::Hindi => HI_DEFAULTS,
    }
}

pub fn greeting(language: Language, gender: Gender) -> &'static str {
    match (language, gender) {
        (Language::English, Gender::Male) => "Welcome, Grandpa!",
        (Language::English, Gender::Female) => "Welcome, Grandma!",
        (Language::Hindi, Gender::Male) => "नमस्ते बाबाजी!",
        (Language::Hindi, Gender::Female) => "नमस्ते अम्माजी!",
    }
}

/// Reply for the first keyword contained in `message`, if any
pub fn keyword_reply(message: &str, language: Language) -> Option<&'static str> {
    let lowered = message.to_lowercase();
    keywords(language)
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, reply)| *reply)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub message: String,
}

impl ChatMessage {
    fn system(message: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            message: message.into(),
        }
    }

    fn user(message: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            message: message.into(),
        }
    }
}

#[derive(Default)]
struct ChatSession {
    history: Vec<ChatMessage>,
    last_audio: Option<NaiveDateTime>,
}

pub struct ChatEngagement {
    session: Mutex<ChatSession>,
    random: Mutex<Box<dyn RandomSource>>,
    dispatcher: Arc<NotificationDispatcher>,
    activity_log: ActivityLog,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
}

impl ChatEngagement {
    pub fn new(
        dispatcher: Arc<NotificationDispatcher>,
        activity_log: ActivityLog,
        clock: Arc<dyn Clock>,
        random: Box<dyn RandomSource>,
        cooldown: Duration,
    ) -> Self {
        Self {
            session: Mutex::new(ChatSession::default()),
            random: Mutex::new(random),
            dispatcher,
            activity_log,
            clock,
            cooldown,
        }
    }

    fn session(&self) -> MutexGuard<'_, ChatSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset the conversation and greet the person
    pub fn start_chat(&self, language: Language, gender: Gender) -> Vec<ChatMessage> {
        let greeting = greeting(language, gender);
        let history = {
            let mut session = self.session();
            session.history = vec![ChatMessage::system(greeting)];
            session.history.clone()
        };

        self.activity_log
            .record(format!("Chat started in {language} for {gender}: {greeting}"));
        self.dispatcher
            .announce(AnnouncementRequest::new(greeting, language, Priority::Medium));
        history
    }

    /// Answer one user message and return the updated history
    pub fn respond(&self, message: &str, language: Language) -> Vec<ChatMessage> {
        let message = message.trim();
        if message.is_empty() {
            return vec![ChatMessage::system(EMPTY_MESSAGE_REPLY)];
        }

        let reply = match keyword_reply(message, language) {
            Some(reply) => reply,
            None => {
                let options = defaults(language);
                let index = self
                    .random
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .pick(options.len());
                options[index]
            }
        };

        let now = self.clock.now();
        let (speak, history) = {
            let mut session = self.session();
            session.history.push(ChatMessage::user(message));

            let speak = session
                .last_audio
                .map_or(true, |last| now - last >= self.cooldown);
            if speak {
                session.history.push(ChatMessage::system(reply));
                session.last_audio = Some(now);
            } else {
                session
                    .history
                    .push(ChatMessage::system(format!("{reply}{COOLDOWN_SUFFIX}")));
            }
            (speak, session.history.clone())
        };

        self.activity_log.record(format!("User: {message}"));
        if speak {
            self.dispatcher
                .announce(AnnouncementRequest::new(reply, language, Priority::Low));
        } else {
            debug!("Audio delayed for: {reply}");
        }
        self.activity_log.record(reply);
        history
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.session().history.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FixedRandom, ManualClock};
    use crate::features::notifications::SilentRenderer;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn engagement(random: f64) -> (ChatEngagement, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        ));
        let log = ActivityLog::new(store, clock.clone(), 50);
        let dispatcher = Arc::new(NotificationDispatcher::new(
            Arc::new(SilentRenderer),
            log.clone(),
            clock.clone(),
        ));
        (
            ChatEngagement::new(
                dispatcher,
                log,
                clock.clone(),
                Box::new(FixedRandom(random)),
                Duration::seconds(2),
            ),
            clock,
        )
    }

    #[test]
    fn test_first_keyword_in_table_order_wins() {
        // "good" precedes "family" in the table even though "family" comes first in the text
        assert_eq!(
            keyword_reply("My FAMILY had a good time", Language::English),
            Some("That’s great to hear! Any plans for today?")
        );
        assert_eq!(
            keyword_reply("मैं आज बहुत खुश हूँ", Language::Hindi),
            Some("मुझे खुशी है कि आप खुश हैं! आपके दिन को खास क्या बनाया?")
        );
        assert_eq!(keyword_reply("the weather", Language::English), None);
    }

    #[test]
    fn test_greetings() {
        assert_eq!(greeting(Language::English, Gender::Female), "Welcome, Grandma!");
        assert_eq!(greeting(Language::Hindi, Gender::Male), "नमस्ते बाबाजी!");
    }

    #[tokio::test]
    async fn test_start_chat_resets_history() {
        let (chat, _) = engagement(0.0);
        chat.start_chat(Language::English, Gender::Male);
        chat.respond("I feel happy", Language::English);

        let history = chat.start_chat(Language::English, Gender::Female);
        assert_eq!(history, vec![ChatMessage::system("Welcome, Grandma!")]);
    }

    #[tokio::test]
    async fn test_default_reply_uses_random_source() {
        let (chat, _) = engagement(0.99);
        let history = chat.respond("the weather", Language::English);
        assert_eq!(history.last().unwrap().message, EN_DEFAULTS[2]);
    }

    #[tokio::test]
    async fn test_cooldown_marks_reply() {
        let (chat, clock) = engagement(0.0);

        let history = chat.respond("I feel happy", Language::English);
        assert_eq!(
            history.last().unwrap().message,
            "I’m glad you’re feeling happy! What made your day special?"
        );

        clock.advance(Duration::seconds(1));
        let history = chat.respond("so tired", Language::English);
        assert_eq!(
            history.last().unwrap().message,
            "I’m sorry you’re tired. Would you like a tip to relax? (Audio delayed due to cooldown)"
        );

        clock.advance(Duration::seconds(2));
        let history = chat.respond("birthday today", Language::English);
        assert!(!history.last().unwrap().message.ends_with(COOLDOWN_SUFFIX));
        assert_eq!(history.len(), 6);
    }

    #[tokio::test]
    async fn test_empty_message() {
        let (chat, _) = engagement(0.0);
        assert_eq!(
            chat.respond("   ", Language::English),
            vec![ChatMessage::system(EMPTY_MESSAGE_REPLY)]
        );
        assert!(chat.history().is_empty());
    }
}
