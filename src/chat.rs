//! Bounded chat history.
//!
//! Entries are evicted oldest-first once `capacity` is reached, and expire on
//! their own after `expiry` seconds plus a short fade.

use serde::Serialize;
use std::collections::VecDeque;

const FADE_SECONDS: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatEntry {
    pub sender: String,
    pub text: String,
    pub posted_at: f64,
    pub fading: bool,
}

#[derive(Debug, Clone)]
pub struct ChatLog {
    entries: VecDeque<ChatEntry>,
    capacity: usize,
    expiry: f64,
}

impl ChatLog {
    pub fn new(capacity: usize, expiry: f32) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            expiry: f64::from(expiry),
        }
    }

    pub fn push(&mut self, sender: impl Into<String>, text: impl Into<String>, now: f64) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(ChatEntry {
            sender: sender.into(),
            text: text.into(),
            posted_at: now,
            fading: false,
        });
    }

    /// Marks entries past `expiry` as fading and drops the ones whose fade
    /// has run out.
    pub fn advance(&mut self, now: f64) {
        let expiry = self.expiry;
        self.entries
            .retain(|e| now - e.posted_at < expiry + FADE_SECONDS);
        for entry in self.entries.iter_mut() {
            entry.fading = now - entry.posted_at >= expiry;
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Display name the chat log uses for a remote sender.
pub fn display_name(id: &str) -> String {
    let tail: String = {
        let chars: Vec<char> = id.chars().collect();
        let start = chars.len().saturating_sub(3);
        chars[start..].iter().collect()
    };
    format!("Player {tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_first() {
        let mut log = ChatLog::new(3, 8.0);
        for i in 0..5 {
            log.push("a", format!("m{i}"), 0.0);
        }
        let texts: Vec<_> = log.entries().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn entries_fade_then_expire() {
        let mut log = ChatLog::new(10, 8.0);
        log.push("a", "hi", 0.0);
        log.advance(7.0);
        assert!(!log.entries().next().unwrap().fading);
        log.advance(8.1);
        assert!(log.entries().next().unwrap().fading);
        log.advance(8.6);
        assert!(log.is_empty());
    }

    #[test]
    fn display_name_uses_id_tail() {
        assert_eq!(display_name("user_123"), "Player 123");
        assert_eq!(display_name("ab"), "Player ab");
    }
}
