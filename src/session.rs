//! Per-session conversation history.
//!
//! Each session keeps a bounded FIFO of completed exchanges (user question +
//! final answer). Intermediate tool turns are never persisted; the window is
//! rendered as plain text and injected into the system instructions of
//! later queries. History is immutable while a query is in flight; a new
//! exchange is folded in only after the query completes.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use uuid::Uuid;

/// One completed question/answer pair.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

/// Session store with a bounded history window per session.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, VecDeque<Exchange>>>,
    max_history: usize,
}

impl SessionManager {
    /// Create a session manager keeping up to `max_history` exchanges per
    /// session.
    pub fn new(max_history: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_history,
        }
    }

    /// Create a new session and return its ID.
    pub fn create_session(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions
            .write()
            .unwrap()
            .insert(id.clone(), VecDeque::new());
        id
    }

    /// Record a completed exchange, evicting the oldest beyond the window.
    /// Unknown session IDs are created on first use.
    pub fn add_exchange(&self, session_id: &str, question: &str, answer: &str) {
        let mut sessions = self.sessions.write().unwrap();
        let window = sessions.entry(session_id.to_string()).or_default();

        window.push_back(Exchange {
            question: question.to_string(),
            answer: answer.to_string(),
        });
        while window.len() > self.max_history {
            window.pop_front();
        }
    }

    /// Render a session's history as plain text, oldest exchange first.
    /// Returns `None` for unknown or empty sessions.
    pub fn history(&self, session_id: &str) -> Option<String> {
        let sessions = self.sessions.read().unwrap();
        let window = sessions.get(session_id)?;

        if window.is_empty() {
            return None;
        }

        Some(
            window
                .iter()
                .map(|e| format!("User: {}\nAssistant: {}", e.question, e.answer))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    /// Drop a session's history.
    pub fn clear(&self, session_id: &str) {
        self.sessions.write().unwrap().remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_rendering() {
        let sessions = SessionManager::new(2);
        let id = sessions.create_session();

        assert!(sessions.history(&id).is_none());

        sessions.add_exchange(&id, "What is testing?", "Verifying software behavior.");

        let history = sessions.history(&id).unwrap();
        assert_eq!(
            history,
            "User: What is testing?\nAssistant: Verifying software behavior."
        );
    }

    #[test]
    fn test_window_evicts_oldest_first() {
        let sessions = SessionManager::new(2);
        let id = sessions.create_session();

        sessions.add_exchange(&id, "q1", "a1");
        sessions.add_exchange(&id, "q2", "a2");
        sessions.add_exchange(&id, "q3", "a3");

        let history = sessions.history(&id).unwrap();
        assert!(!history.contains("q1"));
        assert!(history.contains("q2"));
        assert!(history.contains("q3"));
        // Oldest remaining exchange comes first.
        assert!(history.find("q2").unwrap() < history.find("q3").unwrap());
    }

    #[test]
    fn test_unknown_session_created_on_first_exchange() {
        let sessions = SessionManager::new(2);

        sessions.add_exchange("ad-hoc", "q", "a");
        assert!(sessions.history("ad-hoc").is_some());

        sessions.clear("ad-hoc");
        assert!(sessions.history("ad-hoc").is_none());
    }
}
