// Agent Context
// Conversation memory carried between user turns

use crate::model::Message;

/// State the orchestrator may carry across turns.
///
/// With `remember_history` off every turn starts from the system
/// instructions alone.
#[derive(Debug, Clone, Default)]
pub struct AgentContext {
  remember_history: bool,
  history: Vec<Message>,
}

impl AgentContext {
  pub fn new(remember_history: bool) -> Self {
    Self {
      remember_history,
      history: Vec::new(),
    }
  }

  /// Earlier exchanges, oldest first
  pub fn history(&self) -> &[Message] {
    &self.history
  }

  /// Keep a finished exchange when memory is on
  pub fn record(&mut self, utterance: &str, answer: &str) {
    if !self.remember_history {
      return;
    }
    self.history.push(Message::user(utterance));
    self
      .history
      .push(Message::assistant(Some(answer.to_string()), None));
  }
}
