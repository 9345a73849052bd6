use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{LionpError, Result};
use crate::ui::Prompter;

#[derive(Debug, Default)]
struct Script {
    selections: VecDeque<usize>,
    inputs: VecDeque<String>,
    confirmations: VecDeque<bool>,
    prompts: Vec<String>,
}

/// Replays canned answers instead of asking anyone.
///
/// Selections and confirmations fall back to the prompt's default once their
/// answers run out; a missing text answer counts as the user cancelling.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    script: Mutex<Script>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer_select(self, index: usize) -> Self {
        self.lock().selections.push_back(index);
        self
    }

    pub fn answer_input(self, text: &str) -> Self {
        self.lock().inputs.push_back(text.to_string());
        self
    }

    pub fn answer_confirm(self, answer: bool) -> Self {
        self.lock().confirmations.push_back(answer);
        self
    }

    /// Every prompt message shown, in order
    pub fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Prompter for ScriptedPrompter {
    fn select(&self, message: &str, items: &[String], default: usize) -> Result<usize> {
        let mut script = self.lock();
        script.prompts.push(message.to_string());
        let index = script.selections.pop_front().unwrap_or(default);
        if index >= items.len() {
            return Err(LionpError::prompt(format!(
                "no choice {} for `{}`",
                index, message
            )));
        }
        Ok(index)
    }

    fn input(&self, message: &str) -> Result<String> {
        let mut script = self.lock();
        script.prompts.push(message.to_string());
        script.inputs.pop_front().ok_or(LionpError::Cancelled)
    }

    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        let mut script = self.lock();
        script.prompts.push(message.to_string());
        Ok(script.confirmations.pop_front().unwrap_or(default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answers_in_order() {
        let prompter = ScriptedPrompter::new()
            .answer_input("first")
            .answer_input("second")
            .answer_confirm(false);

        assert_eq!(prompter.input("a").unwrap(), "first");
        assert_eq!(prompter.input("b").unwrap(), "second");
        assert!(!prompter.confirm("c", true).unwrap());
        assert_eq!(prompter.prompts(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_defaults_when_unscripted() {
        let prompter = ScriptedPrompter::new();
        let items = vec!["x".to_string(), "y".to_string()];
        assert_eq!(prompter.select("pick", &items, 1).unwrap(), 1);
        assert!(prompter.confirm("sure?", true).unwrap());
        assert!(matches!(prompter.input("name"), Err(LionpError::Cancelled)));
    }

    #[test]
    fn test_out_of_range_selection() {
        let prompter = ScriptedPrompter::new().answer_select(5);
        let items = vec!["only".to_string()];
        assert!(prompter.select("pick", &items, 0).is_err());
    }
}
