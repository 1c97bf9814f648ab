//! Interactive secret prompts.

use console::{style, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::Password;
use indicatif::ProgressBar;
use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use crate::steps::SecretPrompt;

/// The spinner currently on screen, if any.
///
/// Prompts suspend it so the question is not drawn over.
pub type ActiveBar = Rc<RefCell<Option<ProgressBar>>>;

/// Dialoguer theme without the default yellow `?` prefix.
fn prompt_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("".to_string()),
        ..ColorfulTheme::default()
    }
}

/// Asks for secrets on the terminal, typed twice and never echoed.
pub struct TerminalPrompt {
    term: Term,
    active: ActiveBar,
}

impl TerminalPrompt {
    /// Prompt on stderr, suspending `active` while asking.
    pub fn new(active: ActiveBar) -> Self {
        Self {
            term: Term::stderr(),
            active,
        }
    }
}

impl SecretPrompt for TerminalPrompt {
    fn read_secret(&mut self, question: &str) -> io::Result<Option<String>> {
        if !self.term.is_term() {
            return Ok(None);
        }

        let ask = || {
            Password::with_theme(&prompt_theme())
                .with_prompt(question)
                .with_confirmation("Repeat", "Entries do not match")
                .interact_on(&self.term)
        };

        let answer = match self.active.borrow().as_ref() {
            Some(bar) => bar.suspend(ask),
            None => ask(),
        };
        answer.map(Some).map_err(io::Error::from)
    }
}
