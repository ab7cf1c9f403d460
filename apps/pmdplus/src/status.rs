//! Three-state status indicator.
//!
//! Visibility is independent of state: `show`/`hide` (or
//! `update_for_language`) control it, while `thinking`/`errors`/`ok` only
//! change the text.

use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub const APP_NAME: &str = "PMD+";
/// Command bound to the indicator; opens the problems view.
pub const DEFAULT_COMMAND: &str = "workbench.actions.view.problems";
/// Content types the indicator is shown for.
pub const SUPPORTED_LANGUAGES: [&str; 3] = ["apex", "visualforce", "html"];

const THINKING_ICON: &str = "$(sync~spin)";
const OK_ICON: &str = "$(check)";
const ERROR_ICON: &str = "$(alert)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Ok,
    Running,
    Error,
}

impl StatusState {
    pub fn text(self) -> String {
        match self {
            StatusState::Ok => format!("{OK_ICON} {APP_NAME} is OK."),
            StatusState::Running => format!("{THINKING_ICON} {APP_NAME} is thinking..."),
            StatusState::Error => format!("{ERROR_ICON} {APP_NAME} found error(s)."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub state: StatusState,
    pub visible: bool,
}

#[derive(Debug)]
/// Status shared between the orchestrator and focus events.
pub struct StatusIndicator {
    inner: Mutex<StatusSnapshot>,
}

impl StatusIndicator {
    pub fn new(visible: bool) -> Self {
        StatusIndicator {
            inner: Mutex::new(StatusSnapshot {
                state: StatusState::Ok,
                visible,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StatusSnapshot> {
        // A poisoned lock still holds a usable snapshot
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        *self.lock()
    }

    pub fn state(&self) -> StatusState {
        self.lock().state
    }

    pub fn is_visible(&self) -> bool {
        self.lock().visible
    }

    pub fn text(&self) -> String {
        self.state().text()
    }

    pub fn command(&self) -> &'static str {
        DEFAULT_COMMAND
    }

    /// Show the indicator; resets the text to OK when it was hidden.
    pub fn show(&self) {
        let mut s = self.lock();
        if s.visible {
            return;
        }
        s.state = StatusState::Ok;
        s.visible = true;
    }

    pub fn hide(&self) {
        let mut s = self.lock();
        if !s.visible {
            return;
        }
        s.visible = false;
    }

    /// Show for supported analysis languages, hide otherwise.
    pub fn update_for_language(&self, language: Option<&str>) {
        match language {
            Some(l) if SUPPORTED_LANGUAGES.contains(&l) => self.show(),
            _ => self.hide(),
        }
    }

    pub fn thinking(&self) {
        self.lock().state = StatusState::Running;
    }

    pub fn errors(&self) {
        self.lock().state = StatusState::Error;
    }

    pub fn ok(&self) {
        self.lock().state = StatusState::Ok;
    }
}

impl Default for StatusIndicator {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Content type for a source path, by extension.
pub fn language_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "cls" | "trigger" => Some("apex"),
        "page" | "component" => Some("visualforce"),
        "html" => Some("html"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_methods_do_not_touch_visibility() {
        let status = StatusIndicator::new(false);
        status.thinking();
        assert_eq!(status.state(), StatusState::Running);
        assert!(!status.is_visible());
        status.errors();
        assert_eq!(status.text(), "$(alert) PMD+ found error(s).");
        assert!(!status.is_visible());
        status.ok();
        assert_eq!(status.text(), "$(check) PMD+ is OK.");
    }

    #[test]
    fn test_show_hide_idempotent() {
        let status = StatusIndicator::new(true);
        status.errors();
        // Already visible: no reset of state
        status.show();
        assert_eq!(status.state(), StatusState::Error);
        status.hide();
        status.hide();
        assert!(!status.is_visible());
        status.show();
        assert!(status.is_visible());
        assert_eq!(status.state(), StatusState::Ok);
    }

    #[test]
    fn test_visibility_follows_language() {
        let status = StatusIndicator::default();
        status.update_for_language(language_for_path(Path::new("src/Foo.cls")));
        assert!(status.is_visible());
        status.update_for_language(language_for_path(Path::new("README.md")));
        assert!(!status.is_visible());
        status.update_for_language(language_for_path(Path::new("pages/Home.page")));
        assert!(status.is_visible());
        status.update_for_language(None);
        assert!(!status.is_visible());
    }

    #[test]
    fn test_running_text_and_command() {
        assert_eq!(StatusState::Running.text(), "$(sync~spin) PMD+ is thinking...");
        assert_eq!(StatusIndicator::new(true).command(), DEFAULT_COMMAND);
    }
}
