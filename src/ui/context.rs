//! Terminal detection for choosing between prompts and plain output

use std::io::IsTerminal;

/// Environment variables that mark a CI runner
const CI_MARKERS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "BUILDKITE",
    "JENKINS_URL",
    "TF_BUILD",
];

/// UI context that determines output behavior
#[derive(Debug, Clone)]
pub struct UiContext {
    interactive: bool,
}

impl UiContext {
    /// Detect the current environment
    pub fn detect() -> Self {
        let terminal = std::io::stdout().is_terminal() && std::io::stdin().is_terminal();
        let ci = CI_MARKERS.iter().any(|var| std::env::var_os(var).is_some());
        Self {
            interactive: terminal && !ci,
        }
    }

    /// Create a non-interactive context (for testing or piped use)
    pub fn non_interactive() -> Self {
        Self { interactive: false }
    }

    /// Whether the package browser can prompt the user
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Whether to use styled cliclack output
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }
}
