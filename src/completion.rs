//! # Shell Completion Module
//!
//! Generates completion scripts for the dfmuse command line through clap's
//! completion system.
//!
//! ## Usage
//!
//! ```bash
//! # Generate bash completions
//! dfmuse --completions bash > ~/.local/share/bash-completion/completions/dfmuse
//!
//! # Generate zsh completions
//! dfmuse --completions zsh > ~/.config/zsh/completions/_dfmuse
//! ```

use crate::cli::Shell;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io::{self, Write};

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    write_completions(gen, cmd, &mut io::stdout());
}

/// Same as [`generate_completions`] but into any writer
pub fn write_completions<G: Generator>(gen: G, cmd: &mut Command, out: &mut dyn Write) {
    let name = cmd.get_name().to_string();
    generate(gen, cmd, name, out);
}

/// Convert our Shell enum to clap_complete's Shell enum
pub fn shell_to_completion_shell(shell: Shell) -> CompletionShell {
    match shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::CommandFactory;

    #[test]
    fn test_shell_conversion() {
        assert_eq!(shell_to_completion_shell(Shell::Bash), CompletionShell::Bash);
        assert_eq!(shell_to_completion_shell(Shell::Zsh), CompletionShell::Zsh);
    }

    #[test]
    fn test_bash_script_mentions_flags() {
        let mut cmd = Args::command();
        let mut out = Vec::new();
        write_completions(shell_to_completion_shell(Shell::Bash), &mut cmd, &mut out);

        let script = String::from_utf8(out).expect("Completion script should be UTF-8");
        assert!(script.contains("_dfmuse"));
        assert!(script.contains("--load"));
        assert!(script.contains("--gamelog"));
    }
}
