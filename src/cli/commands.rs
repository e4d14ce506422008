//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - query: answer one question about the loaded binary
//! - interactive: read questions from a prompt until exit
//! - health: check the model backend and the GhidraMCP endpoints
//! - tools: list the tool catalogue

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ghidra-bridge - Drive Ghidra analysis with a local language model
#[derive(Parser, Debug)]
#[command(name = "ghidra-bridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Ollama server URL
    #[arg(long, global = true, value_name = "URL")]
    pub ollama_url: Option<String>,

    /// Primary GhidraMCP URL
    #[arg(long, global = true, value_name = "URL")]
    pub ghidra_url: Option<String>,

    /// Model used by every phase without an override
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Answer tool calls from canned data instead of Ghidra
    #[arg(long, global = true)]
    pub mock: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single query
    Query {
        /// Query text; read from stdin when omitted
        text: Option<String>,

        /// Print the full result, transcript included, as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive session (the default)
    Interactive,

    /// Check the model backend and tool endpoints
    Health,

    /// List the available tools
    Tools,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_no_args() {
        // No subcommand means interactive mode
        let cli = Cli::try_parse_from(["ghidra-bridge"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(!cli.mock);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::try_parse_from(["ghidra-bridge", "-v"]).unwrap();
        assert!(cli.is_verbose());
    }

    #[test]
    fn test_cli_config_option() {
        let cli = Cli::try_parse_from(["ghidra-bridge", "-c", "/path/to/ghidra-bridge.yml"]).unwrap();
        assert_eq!(cli.config.as_ref(), Some(&PathBuf::from("/path/to/ghidra-bridge.yml")));
    }

    #[test]
    fn test_query_with_text() {
        let cli = Cli::try_parse_from(["ghidra-bridge", "query", "What does main do?"]).unwrap();
        match cli.command {
            Some(Commands::Query { text, json }) => {
                assert_eq!(text.as_deref(), Some("What does main do?"));
                assert!(!json);
            }
            _ => panic!("Expected query command"),
        }
    }

    #[test]
    fn test_query_from_stdin_as_json() {
        let cli = Cli::try_parse_from(["ghidra-bridge", "query", "--json"]).unwrap();
        match cli.command {
            Some(Commands::Query { text, json }) => {
                assert!(text.is_none());
                assert!(json);
            }
            _ => panic!("Expected query command"),
        }
    }

    #[test]
    fn test_global_overrides_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ghidra-bridge",
            "health",
            "--mock",
            "--ollama-url",
            "http://gpu:11434",
            "--ghidra-url",
            "http://win:8080",
            "--model",
            "qwen2.5-coder",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Commands::Health)));
        assert!(cli.mock);
        assert_eq!(cli.ollama_url.as_deref(), Some("http://gpu:11434"));
        assert_eq!(cli.ghidra_url.as_deref(), Some("http://win:8080"));
        assert_eq!(cli.model.as_deref(), Some("qwen2.5-coder"));
    }

    #[test]
    fn test_tools_and_interactive() {
        let cli = Cli::try_parse_from(["ghidra-bridge", "tools"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Tools)));
        let cli = Cli::try_parse_from(["ghidra-bridge", "interactive"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Interactive)));
    }

    #[test]
    fn test_invalid_subcommand() {
        assert!(Cli::try_parse_from(["ghidra-bridge", "daemon"]).is_err());
    }

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }
}
