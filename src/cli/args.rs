//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// kiln static site build pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Project root containing `src/` (default: current directory)
    #[arg(short, long, global = true, default_value = ".", value_hint = clap::ValueHint::DirPath)]
    pub root: PathBuf,

    /// Config file path, relative to the project root (optional)
    #[arg(short = 'C', long, global = true, default_value = "kiln.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands (default: build)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Clean, build everything in parallel, then serve and watch
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        serve: ServeArgs,
    },

    /// Remove build output (keeps optimized images)
    Clean,

    /// Compile templates into `dist/`
    Pug,

    /// Compile stylesheets into `dist/css/main.min.css`
    Styles,

    /// Bundle scripts into `dist/js/main.min.js`
    Scripts,

    /// Optimize changed images into `dist/img/`
    Img,

    /// Serve `dist/` with live reload and rebuild on change
    #[command(visible_alias = "w")]
    Watch {
        #[command(flatten)]
        serve: ServeArgs,
    },
}

/// Dev server overrides shared by `build` and `watch`
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long)]
    pub interface: Option<std::net::IpAddr>,

    /// Port number to listen on
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl Cli {
    /// The subcommand to run; a bare `kiln` runs `build`.
    pub fn selected_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Build {
            serve: ServeArgs::default(),
        })
    }

    /// Serve overrides of the selected command, if it serves at all.
    pub fn serve_args(&self) -> Option<ServeArgs> {
        match self.selected_command() {
            Commands::Build { serve } | Commands::Watch { serve } => Some(serve),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_build() {
        let cli = Cli::parse_from(["kiln"]);
        assert!(matches!(cli.selected_command(), Commands::Build { .. }));
        assert!(cli.serve_args().is_some());
    }

    #[test]
    fn test_single_task_commands() {
        for (arg, expected) in [
            ("clean", "Clean"),
            ("pug", "Pug"),
            ("styles", "Styles"),
            ("scripts", "Scripts"),
            ("img", "Img"),
        ] {
            let cli = Cli::parse_from(["kiln", arg]);
            assert_eq!(format!("{:?}", cli.selected_command()), expected);
            assert!(cli.serve_args().is_none());
        }
    }

    #[test]
    fn test_watch_port_override() {
        let cli = Cli::parse_from(["kiln", "watch", "--port", "8080", "--root", "site"]);
        assert_eq!(cli.serve_args().unwrap().port, Some(8080));
        assert_eq!(cli.root, PathBuf::from("site"));
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
