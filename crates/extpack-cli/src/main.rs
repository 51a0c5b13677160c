//! extpack CLI - Build browser extension packages from a manifest source
//!
//! Runs a one-shot build by default, or a watching dev session with live
//! reload under `--dev`.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use extpack_cli::commands::{self, CommandOptions};
use extpack_cli::config::{ConfigOverrides, Sourcemap};
use extpack_cli::logging;

/// extpack - Browser extension build orchestrator
#[derive(Parser)]
#[command(name = "extpack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Watch the project, rebuild on change and live-reload the extension
    #[arg(long)]
    dev: bool,

    /// Project root (default: current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Config file relative to the root (default: extpack.config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    outdir: Option<PathBuf>,

    /// Static directory mirrored into the output directory
    #[arg(long)]
    public_dir: Option<PathBuf>,

    /// Manifest source file
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Disable minification
    #[arg(long)]
    no_minify: bool,

    /// Source map mode
    #[arg(long, value_enum)]
    sourcemap: Option<Sourcemap>,

    /// Exit non-zero when the bundler reports failure
    #[arg(long)]
    fail_on_bundler_error: bool,

    /// Bundler command, one argument per flag (e.g. --bundler bun --bundler build.js)
    #[arg(long, num_args = 1, allow_hyphen_values = true)]
    bundler: Vec<String>,
}

impl Cli {
    fn options(self) -> CommandOptions {
        CommandOptions {
            root: self.root,
            config_file: self.config,
            overrides: ConfigOverrides {
                outdir: self.outdir,
                public_dir: self.public_dir,
                manifest: self.manifest,
                no_minify: self.no_minify,
                sourcemap: self.sourcemap,
                bundler: (!self.bundler.is_empty()).then_some(self.bundler),
                fail_on_bundler_error: self.fail_on_bundler_error,
            },
        }
    }
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let dev = cli.dev;
    let options = cli.options();
    let result = if dev {
        commands::dev::run(&options)
    } else {
        commands::build::run(&options)
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_become_overrides() {
        let cli = Cli::parse_from([
            "extpack",
            "--outdir",
            "build",
            "--no-minify",
            "--sourcemap",
            "linked",
            "--bundler",
            "node",
            "--bundler",
            "--experimental",
        ]);
        assert!(!cli.dev);

        let options = cli.options();
        assert_eq!(options.overrides.outdir, Some(PathBuf::from("build")));
        assert!(options.overrides.no_minify);
        assert_eq!(options.overrides.sourcemap, Some(Sourcemap::Linked));
        assert_eq!(
            options.overrides.bundler,
            Some(vec!["node".to_string(), "--experimental".to_string()])
        );
    }

    #[test]
    fn test_no_bundler_flag_keeps_config_value() {
        let cli = Cli::parse_from(["extpack", "--dev"]);
        assert!(cli.dev);
        assert_eq!(cli.options().overrides.bundler, None);
    }
}
