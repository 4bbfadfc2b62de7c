mod commands;

use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use brew_services::{ExecContext, KegRegistry, Launchctl, Manager, TokioClock};

#[derive(Debug, Parser)]
#[command(name = "brew-services")]
#[command(about = "Manage background services for installed packages with launchd")]
#[command(
    long_about = "Manage background services for installed packages with launchd. \
    Run as root to manage services in /Library/LaunchDaemons (started at boot); \
    otherwise services go to ~/Library/LaunchAgents (started at login)."
)]
struct Args {
    /// Show debug output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List all managed services
    #[command(visible_alias = "ls")]
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Remove stale registrations and unused descriptor files
    #[command(visible_aliases = ["clean", "cl", "rm"])]
    Cleanup,

    /// Stop (if running) and start services
    #[command(visible_aliases = ["relaunch", "reload", "r"])]
    Restart {
        /// Package names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Start services now and register them to launch at login (or boot)
    #[command(visible_aliases = ["launch", "load", "s", "l"])]
    Start {
        /// Package names, optionally followed by a template path or URL
        #[arg(required = true)]
        names: Vec<String>,

        /// Descriptor template to use instead of the package's own
        #[arg(long, short = 'f', value_name = "PATH|URL")]
        template: Option<String>,
    },

    /// Stop services and unregister them
    #[command(visible_aliases = ["unload", "terminate", "term", "t", "u"])]
    Stop {
        /// Package names
        #[arg(required = true)]
        names: Vec<String>,
    },
}

/// Exit status for a parse result that did not produce `Args`.
/// Help output is success; usage errors are 1, not clap's 2.
fn parse_error_status(e: &clap::Error) -> u8 {
    if e.use_stderr() {
        1
    } else {
        0
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(parse_error_status(&e));
        }
    };

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let Some(command) = args.command else {
        let _ = Args::command().print_help();
        return ExitCode::SUCCESS;
    };

    let ctx = match ExecContext::from_env() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let registry = KegRegistry::new(ctx.prefix.clone());
    let manager = Manager::new(ctx, registry, Launchctl::from_env(), TokioClock);

    let result = match command {
        Command::List { json } => commands::list(&manager, json).await,
        Command::Cleanup => commands::cleanup(&manager).await,
        Command::Restart { names } => commands::restart(&manager, &names).await,
        Command::Start { names, template } => commands::start(&manager, names, template).await,
        Command::Stop { names } => commands::stop(&manager, &names).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("brew-services").chain(args.iter().copied()))
    }

    fn names_of(command: Command) -> Vec<String> {
        match command {
            Command::Restart { names } | Command::Start { names, .. } | Command::Stop { names } => names,
            Command::List { .. } | Command::Cleanup => Vec::new(),
        }
    }

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_bare_invocation_has_no_command() {
        let args = parse(&[]).unwrap();
        assert!(args.command.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn test_help_exits_zero() {
        let cases: [&[&str]; 4] = [&["help"], &["--help"], &["-h"], &["start", "--help"]];
        for argv in cases {
            let err = parse(argv).unwrap_err();
            assert_eq!(parse_error_status(&err), 0, "{:?}", argv);
        }
    }

    #[test]
    fn test_usage_errors_exit_one() {
        let cases: [&[&str]; 6] = [
            &["frobnicate"],
            &["list", "widget"],
            &["cleanup", "widget"],
            &["start"],
            &["stop"],
            &["restart"],
        ];
        for argv in cases {
            let err = parse(argv).unwrap_err();
            assert_eq!(parse_error_status(&err), 1, "{:?}", argv);
        }
    }

    #[test]
    fn test_list_aliases() {
        for alias in ["list", "ls"] {
            let args = parse(&[alias]).unwrap();
            assert!(matches!(args.command, Some(Command::List { json: false })));
        }
        let args = parse(&["ls", "--json"]).unwrap();
        assert!(matches!(args.command, Some(Command::List { json: true })));
    }

    #[test]
    fn test_cleanup_aliases() {
        for alias in ["cleanup", "clean", "cl", "rm"] {
            let args = parse(&[alias]).unwrap();
            assert!(matches!(args.command, Some(Command::Cleanup)), "{}", alias);
        }
    }

    #[test]
    fn test_restart_aliases() {
        for alias in ["restart", "relaunch", "reload", "r"] {
            let command = parse(&[alias, "widget"]).unwrap().command.unwrap();
            assert!(matches!(command, Command::Restart { .. }), "{}", alias);
            assert_eq!(names_of(command), vec!["widget"]);
        }
    }

    #[test]
    fn test_start_aliases() {
        for alias in ["start", "launch", "load", "s", "l"] {
            let command = parse(&[alias, "widget", "redis"]).unwrap().command.unwrap();
            assert!(
                matches!(command, Command::Start { template: None, .. }),
                "{}",
                alias
            );
            assert_eq!(names_of(command), vec!["widget", "redis"]);
        }
    }

    #[test]
    fn test_stop_aliases() {
        for alias in ["stop", "unload", "terminate", "term", "t", "u"] {
            let command = parse(&[alias, "widget"]).unwrap().command.unwrap();
            assert!(matches!(command, Command::Stop { .. }), "{}", alias);
            assert_eq!(names_of(command), vec!["widget"]);
        }
    }

    #[test]
    fn test_start_template_flag() {
        let command = parse(&["start", "widget", "-f", "./widget.plist"])
            .unwrap()
            .command
            .unwrap();
        match command {
            Command::Start { names, template } => {
                assert_eq!(names, vec!["widget"]);
                assert_eq!(template.as_deref(), Some("./widget.plist"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_verbose_is_global() {
        let args = parse(&["stop", "widget", "-v"]).unwrap();
        assert!(args.verbose);
    }
}
