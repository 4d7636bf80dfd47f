use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    // Validates the entire command tree: short flag conflicts,
    // duplicate args, and other clap definition errors.
    Cli::command().debug_assert();
}

#[test]
fn test_up_defaults_to_latest() {
    let cli = Cli::try_parse_from(["td", "db", "up"]).unwrap();
    let Commands::Db(db) = cli.command;
    match db.command {
        DbCommands::Up(args) => {
            assert_eq!(args.to, Target::Latest);
            assert_eq!(args.timeout, None);
        }
        other => panic!("expected up, got {other:?}"),
    }
}

#[test]
fn test_up_parses_target_and_timeout() {
    let cli = Cli::try_parse_from(["td", "db", "up", "--to", "1748577600", "--timeout", "5"])
        .unwrap();
    let Commands::Db(db) = cli.command;
    match db.command {
        DbCommands::Up(args) => {
            assert_eq!(args.to, Target::Version(1748577600));
            assert_eq!(args.timeout, Some(5));
        }
        other => panic!("expected up, got {other:?}"),
    }
}

#[test]
fn test_up_rejects_bad_target() {
    let err = Cli::try_parse_from(["td", "db", "up", "--to", "soon"]).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["td", "db", "status", "-o", "json", "-v", "-d", ":memory:"])
        .unwrap();
    assert!(cli.global.verbose);
    assert_eq!(cli.global.database.as_deref(), Some(":memory:"));
    let Commands::Db(db) = cli.command;
    assert!(matches!(
        db.command,
        DbCommands::Status(StatusArgs {
            output: StatusOutput::Json
        })
    ));
}

#[test]
fn test_load_baseline_flag() {
    let cli = Cli::try_parse_from(["td", "db", "load", "-f", "snap.sql", "--baseline"]).unwrap();
    let Commands::Db(db) = cli.command;
    match db.command {
        DbCommands::Load(args) => {
            assert_eq!(args.file.as_deref(), Some("snap.sql"));
            assert!(args.baseline);
        }
        other => panic!("expected load, got {other:?}"),
    }
}
