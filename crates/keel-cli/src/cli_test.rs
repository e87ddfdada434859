use super::*;
use clap::CommandFactory;

#[test]
fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn test_parse_migrate_to() {
    let cli = Cli::try_parse_from(["keel", "migrate", "--to", "002_users"]).unwrap();
    match cli.command {
        Commands::Migrate(args) => {
            assert_eq!(args.to.as_deref(), Some("002_users"));
            assert!(!args.dry_run);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_parse_global_args_after_subcommand() {
    let cli = Cli::try_parse_from(["keel", "status", "-p", "proj", "--output", "json", "-v"]).unwrap();
    assert!(cli.global.verbose);
    assert_eq!(cli.global.project_dir, PathBuf::from("proj"));
    match cli.command {
        Commands::Status(args) => assert_eq!(args.output, StatusOutput::Json),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_erase_defaults_to_unconfirmed() {
    let cli = Cli::try_parse_from(["keel", "erase"]).unwrap();
    assert!(matches!(cli.command, Commands::Erase(EraseArgs { yes: false })));
}
