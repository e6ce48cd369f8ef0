use super::*;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["nutrishop-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["nutrishop-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["nutrishop-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_discounts_list() {
    let cli = Cli::try_parse_from(["nutrishop-cli", "discounts", "list"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Discounts {
            command: DiscountsCommands::List
        })
    ));
}

#[test]
fn orders_list_defaults_to_twenty_unfiltered() {
    let cli = Cli::try_parse_from(["nutrishop-cli", "orders", "list"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Orders {
            command: OrdersCommands::List {
                status: None,
                limit: 20
            }
        })
    ));
}

#[test]
fn orders_list_with_status_and_limit() {
    let cli = Cli::try_parse_from([
        "nutrishop-cli",
        "orders",
        "list",
        "--status",
        "shipped",
        "--limit",
        "5",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Orders {
            command: OrdersCommands::List {
                status: Some(ref s),
                limit: 5
            }
        }) if s == "shipped"
    ));
}

#[test]
fn orders_set_status_requires_valid_uuid() {
    let id = uuid::Uuid::new_v4().to_string();
    let cli = Cli::try_parse_from([
        "nutrishop-cli",
        "orders",
        "set-status",
        "--id",
        &id,
        "--status",
        "delivered",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Orders {
            command: OrdersCommands::SetStatus { ref status, .. }
        }) if status == "delivered"
    ));

    let err = Cli::try_parse_from([
        "nutrishop-cli",
        "orders",
        "set-status",
        "--id",
        "not-a-uuid",
        "--status",
        "shipped",
    ]);
    assert!(err.is_err());
}

#[test]
fn order_status_is_normalized_and_checked() {
    assert_eq!(orders::validate_status(" Shipped ").unwrap(), "shipped");
    let err = orders::validate_status("lost").unwrap_err().to_string();
    assert!(err.contains("pending, processing, shipped, delivered, cancelled"));
}
