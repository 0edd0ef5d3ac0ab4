mod cli;
mod report;

use anyhow::Result;
use tracing::debug;

use crate::config::AppConfig;
use crate::db::Database;
use crate::session::Session;

/// Command line split into global options and the command itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Invocation {
    pub(crate) user: Option<String>,
    pub(crate) command: Vec<String>,
}

impl Invocation {
    /// `args` excludes the program name. Global options must come before the
    /// command.
    pub(crate) fn parse(args: &[String]) -> Result<Self> {
        let mut user = None;
        let mut rest = args;
        loop {
            match rest.first().map(String::as_str) {
                Some("--user" | "-u") => {
                    let name = rest
                        .get(1)
                        .ok_or_else(|| anyhow::anyhow!("--user requires a name"))?;
                    user = Some(name.clone());
                    rest = &rest[2..];
                }
                Some(arg) if arg.starts_with("--user=") => {
                    user = Some(arg["--user=".len()..].to_string());
                    rest = &rest[1..];
                }
                _ => break,
            }
        }
        Ok(Self {
            user,
            command: rest.to_vec(),
        })
    }
}

pub(crate) fn as_cli(invocation: &Invocation, db: &mut Database, config: &AppConfig) -> Result<()> {
    let Some(command) = invocation.command.first() else {
        cli::print_usage();
        return Ok(());
    };
    let args = &invocation.command[1..];
    debug!(command = %command, "dispatching");

    match command.as_str() {
        "--help" | "-h" | "help" => {
            cli::print_usage();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("expense-tracker {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "user" => cli::cli_user(args, db, active_user(invocation, config)),
        "users" => cli::cli_users(db),
        other => {
            let session = login(invocation, db, config)?;
            match other {
                "account" => cli::cli_account(args, db, &session),
                "accounts" => cli::cli_accounts(db, &session),
                "category" => cli::cli_category(args, db, &session),
                "categories" => cli::cli_categories(db, &session),
                "merchants" => cli::cli_merchants(db, &session),
                "add" => cli::cli_add(args, db, &session),
                "txns" => cli::cli_txns(args, db, &session),
                "delete-txn" => cli::cli_delete_txn(args, db, &session),
                "budget" => cli::cli_budget(args, db, &session),
                "budgets" => cli::cli_budgets(args, db, &session),
                "import" => cli::cli_import(args, db, &session),
                "export" => cli::cli_export(args, db, &session),
                "report" => report::cli_report(args, db, &session),
                "chart" => report::cli_chart(args, db, &session, &config.chart_dir),
                _ => {
                    cli::print_usage();
                    anyhow::bail!("Unknown command: {other}");
                }
            }
        }
    }
}

fn active_user<'a>(invocation: &'a Invocation, config: &'a AppConfig) -> Option<&'a str> {
    invocation
        .user
        .as_deref()
        .or(config.default_user.as_deref())
}

fn login(invocation: &Invocation, db: &Database, config: &AppConfig) -> Result<Session> {
    let name = active_user(invocation, config).ok_or_else(|| {
        anyhow::anyhow!(
            "No user selected. Pass --user <name> or set default_user in {}",
            crate::config::CONFIG_FILE
        )
    })?;
    let session = Session::login(db, name)?;
    debug!(user_id = session.user_id, username = %session.username, "logged in");
    Ok(session)
}
