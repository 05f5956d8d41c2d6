// File: ./src/cli.rs
//! Command-line parsing, dispatch and help text shared by the binary.

use crate::config::Config;
use crate::context::AppContext;
use crate::model::{
    AnchorDate, Observance, ObservanceIndex, ObservanceKind, OccurrenceCalculator, QueryWindow,
    RoleTag, parse_iso_date,
};
use crate::storage::{LocalRoleStore, PrincipalRoles};
use anyhow::{Result, bail};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleAction {
    Show,
    Init,
    Add,
    Remove,
    Set,
    CheckAny,
    CheckAll,
    Delete,
}

impl FromStr for RoleAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "show" => Ok(RoleAction::Show),
            "init" => Ok(RoleAction::Init),
            "add" => Ok(RoleAction::Add),
            "remove" => Ok(RoleAction::Remove),
            "set" => Ok(RoleAction::Set),
            "check-any" => Ok(RoleAction::CheckAny),
            "check-all" => Ok(RoleAction::CheckAll),
            "delete" => Ok(RoleAction::Delete),
            other => bail!("Unknown roles action: '{}'", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Next {
        anchor: AnchorDate,
        window: QueryWindow,
    },
    Upcoming {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
    ObservanceAdd {
        name: String,
        kind: ObservanceKind,
        anchor: AnchorDate,
    },
    ObservanceList,
    Roles {
        action: RoleAction,
        principal: String,
        tags: Vec<RoleTag>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub root: Option<PathBuf>,
    pub command: Command,
}

/// Parses arguments without the program name.
pub fn parse_args(args: &[String]) -> Result<Invocation> {
    let mut root = None;

    // Options are only recognised before the command word.
    let mut i = 0;
    while let Some(arg) = args.get(i) {
        match arg.as_str() {
            "-r" | "--root" => {
                let Some(path) = args.get(i + 1) else {
                    bail!("--root requires a path");
                };
                root = Some(PathBuf::from(path));
                i += 2;
            }
            "-h" | "--help" => {
                return Ok(Invocation {
                    root,
                    command: Command::Help,
                });
            }
            _ => break,
        }
    }
    let rest: Vec<&str> = args[i..].iter().map(String::as_str).collect();

    let command = match rest.as_slice() {
        [] | ["help"] => Command::Help,
        ["next", anchor, start, end] => Command::Next {
            anchor: anchor.parse()?,
            window: QueryWindow::parse(start, end)?,
        },
        ["next", ..] => bail!("Usage: next <anchor> <start> <end>"),
        ["upcoming"] => Command::Upcoming {
            start: None,
            end: None,
        },
        ["upcoming", start] => Command::Upcoming {
            start: Some(parse_iso_date(start)?),
            end: None,
        },
        ["upcoming", start, end] => Command::Upcoming {
            start: Some(parse_iso_date(start)?),
            end: Some(parse_iso_date(end)?),
        },
        ["observance", "add", name, kind, anchor] => Command::ObservanceAdd {
            name: name.to_string(),
            kind: kind.parse()?,
            anchor: anchor.parse()?,
        },
        ["observance", "list"] => Command::ObservanceList,
        ["roles", action, principal, tags @ ..] => {
            let tags = tags
                .iter()
                .map(|t| RoleTag::from_str(t))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Command::Roles {
                action: action.parse()?,
                principal: principal.to_string(),
                tags,
            }
        }
        other => bail!("Unknown command: '{}'", other.join(" ")),
    };

    Ok(Invocation { root, command })
}

/// Runs a command and returns the lines to print.
pub fn execute(
    command: &Command,
    ctx: &dyn AppContext,
    config: &Config,
    today: NaiveDate,
) -> Result<Vec<String>> {
    let calculator = OccurrenceCalculator::new(config.leap_day_policy);

    match command {
        Command::Help => Ok(help_lines("kehilla")),
        Command::Next { anchor, window } => {
            let line = match calculator.next_occurrence(*anchor, window) {
                Some(occurrence) => occurrence.to_iso_string(),
                None => "none".to_string(),
            };
            Ok(vec![line])
        }
        Command::Upcoming { start, end } => {
            let start = start.unwrap_or(today);
            let window = match end {
                Some(end) => QueryWindow::new(start, *end)?,
                None => QueryWindow::days_from(start, config.reminder_horizon_days)?,
            };
            let index = ObservanceIndex::load(ctx)?;
            let lines: Vec<String> = index
                .upcoming(&window, &calculator)
                .iter()
                .map(|u| u.to_string())
                .collect();
            log::debug!("{} of {} observances fall in {}", lines.len(), index.len(), window);
            Ok(lines)
        }
        Command::ObservanceAdd { name, kind, anchor } => {
            let observance = Observance::new(name, *kind, *anchor);
            let line = format!("Added {} of {} ({})", kind, observance.name, observance.id);
            ObservanceIndex::modify(ctx, |index| index.add(observance))?;
            Ok(vec![line])
        }
        Command::ObservanceList => {
            let index = ObservanceIndex::load(ctx)?;
            Ok(index
                .observances()
                .iter()
                .map(|o| format!("{}  {}  {} ({})", o.anchor, o.kind, o.name, o.id))
                .collect())
        }
        Command::Roles {
            action,
            principal,
            tags,
        } => run_roles(*action, principal, tags, ctx, config),
    }
}

fn run_roles(
    action: RoleAction,
    principal: &str,
    tags: &[RoleTag],
    ctx: &dyn AppContext,
    config: &Config,
) -> Result<Vec<String>> {
    let store = LocalRoleStore::new(ctx)?;
    let mut roles = PrincipalRoles::load(&store, principal)?;

    let needs_tags = matches!(
        action,
        RoleAction::Add | RoleAction::Remove | RoleAction::CheckAny | RoleAction::CheckAll
    );
    if needs_tags && tags.is_empty() {
        bail!("At least one role is required");
    }

    let line = match action {
        RoleAction::Show => roles.labels(),
        RoleAction::Init => {
            roles.set_roles(config.default_roles.iter().copied())?;
            roles.labels()
        }
        RoleAction::Add => {
            for tag in tags {
                roles.add_role(*tag)?;
            }
            roles.labels()
        }
        RoleAction::Remove => {
            for tag in tags {
                roles.remove_role(*tag)?;
            }
            roles.labels()
        }
        RoleAction::Set => {
            roles.set_roles(tags.iter().copied())?;
            roles.labels()
        }
        RoleAction::CheckAny => roles.has_any_role(tags).to_string(),
        RoleAction::CheckAll => roles.has_all_roles(tags).to_string(),
        RoleAction::Delete => {
            roles.destroy()?;
            format!("Deleted roles of {}", principal)
        }
    };
    Ok(vec![line])
}

pub fn help_lines(binary_name: &str) -> Vec<String> {
    vec![
        format!(
            "Kehilla v{} - observance dates and member roles",
            env!("CARGO_PKG_VERSION")
        ),
        String::new(),
        "USAGE:".to_string(),
        format!("    {} [--root <path>] <command>", binary_name),
        String::new(),
        "COMMANDS:".to_string(),
        "    next <anchor> <start> <end>            Anchor's month/day inside [start, end], or 'none'"
            .to_string(),
        "    upcoming [<start> [<end>]]             Observances in the window (default: today + horizon)"
            .to_string(),
        "    observance add <name> <kind> <anchor>  Record yahrzeit|anniversary|bnai_mitzvah|birthday"
            .to_string(),
        "    observance list                        List recorded observances".to_string(),
        "    roles show <principal>                 Print role labels".to_string(),
        "    roles init <principal>                 Apply the configured default roles".to_string(),
        "    roles add|remove <principal> <role>..  Grant or revoke roles".to_string(),
        "    roles set <principal> [<role>..]       Replace all roles (none clears)".to_string(),
        "    roles check-any|check-all <principal> <role>..".to_string(),
        "    roles delete <principal>               Drop the principal's stored roles".to_string(),
        String::new(),
        "    Dates are YYYY-MM-DD. Roles: admin, member, teacher, parent, student.".to_string(),
        String::new(),
        "OPTIONS:".to_string(),
        "    -r, --root <path>     Use a different directory for config and data.".to_string(),
        "    -h, --help            Show this help message.".to_string(),
    ]
}

pub fn print_help(binary_name: &str) {
    for line in help_lines(binary_name) {
        println!("{}", line);
    }
}
