// File: tests/cli_commands.rs
use chrono::NaiveDate;
use kehilla::cli::{Command, RoleAction, execute, parse_args};
use kehilla::config::Config;
use kehilla::context::TestContext;
use kehilla::model::{ObservanceIndex, RoleTag};
use std::path::PathBuf;
use std::sync::{Arc, Barrier};
use std::thread;

fn args(s: &str) -> Vec<String> {
    s.split_whitespace().map(String::from).collect()
}

fn run(ctx: &TestContext, line: &str) -> Vec<String> {
    let inv = parse_args(&args(line)).unwrap();
    let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    execute(&inv.command, ctx, &Config::default(), today).unwrap()
}

#[test]
fn test_parse_root_and_help() {
    let inv = parse_args(&args("--root /tmp/k roles show rivka")).unwrap();
    assert_eq!(inv.root, Some(PathBuf::from("/tmp/k")));
    assert_eq!(
        inv.command,
        Command::Roles {
            action: RoleAction::Show,
            principal: "rivka".to_string(),
            tags: vec![],
        }
    );

    assert_eq!(parse_args(&args("--help")).unwrap().command, Command::Help);
    assert_eq!(parse_args(&[]).unwrap().command, Command::Help);
    assert!(parse_args(&args("--root")).is_err());
}

#[test]
fn test_parse_rejects_bad_input() {
    assert!(parse_args(&args("next 1945-03-10 2024-05-01 2024-04-01")).is_err());
    assert!(parse_args(&args("next 1945-03-10 2024-05-01")).is_err());
    assert!(parse_args(&args("roles add rivka rabbi")).is_err());
    assert!(parse_args(&args("roles promote rivka admin")).is_err());
    assert!(parse_args(&args("frobnicate")).is_err());
}

#[test]
fn test_next_command() {
    let ctx = TestContext::new();
    assert_eq!(
        run(&ctx, "next 1945-03-10 2024-01-01 2024-12-31"),
        vec!["2024-03-10"]
    );
    assert_eq!(
        run(&ctx, "next 1945-03-10 2024-04-01 2025-03-09"),
        vec!["none"]
    );
}

#[test]
fn test_roles_flow() {
    let ctx = TestContext::new();
    assert_eq!(run(&ctx, "roles show rivka"), vec!["No roles assigned"]);
    assert_eq!(run(&ctx, "roles init rivka"), vec!["Member"]);
    assert_eq!(
        run(&ctx, "roles add rivka teacher parent teacher"),
        vec!["Member, Teacher, Parent"]
    );
    assert_eq!(run(&ctx, "roles check-any rivka admin parent"), vec!["true"]);
    assert_eq!(run(&ctx, "roles check-all rivka admin parent"), vec!["false"]);
    assert_eq!(run(&ctx, "roles remove rivka member"), vec!["Teacher, Parent"]);
    assert_eq!(run(&ctx, "roles set rivka student"), vec!["Student"]);
    assert_eq!(run(&ctx, "roles set rivka"), vec!["No roles assigned"]);
    assert_eq!(run(&ctx, "roles delete rivka"), vec!["Deleted roles of rivka"]);
}

#[test]
fn test_roles_add_requires_a_role() {
    let ctx = TestContext::new();
    let inv = parse_args(&args("roles add rivka")).unwrap();
    let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    assert!(execute(&inv.command, &ctx, &Config::default(), today).is_err());
}

#[test]
fn test_observance_add_and_upcoming() {
    let ctx = TestContext::new();
    let added = run(&ctx, "observance add Sarah yahrzeit 1945-03-10");
    assert!(added[0].starts_with("Added Yahrzeit of Sarah"));
    run(&ctx, "observance add Noa bnai_mitzvah 2019-06-15");

    assert_eq!(run(&ctx, "observance list").len(), 2);

    // Default window: today (2024-03-01) plus the 30 day horizon.
    assert_eq!(
        run(&ctx, "upcoming"),
        vec!["2024-03-10  Yahrzeit of Sarah (79 years)"]
    );
    assert_eq!(run(&ctx, "upcoming 2024-06-01 2024-06-30").len(), 1);
    assert!(run(&ctx, "upcoming 2024-07-01 2024-07-31").is_empty());
}

#[test]
fn test_parse_role_tags() {
    let inv = parse_args(&args("roles check-all rivka admin member")).unwrap();
    match inv.command {
        Command::Roles { action, tags, .. } => {
            assert_eq!(action, RoleAction::CheckAll);
            assert_eq!(tags, vec![RoleTag::Admin, RoleTag::Member]);
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_help_word_is_positional_after_command() {
    assert_eq!(
        parse_args(&args("roles add help admin")).unwrap().command,
        Command::Roles {
            action: RoleAction::Add,
            principal: "help".to_string(),
            tags: vec![RoleTag::Admin],
        }
    );
    assert_eq!(
        parse_args(&args("roles show -h")).unwrap().command,
        Command::Roles {
            action: RoleAction::Show,
            principal: "-h".to_string(),
            tags: vec![],
        }
    );
    match parse_args(&args("observance add help yahrzeit 1945-03-10"))
        .unwrap()
        .command
    {
        Command::ObservanceAdd { name, .. } => assert_eq!(name, "help"),
        other => panic!("unexpected command: {:?}", other),
    }
    assert_eq!(parse_args(&args("help")).unwrap().command, Command::Help);
    assert_eq!(
        parse_args(&args("--root /tmp/k -h")).unwrap().command,
        Command::Help
    );
}

#[test]
fn test_concurrent_observance_adds_are_not_lost() {
    let ctx = Arc::new(TestContext::new());
    let thread_count = 16;
    let barrier = Arc::new(Barrier::new(thread_count));
    let mut handles = vec![];

    for i in 0..thread_count {
        let ctx = Arc::clone(&ctx);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            let inv = parse_args(&args(&format!("observance add P{} yahrzeit 1945-03-10", i)))
                .unwrap();
            let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
            barrier.wait();
            execute(&inv.command, ctx.as_ref(), &Config::default(), today).unwrap();
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(ObservanceIndex::load(ctx.as_ref()).unwrap().len(), thread_count);
}
