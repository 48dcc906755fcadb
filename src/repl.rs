//! Line-oriented front end: meta-command dispatch, statement parsing and
//! validation, and the Execute/print loop. This is deliberately thin
//! glue around the storage engine (spec.md §4.7/§6) — grounded on
//! `examples/original_source/db.c`'s `do_meta_command`/`prepare_statement`
//! command set and message text, wired up with the teacher's
//! `console.rs` output style.

use std::io::{self, BufRead};

use crate::console;
use crate::errors::{Error, UserError};
use crate::storage::{Row, Table, EMAIL_MAX_LEN, ROW_SIZE, USERNAME_MAX_LEN};

enum MetaCommand {
    Exit,
    Help,
    BTree,
    Constants,
    Unrecognized,
}

enum Prepare {
    Insert(Row),
    Select,
    Update,
    Delete,
}

enum Execute {
    Success,
    DuplicateKey,
}

/// Runs the REPL to completion against `table`, reading lines from
/// `input` until `.exit` or EOF. Returns the process exit code.
pub fn run(mut table: Table, input: impl BufRead) -> i32 {
    for line in input.lines() {
        console::print_prompt().ok();

        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('.') {
            match dispatch_meta_command(command) {
                MetaCommand::Exit => {
                    if let Err(e) = table.close() {
                        console::println(&format!("{e}")).ok();
                        return 1;
                    }
                    return 0;
                }
                MetaCommand::Help => {
                    console::println(print_help()).ok();
                }
                MetaCommand::BTree => match table.debug_tree() {
                    Ok(tree) => {
                        console::println("Tree:").ok();
                        console::println(&tree).ok();
                    }
                    Err(e) if e.is_fatal() => {
                        console::println(&format!("{e}")).ok();
                        return 1;
                    }
                    Err(_) => unreachable!("debug_tree has no recoverable error path"),
                },
                MetaCommand::Constants => {
                    console::println(&print_constants()).ok();
                }
                MetaCommand::Unrecognized => {
                    console::println(&format!("Unrecognized command '{line}'")).ok();
                }
            }
            continue;
        }

        match prepare_statement(line) {
            Ok(statement) => match execute_statement(&mut table, statement) {
                Ok(Execute::Success) => {
                    console::println("Executed.").ok();
                }
                Ok(Execute::DuplicateKey) => {
                    console::println(&format!("{}", UserError::DuplicateKey)).ok();
                }
                Err(e) if e.is_fatal() => {
                    console::println(&format!("{e}")).ok();
                    return 1;
                }
                Err(_) => unreachable!("non-fatal errors are Execute variants, not Err"),
            },
            Err(e) => {
                console::println(&format!("{e}")).ok();
            }
        }
    }

    0
}

fn dispatch_meta_command(command: &str) -> MetaCommand {
    match command {
        "exit" => MetaCommand::Exit,
        "help" => MetaCommand::Help,
        "btree" => MetaCommand::BTree,
        "constants" => MetaCommand::Constants,
        _ => MetaCommand::Unrecognized,
    }
}

fn print_help() -> &'static str {
    "Meta commands:\n\
     .exit     flush and close the database\n\
     .help     print this message\n\
     .btree    print the tree structure\n\
     .constants print compile-time layout constants\n\
     \n\
     Statements:\n\
     insert <id> <username> <email>\n\
     select"
}

fn print_constants() -> String {
    format!(
        "Constants:\n\
         ROW_SIZE: {ROW_SIZE}\n\
         USERNAME_MAX_LEN: {USERNAME_MAX_LEN}\n\
         EMAIL_MAX_LEN: {EMAIL_MAX_LEN}"
    )
}

fn prepare_statement(input: &str) -> Result<Prepare, Error> {
    if let Some(rest) = input.strip_prefix("insert") {
        return prepare_insert(rest);
    }
    if input == "select" {
        return Ok(Prepare::Select);
    }
    if input.starts_with("update") {
        return Ok(Prepare::Update);
    }
    if input.starts_with("delete") {
        return Ok(Prepare::Delete);
    }
    Err(UserError::UnrecognizedStatement(input.to_string()).into())
}

fn prepare_insert(rest: &str) -> Result<Prepare, Error> {
    let mut tokens = rest.split_whitespace();
    let (id_str, username, email) = match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(a), Some(b), Some(c)) => (a, b, c),
        _ => return Err(UserError::SyntaxError.into()),
    };

    let id: i64 = id_str.parse().map_err(|_| UserError::SyntaxError)?;
    if id < 0 {
        return Err(UserError::NegativeId.into());
    }
    if username.len() > USERNAME_MAX_LEN || email.len() > EMAIL_MAX_LEN {
        return Err(UserError::StringTooLong.into());
    }

    Ok(Prepare::Insert(Row::new(id as u32, username, email)))
}

fn execute_statement(table: &mut Table, statement: Prepare) -> Result<Execute, Error> {
    match statement {
        Prepare::Insert(row) => match table.insert(row) {
            Ok(()) => Ok(Execute::Success),
            Err(Error::User(UserError::DuplicateKey)) => Ok(Execute::DuplicateKey),
            Err(e) => Err(e),
        },
        Prepare::Select => {
            let rows = table.select_all()?;
            for row in rows {
                console::println(&format!("({}, {}, {})", row.id, row.username, row.email)).ok();
            }
            Ok(Execute::Success)
        }
        // update/delete are accepted but are no-ops (spec.md §6).
        Prepare::Update | Prepare::Delete => Ok(Execute::Success),
    }
}

/// Convenience wrapper reading from real stdin, used by `main`.
pub fn run_stdin(table: Table) -> i32 {
    run(table, io::stdin().lock())
}
