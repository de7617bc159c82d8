use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

use takebin::catalog_store::EntityKind;
use takebin::cli_style::{
    flush, get_prompt, get_styles, print_command_echo, print_error, print_goodbye, print_welcome,
};
use takebin::config::ProjectArgs;
use takebin::console::{self, ConsoleCommand};
use takebin::history::HistoryController;

use rustyline::{
    completion::Completer, highlight::Highlighter, history::FileHistory, validate::Validator,
    CompletionType, Config, Editor, Helper,
};

/// Interactive shell over one takebin project.
#[derive(Parser, Debug)]
#[command(styles = get_styles(), version = env!("GIT_HASH"))]
struct CliArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}

#[derive(Parser)]
#[command(styles = get_styles(), name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    #[command(flatten)]
    Console(ConsoleCommand),

    /// Shows the path of the current project.
    Where,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

/// Commands whose first argument is an entity kind.
const KIND_COMMANDS: [&str; 4] = ["list", "delete", "rename", "complete"];

fn execute_command(line: &str, controller: &HistoryController) -> CommandExecutionResult {
    let line = line.trim();
    if line.is_empty() {
        return CommandExecutionResult::Ok;
    }

    let args =
        shlex::split(line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());

    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    match cli {
        Ok(cli) => {
            print_command_echo(line);
            match cli.command {
                InnerCommand::Console(command) => {
                    if let Err(err) = console::run(command, controller) {
                        console::report_error(&err);
                        return CommandExecutionResult::Error(err.to_string());
                    }
                }
                InnerCommand::Where => {
                    println!("{}", controller.context().paths().root.display());
                }
                InnerCommand::Exit => return CommandExecutionResult::Exit,
            }
        }
        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
        }
    }
    CommandExecutionResult::Ok
}

#[derive(rustyline_derive::Hinter)]
struct CatalogHelper {
    commands_names: Vec<String>,
}

impl CatalogHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        CatalogHelper { commands_names }
    }

    /// Command names for the first word, entity kinds for the second word of
    /// commands that take one.
    fn candidates(&self, line: &str) -> (usize, Vec<String>) {
        let words: Vec<&str> = line.split(' ').collect();
        match words.as_slice() {
            [prefix] => (
                0,
                self.commands_names
                    .iter()
                    .filter(|c| c.starts_with(prefix))
                    .cloned()
                    .collect(),
            ),
            [command, prefix] if KIND_COMMANDS.contains(command) => (
                command.len() + 1,
                EntityKind::ALL
                    .iter()
                    .map(|k| k.as_str())
                    .filter(|k| k.starts_with(prefix))
                    .map(String::from)
                    .collect(),
            ),
            _ => (0, Vec::new()),
        }
    }
}

impl Completer for CatalogHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        Ok(self.candidates(&line[..pos]))
    }
}

impl Highlighter for CatalogHelper {}
impl Validator for CatalogHelper {}
impl Helper for CatalogHelper {}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let config = cli_args.project.resolve()?;
    console::init_tracing(config.log_level)?;

    let controller = console::open_controller(&config)?;
    print_welcome(&config.project_root().display().to_string());

    let rl_config = Config::builder()
        .completion_type(CompletionType::List)
        .build();
    let mut rl = Editor::<CatalogHelper, FileHistory>::with_config(rl_config)?;
    rl.set_helper(Some(CatalogHelper::new()));

    loop {
        let readline = rl.readline(&get_prompt());
        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                match execute_command(&line, &controller) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => break,
                    CommandExecutionResult::Error(err) => {
                        tracing::debug!("Command failed: {}", err);
                    }
                }
                flush();
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                print_error(&format!("{:?}", e));
                break;
            }
        }
    }
    print_goodbye();
    Ok(())
}
