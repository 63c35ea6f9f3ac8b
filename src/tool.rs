// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Shell for interacting with named sorted maps

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use humansize::{SizeFormatter, BINARY};
use lexmap::{Config, Direction, OpKind, Operation, Registry, SortedMap, UserValue};
use rustyline::DefaultEditor;
use std::cell::RefCell;
use std::io::{self, BufRead, IsTerminal, Write};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    prelude::*,
    registry::Registry as TracingRegistry,
};

macro_rules! die {
    ($fmt:literal, $($arg:tt)*) => {{
        eprintln!($fmt, $($arg)*);
        std::process::exit(1);
    }};

    ($msg:literal) => {{
        eprintln!($msg);
        std::process::exit(1);
    }};
}

#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

/// Name of the map that is created and selected on startup
const DEFAULT_MAP: &str = "default";

pub fn init_tracing(quiet: bool, verbose: u8) -> LevelFilter {
    let level_filter = if quiet {
        LevelFilter::ERROR
    } else {
        match verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    // Bridge log crate macros to tracing (for library code that uses log::*)
    tracing_log::LogTracer::init().expect("Failed to set log tracer");

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("LEXMAP_LOG")
        .from_env_lossy()
        .add_directive(
            "rustyline=warn"
                .parse()
                .expect("Failed to parse rustyline directive"),
        );

    let subscriber = TracingRegistry::default().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .compact(),
    );

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        die!("INTERNAL ERROR: setting default tracing::subscriber failed");
    }

    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing_panic::panic_hook(info);
        prev_hook(info); // daisy-chain to old panic hook
    }));

    level_filter
}

fn parse_probability(s: &str) -> Result<f64, String> {
    let p = s.parse::<f64>().map_err(|e| e.to_string())?;

    if p > 0.0 && p < 1.0 {
        Ok(p)
    } else {
        Err(format!("{p} is not in (0, 1)"))
    }
}

/// Shell for interacting with named sorted maps
#[derive(Parser, Debug)]
#[command(name = "lexmap")]
#[command(about = "Shell for interacting with named sorted maps")]
struct ToolArgs {
    /// Suppress all output except for errors. This overrides the -v flag.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Turn on verbose output. Supply -v multiple times to increase verbosity.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Probability of lifting a skiplist node one more level
    #[arg(
        short = 'p', long,
        default_value_t = Config::DEFAULT_LEVEL_PROBABILITY,
        value_parser = parse_probability,
    )]
    level_probability: f64,

    /// Seed of the skiplist level generator
    #[arg(short, long, default_value_t = Config::DEFAULT_SEED)]
    seed: u32,

    /// Command to run (if omitted, starts interactive shell)
    #[command(subcommand)]
    command: Option<ToolCommand>,
}

#[derive(Subcommand, Debug, Clone)]
enum ToolCommand {
    /// Create a sorted map
    Create {
        /// Name of the map
        name: String,
    },
    /// Drop a sorted map
    Drop {
        /// Name of the map
        name: String,
    },
    /// List all sorted maps
    #[command(visible_alias = "ls")]
    List,
    /// Select the sorted map that the key commands operate on
    Use {
        /// Name of the map
        name: String,
    },
    /// Show the length of every sorted map
    Status,
    /// Get the value for a key
    Get {
        /// The key to look up
        key: String,
    },
    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,
        /// The value to store
        value: String,
    },
    /// Set a key-value pair, unless the key exists
    Setnx {
        /// The key to set
        key: String,
        /// The value to store
        value: String,
    },
    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },
    /// List keys, starting at (or around) a key
    Scan {
        /// Key to start at
        from: Option<String>,

        /// Scan in descending order
        #[arg(short, long)]
        reverse: bool,

        /// Amount of items to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Maximum amount of items to show
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Count the number of items
    Count,
    /// Show map statistics
    Info,
    /// Print the skiplist levels of the map
    Dump,
}

// Internal shell commands, include all external tool commands
#[derive(Parser, Debug)]
#[command(name = "")]
#[command(no_binary_name = true)]
#[command(disable_version_flag = true)]
#[command(help_template = "
{version}

Available Commands:

{subcommands}

Use `help COMMAND` or `COMMAND --help` for more details.

")]

struct ShellArgs {
    #[command(subcommand)]
    command: ShellCommand,
}

// Shell commands (including ones not available from CLI)
#[derive(Subcommand, Debug, Clone)]
enum ShellCommand {
    #[command(flatten)]
    ToolCmd(ToolCommand),

    /// Exit the current shell
    #[command(visible_alias = "quit")]
    Exit,
    /// Begin a new batch (transaction)
    Begin,
    /// Commit the current batch
    Commit,
    /// Rollback (discard) the current batch
    Rollback,
}

struct Session {
    registry: Registry,

    /// Name of the selected map
    current: RefCell<String>,

    /// Operations of the open batch, in order
    batch: RefCell<Option<Vec<Operation>>>,
}

impl Session {
    fn open(config: Config) -> lexmap::Result<Self> {
        let registry = Registry::with_config(config);
        registry.create_sorted_map(DEFAULT_MAP)?;

        Ok(Self {
            registry,
            current: RefCell::new(DEFAULT_MAP.into()),
            batch: RefCell::new(None),
        })
    }

    fn map(&self) -> lexmap::Result<SortedMap> {
        self.registry.sorted_map(&self.current.borrow())
    }

    fn has_batch(&self) -> bool {
        self.batch.borrow().is_some()
    }

    fn begin_batch(&self) -> bool {
        let mut batch = self.batch.borrow_mut();
        if batch.is_some() {
            false
        } else {
            *batch = Some(Vec::new());
            true
        }
    }

    fn rollback_batch(&self) -> bool {
        self.batch.borrow_mut().take().is_some()
    }

    /// Pushes an operation, if a batch is open.
    fn batch_push(&self, op: Operation) -> bool {
        match &mut *self.batch.borrow_mut() {
            Some(ops) => {
                ops.push(op);
                true
            }
            None => false,
        }
    }

    /// Resolves a key against the open batch.
    ///
    /// Returns `None` if the batch does not decide the key.
    fn batch_get(&self, map: &SortedMap, key: &str) -> Option<Option<UserValue>> {
        let batch = self.batch.borrow();
        let ops = batch.as_ref()?;

        let mut pending_setnx = None;

        for op in ops.iter().rev().filter(|op| op.key == key) {
            match op.kind() {
                Ok(OpKind::Put) => return Some(op.value.clone()),
                Ok(OpKind::Remove) => return Some(pending_setnx.unwrap_or(None)),
                Ok(OpKind::PutIfAbsent) => pending_setnx = Some(op.value.clone()),
                Err(_) => {}
            }
        }

        let pending = pending_setnx?;

        match map.get_entry(key) {
            Ok(Some(entry)) => Some(entry.into_value()),
            _ => Some(pending),
        }
    }
}

fn format_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => format!("{bytes:?}"),
    }
}

fn format_value(value: Option<&UserValue>) -> String {
    value.map_or_else(|| "(no value)".into(), |v| format_bytes(v))
}

fn print_info(session: &Session, map: &SortedMap) {
    // If there's an active batch, show its contents
    if let Some(ops) = &*session.batch.borrow() {
        println!("Active batch ({} operations):", ops.len());
        for (i, op) in ops.iter().enumerate() {
            let key = format_bytes(&op.key);

            match op.kind() {
                Ok(OpKind::Put) => println!("  {}. SET {key} = {}", i + 1, format_value(op.value.as_ref())),
                Ok(OpKind::PutIfAbsent) => println!("  {}. SETNX {key} = {}", i + 1, format_value(op.value.as_ref())),
                Ok(OpKind::Remove) => println!("  {}. DEL {key}", i + 1),
                Err(e) => println!("  {}. {e}", i + 1),
            }
        }
        println!();
    }

    println!("Map: {}", session.current.borrow());
    println!("Items: {}", map.len());
    println!(
        "Approximate size: {}",
        SizeFormatter::new(map.approximate_size(), BINARY),
    );
    println!("Level probability: {:.3}", map.config().level_probability);
    println!("Seed: {}", map.config().seed);
}

fn handle_create(session: &Session, name: &str) {
    match session.registry.create_sorted_map(name) {
        Ok(_) => println!("OK (created)"),
        Err(e) => eprintln!("Error: {e}"),
    }
}

fn handle_drop(session: &Session, name: &str) {
    if *session.current.borrow() == name {
        eprintln!("Error: cannot drop the selected map, `use` another one first");
        return;
    }

    match session.registry.drop_sorted_map(name) {
        Ok(()) => println!("OK (dropped)"),
        Err(e) => eprintln!("Error: {e}"),
    }
}

fn handle_list(session: &Session) {
    let maps = session.registry.list();
    for (name, kind) in &maps {
        println!("{name} ({kind})");
    }
    println!("OK ({} maps)", maps.len());
}

fn handle_use(session: &Session, name: &str) {
    if session.has_batch() {
        eprintln!("Error: cannot switch maps while a batch is active");
        return;
    }

    match session.registry.sorted_map(name) {
        Ok(_) => {
            name.clone_into(&mut session.current.borrow_mut());
            println!("OK (using {name})");
        }
        Err(e) => eprintln!("Error: {e}"),
    }
}

fn handle_get(session: &Session, map: &SortedMap, key: &str) {
    // Check batch first if one exists
    if let Some(batch_value) = session.batch_get(map, key) {
        match batch_value {
            Some(value) => println!("{}", format_bytes(&value)),
            None => println!("(deleted in batch)"),
        }
        return;
    }

    match map.get_entry(key) {
        Ok(Some(entry)) => println!("{}", format_value(entry.value())),
        Ok(None) => println!("(not found)"),
        Err(e) => eprintln!("Error: {e}"),
    }
}

fn handle_set(session: &Session, map: &SortedMap, key: &str, value: &str, replace: bool) {
    if key.is_empty() {
        eprintln!("Error: {}", lexmap::Error::InvalidKey);
        return;
    }

    // If batch exists, add to batch instead
    let op = if replace {
        Operation::put(key, value)
    } else {
        Operation::put_if_absent(key, value)
    };
    if session.batch_push(op) {
        println!("OK (batched, ready to commit)");
        return;
    }

    match map.insert(key, Some(value.into()), replace) {
        Ok(None) => println!("OK (set)"),
        Ok(Some(_)) if replace => println!("OK (replaced)"),
        Ok(Some(old)) => println!("OK (exists: {})", format_bytes(&old)),
        Err(e) => eprintln!("Error: {e}"),
    }
}

fn handle_del(session: &Session, map: &SortedMap, key: &str) {
    if key.is_empty() {
        eprintln!("Error: {}", lexmap::Error::InvalidKey);
        return;
    }

    if session.batch_push(Operation::remove(key)) {
        println!("OK (batched, ready to commit)");
        return;
    }

    match map.remove(key) {
        Ok(_) => println!("OK"),
        Err(e) => eprintln!("Error: {e}"),
    }
}

fn handle_scan(
    session: &Session,
    map: &SortedMap,
    from: Option<&str>,
    reverse: bool,
    offset: usize,
    limit: Option<usize>,
) {
    if session.has_batch() {
        eprintln!("Warning: scan ignores uncommitted batch operations");
    }

    let direction = if reverse {
        Direction::Backward
    } else {
        Direction::Forward
    };

    let iter = map.iter(
        from.map(str::as_bytes),
        direction,
        offset,
        limit.unwrap_or(usize::MAX),
    );

    let mut count = 0;
    for (key, value) in iter {
        match value {
            Some(value) => println!("{} = {}", format_bytes(&key), format_bytes(&value)),
            None => println!("{}", format_bytes(&key)),
        }
        count += 1;
    }
    println!("OK ({count} items)");
}

fn handle_commit(session: &Session, map: &SortedMap) {
    let Some(ops) = session.batch.borrow_mut().take() else {
        eprintln!("Error: no active batch");
        return;
    };

    match map.apply_transaction(&ops) {
        Ok(()) => println!("OK (batch committed)"),
        Err(e) => eprintln!("Error: {e}"),
    }
}

/// Result of executing a command
enum CommandResult {
    Continue,
    Exit,
}

/// Execute a parsed command
fn execute_command(session: &Session, cmd: ToolCommand) -> CommandResult {
    match cmd {
        ToolCommand::Create { name } => handle_create(session, &name),
        ToolCommand::Drop { name } => handle_drop(session, &name),
        ToolCommand::List => handle_list(session),
        ToolCommand::Use { name } => handle_use(session, &name),
        ToolCommand::Status => print!("{}", session.registry.status()),
        cmd => {
            let map = match session.map() {
                Ok(map) => map,
                Err(e) => {
                    eprintln!("Error: {e}");
                    return CommandResult::Continue;
                }
            };

            match cmd {
                ToolCommand::Get { key } => handle_get(session, &map, &key),
                ToolCommand::Set { key, value } => handle_set(session, &map, &key, &value, true),
                ToolCommand::Setnx { key, value } => {
                    handle_set(session, &map, &key, &value, false);
                }
                ToolCommand::Del { key } => handle_del(session, &map, &key),
                ToolCommand::Scan {
                    from,
                    reverse,
                    offset,
                    limit,
                } => handle_scan(session, &map, from.as_deref(), reverse, offset, limit),
                ToolCommand::Count => println!("{}", map.len()),
                ToolCommand::Info => print_info(session, &map),
                ToolCommand::Dump => print!("{}", map.dump()),
                _ => {}
            }
        }
    }
    CommandResult::Continue
}

/// Execute a shell-only command
fn execute_shell_command(session: &Session, cmd: ShellCommand) -> CommandResult {
    match cmd {
        ShellCommand::ToolCmd(tool_cmd) => execute_command(session, tool_cmd),
        ShellCommand::Exit => {
            if session.rollback_batch() {
                eprintln!("Warning: discarding uncommitted batch");
            }
            CommandResult::Exit
        }
        ShellCommand::Begin => {
            if session.begin_batch() {
                println!("OK (batch started)");
            } else {
                eprintln!("Error: batch already active");
            }
            CommandResult::Continue
        }
        ShellCommand::Commit => {
            match session.map() {
                Ok(map) => handle_commit(session, &map),
                Err(e) => eprintln!("Error: {e}"),
            }
            CommandResult::Continue
        }
        ShellCommand::Rollback => {
            if session.rollback_batch() {
                println!("OK (batch rolled back)");
            } else {
                eprintln!("Error: no active batch");
            }
            CommandResult::Continue
        }
    }
}

/// Parse and run a shell command line
fn run_shell_command(session: &Session, line: &str) -> CommandResult {
    let line = line.trim();
    if line.is_empty() {
        return CommandResult::Continue;
    }

    let tokens = match shlex::split(line) {
        Some(t) if !t.is_empty() => t,
        Some(_) => return CommandResult::Continue,
        None => {
            eprintln!("error: unclosed quote");
            return CommandResult::Continue;
        }
    };

    match ShellArgs::try_parse_from(&tokens) {
        Ok(args) => execute_shell_command(session, args.command),
        Err(e) => {
            // Print clap's error message
            eprintln!("{e}");
            CommandResult::Continue
        }
    }
}

fn run_shell(session: &Session) {
    if io::stdin().is_terminal() {
        run_shell_interactive(session);
    } else {
        run_shell_non_interactive(session);
    }
}

fn run_shell_interactive(session: &Session) {
    println!("Welcome to the lexmap shell");
    println!("Type 'help' for available commands, 'exit' to quit.\n");

    let mut rl = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Error initializing line editor: {e}");
            return;
        }
    };

    loop {
        let prompt = format!("{}> ", session.current.borrow());

        match rl.readline(&prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                if let CommandResult::Exit = run_shell_command(session, &line) {
                    break;
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                // Ignore Ctrl+C, just show a new prompt
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        }
    }
}

fn run_shell_non_interactive(session: &Session) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if stdout.flush().is_err() {
            die!("can't flush stdout");
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                // EOF
                break;
            }
            Ok(_) => {
                if let CommandResult::Exit = run_shell_command(session, &line) {
                    break;
                }
            }
            Err(e) => {
                die!("Error reading input: {}", e);
            }
        }
    }
}

fn main() {
    let args = ToolArgs::parse();
    let level_filter = init_tracing(args.quiet, args.verbose);

    let cmd = ToolArgs::command();

    info!(
        "starting {} ({} {}), log level: {level_filter}",
        cmd.get_name(),
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::new()
        .level_probability(args.level_probability)
        .seed(args.seed);

    let session = match Session::open(config) {
        Ok(s) => s,
        Err(e) => die!("Error opening session: {}", e),
    };

    match args.command {
        Some(cmd) => {
            execute_command(&session, cmd);
        }
        None => run_shell(&session),
    }
}
