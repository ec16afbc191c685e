use std::collections::{HashMap, VecDeque};

use engine::{LoopControl, PrefsStore, Vec3};
use tracing::{debug, warn};

use super::session::{DamageOutcome, Presentation, Session};

const MAX_PENDING_SESSION_COMMANDS: usize = 128;
pub(crate) const MAX_OUTPUT_LINES: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SessionCommand {
    Status,
    Move { delta: Vec3 },
    Exit { index: usize },
    Kill { count: u32 },
    SpawnHostiles { count: u32 },
    Damage { amount: i32 },
    Heal,
    Pickup { kind: String },
    Suspend,
    Continue,
    MainMenu,
    Start,
    Load { level: String },
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LocalAction {
    Help,
    Echo { text: String },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ParsedCommand {
    Local(LocalAction),
    Queueable(SessionCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CommandParseError {
    reason: String,
    usage: String,
}

type ParseFn = dyn Fn(&[String]) -> Result<ParsedCommand, CommandParseError> + Send + Sync;
type BuiltinParseFn = fn(&[String]) -> Result<ParsedCommand, CommandParseError>;

const SESSION_BUILTINS: [(&str, &str, &str, BuiltinParseFn); 16] = [
    ("help", "List commands", "", parse_help_command),
    ("echo", "Print text to console", "<text...>", parse_echo_command),
    ("status", "Print session state as JSON", "", parse_status_command),
    (
        "move",
        "Move the player by a delta",
        "<dx:f64> <dy:f64> [dz:f64]",
        parse_move_command,
    ),
    (
        "exit",
        "Touch an exit of the current level",
        "<index:usize>",
        parse_exit_command,
    ),
    ("kill", "Kill live hostiles", "[count:u32]", parse_kill_command),
    (
        "spawn_hostiles",
        "Add live hostiles to the current level",
        "<count:u32>",
        parse_spawn_hostiles_command,
    ),
    ("damage", "Damage the player", "<amount:i32>", parse_damage_command),
    ("heal", "Heal the player by one", "", parse_heal_command),
    (
        "pickup",
        "Collect a pickup",
        "<kind:gold_coin|stamina_globe|health_globe>",
        parse_pickup_command,
    ),
    ("suspend", "Save and open the suspend menu", "", parse_suspend_command),
    ("continue", "Resume from the suspend menu", "", parse_continue_command),
    (
        "main_menu",
        "Forget the save and open the main menu",
        "",
        parse_main_menu_command,
    ),
    ("start", "Start a new game from a menu screen", "", parse_start_command),
    ("load", "Load a level immediately", "<level:string>", parse_load_command),
    ("quit", "Quit app", "", parse_quit_command),
];

pub(crate) struct CommandSpec {
    name: String,
    help: String,
    arg_schema: String,
    parse: Box<ParseFn>,
}

pub(crate) struct ConsoleCommandRegistry {
    specs: Vec<CommandSpec>,
    lookup_by_lower_name: HashMap<String, usize>,
}

impl ConsoleCommandRegistry {
    pub(crate) fn new() -> Self {
        Self {
            specs: Vec::new(),
            lookup_by_lower_name: HashMap::new(),
        }
    }

    pub(crate) fn with_session_builtins() -> Self {
        let mut registry = Self::new();
        for (name, help, arg_schema, parse) in SESSION_BUILTINS {
            if let Err(error) = registry.register(name, help, arg_schema, parse) {
                warn!(command = name, error = %error, "console_builtin_rejected");
            }
        }
        registry
    }

    pub(crate) fn register<F>(
        &mut self,
        name: impl Into<String>,
        help: impl Into<String>,
        arg_schema: impl Into<String>,
        parse: F,
    ) -> Result<(), String>
    where
        F: Fn(&[String]) -> Result<ParsedCommand, CommandParseError> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("command name cannot be empty".to_string());
        }
        let lower = name.to_ascii_lowercase();
        if self.lookup_by_lower_name.contains_key(&lower) {
            return Err(format!("duplicate command registration: {name}"));
        }

        self.specs.push(CommandSpec {
            name,
            help: help.into(),
            arg_schema: arg_schema.into(),
            parse: Box::new(parse),
        });
        self.lookup_by_lower_name
            .insert(lower, self.specs.len() - 1);
        Ok(())
    }

    pub(crate) fn lookup(&self, input_name: &str) -> Option<&CommandSpec> {
        let lower = input_name.to_ascii_lowercase();
        let index = self.lookup_by_lower_name.get(&lower)?;
        self.specs.get(*index)
    }

    pub(crate) fn iter_specs_in_order(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.specs.iter().map(|spec| {
            (
                spec.name.as_str(),
                spec.help.as_str(),
                spec.arg_schema.as_str(),
            )
        })
    }
}

/// Lines waiting to be printed. Oldest lines are dropped past [`MAX_OUTPUT_LINES`].
#[derive(Debug, Default)]
pub(crate) struct ConsoleOutput {
    lines: VecDeque<String>,
}

impl ConsoleOutput {
    pub(crate) fn append_output_line(&mut self, line: impl Into<String>) {
        if self.lines.len() == MAX_OUTPUT_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    pub(crate) fn drain_output_lines_into(&mut self, out: &mut Vec<String>) {
        out.extend(self.lines.drain(..));
    }

    #[cfg(test)]
    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}

pub(crate) struct ConsoleCommandProcessor {
    registry: ConsoleCommandRegistry,
    pending_session_commands: VecDeque<SessionCommand>,
}

impl Default for ConsoleCommandProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleCommandProcessor {
    pub(crate) fn new() -> Self {
        Self {
            registry: ConsoleCommandRegistry::with_session_builtins(),
            pending_session_commands: VecDeque::new(),
        }
    }

    pub(crate) fn process_lines<I>(&mut self, lines: I, output: &mut ConsoleOutput)
    where
        I: IntoIterator<Item = String>,
    {
        for raw_line in lines {
            self.process_line(output, &raw_line);
        }
    }

    pub(crate) fn drain_pending_session_commands_into(&mut self, out: &mut Vec<SessionCommand>) {
        out.extend(self.pending_session_commands.drain(..));
    }

    fn process_line(&mut self, output: &mut ConsoleOutput, raw_line: &str) {
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            return;
        }

        let tokens = match tokenize_line(trimmed) {
            Ok(tokens) => tokens,
            Err(reason) => {
                output.append_output_line(format!("error: {reason}. usage: help"));
                return;
            }
        };
        if tokens.is_empty() {
            return;
        }

        let command_name = &tokens[0];
        let args = &tokens[1..];
        let Some(spec) = self.registry.lookup(command_name) else {
            output.append_output_line(format!(
                "error: unknown command '{}'. try: help",
                command_name
            ));
            return;
        };

        match (spec.parse)(args) {
            Ok(ParsedCommand::Local(action)) => self.apply_local_action(output, action),
            Ok(ParsedCommand::Queueable(command)) => self.push_queueable(command),
            Err(error) => {
                output.append_output_line(format!(
                    "error: {}. usage: {}",
                    error.reason, error.usage
                ));
            }
        }
    }

    fn apply_local_action(&self, output: &mut ConsoleOutput, action: LocalAction) {
        match action {
            LocalAction::Help => {
                for (name, help, arg_schema) in self.registry.iter_specs_in_order() {
                    let line = if arg_schema.is_empty() {
                        format!("{name} - {help}")
                    } else {
                        format!("{name} {arg_schema} - {help}")
                    };
                    output.append_output_line(line);
                }
            }
            LocalAction::Echo { text } => output.append_output_line(text),
        }
    }

    fn push_queueable(&mut self, command: SessionCommand) {
        if self.pending_session_commands.len() == MAX_PENDING_SESSION_COMMANDS {
            if let Some(dropped) = self.pending_session_commands.pop_front() {
                debug!(dropped = ?dropped, "session_command_dropped; queue full");
            }
        }
        self.pending_session_commands.push_back(command);
    }
}

pub(crate) fn apply_session_command<S: PrefsStore, P: Presentation>(
    session: &mut Session<S, P>,
    command: SessionCommand,
    output: &mut ConsoleOutput,
) -> LoopControl {
    let line = match command {
        SessionCommand::Status => match serde_json::to_string(&session.status()) {
            Ok(json) => json,
            Err(error) => format!("error: failed to encode status: {error}"),
        },
        SessionCommand::Move { delta } => {
            if session.move_player(delta) {
                match session.status().player_position {
                    Some(position) => format!("player at {position}"),
                    None => "player moved".to_string(),
                }
            } else {
                "move ignored".to_string()
            }
        }
        SessionCommand::Exit { index } => {
            if session.overlap_exit(index) {
                format!("transition started through exit {index}")
            } else {
                format!("exit {index} ignored")
            }
        }
        SessionCommand::Kill { count } => {
            let remaining = session.kill_hostiles(count);
            format!("hostiles remaining: {remaining}")
        }
        SessionCommand::SpawnHostiles { count } => {
            let live = session.spawn_hostiles(count);
            format!("hostiles remaining: {live}")
        }
        SessionCommand::Damage { amount } => match session.damage_player(amount) {
            DamageOutcome::Hurt => "player hurt".to_string(),
            DamageOutcome::Died => "player died".to_string(),
            DamageOutcome::Ignored => "damage ignored".to_string(),
        },
        SessionCommand::Heal => outcome_line(session.heal_player(), "healed", "heal ignored"),
        SessionCommand::Pickup { kind } => {
            if session.collect_pickup(&kind) {
                format!("collected {kind}")
            } else {
                format!("pickup {kind} ignored")
            }
        }
        SessionCommand::Suspend => outcome_line(session.suspend(), "suspended", "suspend ignored"),
        SessionCommand::Continue => {
            outcome_line(session.continue_game(), "continuing", "continue ignored")
        }
        SessionCommand::MainMenu => outcome_line(
            session.exit_to_main_menu(),
            "opened main menu",
            "main_menu ignored",
        ),
        SessionCommand::Start => {
            outcome_line(session.start_new_game(), "new game started", "start ignored")
        }
        SessionCommand::Load { level } => match session.request_load(&level) {
            Ok(true) => format!("loaded {level}"),
            Ok(false) => format!("load {level} ignored; transition in flight"),
            Err(error) => format!("error: {error}"),
        },
        SessionCommand::Quit => {
            output.append_output_line("bye");
            return LoopControl::Quit;
        }
    };
    output.append_output_line(line);
    LoopControl::Continue
}

fn outcome_line(applied: bool, applied_line: &str, ignored_line: &str) -> String {
    if applied {
        applied_line.to_string()
    } else {
        ignored_line.to_string()
    }
}

fn tokenize_line(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut seen_token_content = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                seen_token_content = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if seen_token_content {
                    tokens.push(std::mem::take(&mut current));
                    seen_token_content = false;
                }
            }
            _ => {
                current.push(ch);
                seen_token_content = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted string".to_string());
    }
    if seen_token_content {
        tokens.push(current);
    }

    Ok(tokens)
}

fn parse_help_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "help")?;
    Ok(ParsedCommand::Local(LocalAction::Help))
}

fn parse_echo_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    if args.is_empty() {
        return Err(CommandParseError {
            reason: "missing required argument <text...>".to_string(),
            usage: "echo <text...>".to_string(),
        });
    }
    Ok(ParsedCommand::Local(LocalAction::Echo {
        text: args.join(" "),
    }))
}

fn parse_status_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "status")?;
    Ok(ParsedCommand::Queueable(SessionCommand::Status))
}

fn parse_move_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "move <dx> <dy> [dz]";
    if args.len() != 2 && args.len() != 3 {
        return Err(CommandParseError {
            reason: "expected <dx> <dy> or <dx> <dy> <dz>".to_string(),
            usage: USAGE.to_string(),
        });
    }

    let mut components = [0.0_f64; 3];
    for (slot, (axis, raw)) in components.iter_mut().zip(["dx", "dy", "dz"].iter().zip(args)) {
        let value = raw.parse::<f64>().map_err(|_| CommandParseError {
            reason: format!("invalid {axis} '{raw}' (expected f64)"),
            usage: USAGE.to_string(),
        })?;
        if !value.is_finite() {
            return Err(CommandParseError {
                reason: format!("invalid {axis} '{raw}' (must be finite)"),
                usage: USAGE.to_string(),
            });
        }
        *slot = value;
    }

    let [x, y, z] = components;
    Ok(ParsedCommand::Queueable(SessionCommand::Move {
        delta: Vec3::new(x, y, z),
    }))
}

fn parse_exit_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let index = parse_single_arg::<usize>(args, "index", "usize", "exit <index>")?;
    Ok(ParsedCommand::Queueable(SessionCommand::Exit { index }))
}

fn parse_kill_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let count = if args.is_empty() {
        1
    } else {
        parse_single_arg::<u32>(args, "count", "u32", "kill [count]")?
    };
    Ok(ParsedCommand::Queueable(SessionCommand::Kill { count }))
}

fn parse_spawn_hostiles_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let count = parse_single_arg::<u32>(args, "count", "u32", "spawn_hostiles <count>")?;
    Ok(ParsedCommand::Queueable(SessionCommand::SpawnHostiles {
        count,
    }))
}

fn parse_damage_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let amount = parse_single_arg::<i32>(args, "amount", "i32", "damage <amount>")?;
    Ok(ParsedCommand::Queueable(SessionCommand::Damage { amount }))
}

fn parse_heal_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "heal")?;
    Ok(ParsedCommand::Queueable(SessionCommand::Heal))
}

fn parse_pickup_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let kind = parse_single_arg::<String>(args, "kind", "string", "pickup <kind>")?;
    Ok(ParsedCommand::Queueable(SessionCommand::Pickup { kind }))
}

fn parse_suspend_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "suspend")?;
    Ok(ParsedCommand::Queueable(SessionCommand::Suspend))
}

fn parse_continue_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "continue")?;
    Ok(ParsedCommand::Queueable(SessionCommand::Continue))
}

fn parse_main_menu_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "main_menu")?;
    Ok(ParsedCommand::Queueable(SessionCommand::MainMenu))
}

fn parse_start_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "start")?;
    Ok(ParsedCommand::Queueable(SessionCommand::Start))
}

fn parse_load_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let level = parse_single_arg::<String>(args, "level", "string", "load <level>")?;
    Ok(ParsedCommand::Queueable(SessionCommand::Load { level }))
}

fn parse_quit_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "quit")?;
    Ok(ParsedCommand::Queueable(SessionCommand::Quit))
}

fn parse_single_arg<T: std::str::FromStr>(
    args: &[String],
    name: &str,
    type_name: &str,
    usage: &str,
) -> Result<T, CommandParseError> {
    if args.len() != 1 {
        return Err(CommandParseError {
            reason: format!("expected exactly one argument <{name}>"),
            usage: usage.to_string(),
        });
    }
    args[0].parse::<T>().map_err(|_| CommandParseError {
        reason: format!("invalid {name} '{}' (expected {type_name})", args[0]),
        usage: usage.to_string(),
    })
}

fn require_no_args(args: &[String], usage: &str) -> Result<(), CommandParseError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandParseError {
            reason: "unexpected extra arguments".to_string(),
            usage: usage.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use engine::{compile_level_catalog_from_str, MemoryPrefs};

    use super::*;
    use crate::app::session::{RecordingPresentation, SessionConfig};

    const LEVELS: &str = r#"<Levels>
        <LevelDef>
            <name>Scene1</name>
            <role>Gameplay</role>
            <restricted>true</restricted>
            <hostiles>1</hostiles>
            <exits><li><target>Scene2</target><tag>scene1_east</tag></li></exits>
        </LevelDef>
        <LevelDef>
            <name>Scene2</name>
            <role>Gameplay</role>
            <entries><li><tag>scene1_east</tag><position>-9 1 0</position></li></entries>
        </LevelDef>
        <LevelDef><name>Continue</name><role>SuspendMenu</role></LevelDef>
        <LevelDef><name>Win</name><role>Victory</role></LevelDef>
        <LevelDef><name>Die</name><role>Defeat</role></LevelDef>
    </Levels>"#;

    type TestSession = Session<MemoryPrefs, RecordingPresentation>;

    fn started_session() -> TestSession {
        let catalog = compile_level_catalog_from_str(Path::new("console_levels.xml"), LEVELS)
            .expect("catalog");
        let mut session = Session::new(
            SessionConfig::default(),
            catalog,
            MemoryPrefs::new(),
            RecordingPresentation::default(),
        )
        .expect("session");
        session.start().expect("start");
        session
    }

    fn run_lines(
        processor: &mut ConsoleCommandProcessor,
        session: &mut TestSession,
        lines: &[&str],
    ) -> (Vec<String>, LoopControl) {
        let mut output = ConsoleOutput::default();
        processor.process_lines(lines.iter().map(|line| line.to_string()), &mut output);
        let mut commands = Vec::new();
        processor.drain_pending_session_commands_into(&mut commands);
        let mut control = LoopControl::Continue;
        for command in commands {
            control = apply_session_command(session, command, &mut output);
        }
        (output.lines(), control)
    }

    fn parse_only(lines: &[&str]) -> (Vec<SessionCommand>, Vec<String>) {
        let mut processor = ConsoleCommandProcessor::new();
        let mut output = ConsoleOutput::default();
        processor.process_lines(lines.iter().map(|line| line.to_string()), &mut output);
        let mut queued = Vec::new();
        processor.drain_pending_session_commands_into(&mut queued);
        (queued, output.lines())
    }

    #[test]
    fn help_lists_commands_in_registration_order() {
        let (_, lines) = parse_only(&["help"]);

        assert_eq!(lines.len(), SESSION_BUILTINS.len());
        assert_eq!(lines[0], "help - List commands");
        assert_eq!(lines[1], "echo <text...> - Print text to console");
        assert_eq!(lines[2], "status - Print session state as JSON");
        assert_eq!(
            lines[3],
            "move <dx:f64> <dy:f64> [dz:f64] - Move the player by a delta"
        );
        assert_eq!(lines[15], "quit - Quit app");
    }

    #[test]
    fn unknown_command_reports_clear_error() {
        let (queued, lines) = parse_only(&["nope"]);

        assert!(queued.is_empty());
        assert_eq!(lines, vec!["error: unknown command 'nope'. try: help"]);
    }

    #[test]
    fn bad_args_report_usage_hint() {
        let (queued, lines) = parse_only(&["exit east", "move 1", "damage", "status now"]);

        assert!(queued.is_empty());
        assert_eq!(
            lines,
            vec![
                "error: invalid index 'east' (expected usize). usage: exit <index>",
                "error: expected <dx> <dy> or <dx> <dy> <dz>. usage: move <dx> <dy> [dz]",
                "error: expected exactly one argument <amount>. usage: damage <amount>",
                "error: unexpected extra arguments. usage: status",
            ]
        );
    }

    #[test]
    fn unterminated_quote_is_reported() {
        let (queued, lines) = parse_only(&["load \"Scene"]);

        assert!(queued.is_empty());
        assert_eq!(
            lines,
            vec!["error: unterminated quoted string. usage: help"]
        );
    }

    #[test]
    fn commands_are_case_insensitive_and_quotes_group_tokens() {
        let (queued, _) = parse_only(&["LOAD \"Boss Room\"", "Kill", "move 1.5 -2"]);

        assert_eq!(
            queued,
            vec![
                SessionCommand::Load {
                    level: "Boss Room".to_string()
                },
                SessionCommand::Kill { count: 1 },
                SessionCommand::Move {
                    delta: Vec3::new(1.5, -2.0, 0.0)
                },
            ]
        );
    }

    #[test]
    fn local_commands_are_immediate_and_not_enqueued() {
        let (queued, lines) = parse_only(&["echo hi there", "   "]);

        assert!(queued.is_empty());
        assert_eq!(lines, vec!["hi there"]);
    }

    #[test]
    fn pending_queue_drops_oldest_when_full() {
        let mut processor = ConsoleCommandProcessor::new();
        let mut output = ConsoleOutput::default();
        let lines = (0..=MAX_PENDING_SESSION_COMMANDS).map(|index| format!("exit {index}"));
        processor.process_lines(lines, &mut output);

        let mut queued = Vec::new();
        processor.drain_pending_session_commands_into(&mut queued);
        assert_eq!(queued.len(), MAX_PENDING_SESSION_COMMANDS);
        assert_eq!(queued[0], SessionCommand::Exit { index: 1 });
    }

    #[test]
    fn output_keeps_only_the_newest_lines() {
        let mut output = ConsoleOutput::default();
        for index in 0..MAX_OUTPUT_LINES + 2 {
            output.append_output_line(format!("line {index}"));
        }

        let mut drained = Vec::new();
        output.drain_output_lines_into(&mut drained);
        assert_eq!(drained.len(), MAX_OUTPUT_LINES);
        assert_eq!(drained[0], "line 2");
        assert!(output.lines().is_empty());
    }

    #[test]
    fn register_rejects_duplicate_names_ignoring_case() {
        let mut registry = ConsoleCommandRegistry::with_session_builtins();

        let result = registry.register("QUIT", "again", "", parse_quit_command);

        assert_eq!(
            result,
            Err("duplicate command registration: QUIT".to_string())
        );
        assert!(registry.register(" ", "blank", "", parse_quit_command).is_err());
    }

    #[test]
    fn status_prints_session_json() {
        let mut processor = ConsoleCommandProcessor::new();
        let mut session = started_session();

        let (lines, control) = run_lines(&mut processor, &mut session, &["status"]);

        assert_eq!(control, LoopControl::Continue);
        let status: serde_json::Value = serde_json::from_str(&lines[0]).expect("json");
        assert_eq!(status["level"], "Scene1");
        assert_eq!(status["live_hostiles"], 1);
        assert_eq!(status["health"], 3);
    }

    #[test]
    fn kill_then_exit_drives_a_transition() {
        let mut processor = ConsoleCommandProcessor::new();
        let mut session = started_session();

        let (lines, _) = run_lines(&mut processor, &mut session, &["exit 0"]);
        assert_eq!(lines, vec!["exit 0 ignored"]);

        run_lines(&mut processor, &mut session, &["kill"]);
        session.tick(Duration::from_millis(100));
        let (lines, _) = run_lines(&mut processor, &mut session, &["exit 0"]);
        assert_eq!(lines, vec!["transition started through exit 0"]);

        for _ in 0..10 {
            session.tick(Duration::from_millis(100));
        }
        assert_eq!(session.current_level_name(), Some("Scene2"));
        let (lines, _) = run_lines(&mut processor, &mut session, &["move 1 0"]);
        assert_eq!(lines, vec!["player at (-8, 1, 0)"]);
    }

    #[test]
    fn menu_commands_follow_session_rules() {
        let mut processor = ConsoleCommandProcessor::new();
        let mut session = started_session();

        let (lines, _) = run_lines(
            &mut processor,
            &mut session,
            &["continue", "suspend", "continue"],
        );

        assert_eq!(lines, vec!["continue ignored", "suspended", "continuing"]);
        assert_eq!(session.current_level_name(), Some("Scene1"));
    }

    #[test]
    fn load_reports_unknown_levels() {
        let mut processor = ConsoleCommandProcessor::new();
        let mut session = started_session();

        let (lines, _) = run_lines(&mut processor, &mut session, &["load Nowhere", "load Win"]);

        assert_eq!(lines, vec!["error: unknown level 'Nowhere'", "loaded Win"]);
        assert_eq!(session.current_level_name(), Some("Win"));
    }

    #[test]
    fn quit_stops_the_loop() {
        let mut processor = ConsoleCommandProcessor::new();
        let mut session = started_session();

        let (lines, control) = run_lines(&mut processor, &mut session, &["quit"]);

        assert_eq!(control, LoopControl::Quit);
        assert_eq!(lines, vec!["bye"]);
    }
}
