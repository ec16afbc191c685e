use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use engine::{run_headless, LoopControl, PrefsStore, Simulation};
use tracing::{error, info, warn};

use super::bootstrap::AppWiring;
use super::console::{apply_session_command, ConsoleCommandProcessor, ConsoleOutput};
use super::session::{Presentation, Session};

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        loop_config,
        mut session,
    } = app;
    if let Err(err) = session.start() {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    let input = match spawn_stdin_reader() {
        Ok(input) => input,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };

    let mut simulation = ConsoleSimulation::new(session, input, StdoutSink);
    let summary = run_headless(&loop_config, &mut simulation);
    info!(
        ticks = summary.ticks,
        dropped_backlog_ms = summary.dropped_backlog.as_millis() as u64,
        "loop_finished"
    );
    ExitCode::SUCCESS
}

/// Forwards stdin lines to the loop thread. The channel closes on EOF or a read error.
fn spawn_stdin_reader() -> io::Result<Receiver<String>> {
    let (sender, receiver) = mpsc::channel();
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if sender.send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "stdin_read_failed");
                        break;
                    }
                }
            }
        })?;
    Ok(receiver)
}

pub(crate) trait OutputSink {
    fn write_lines(&mut self, lines: &[String]);
}

struct StdoutSink;

impl OutputSink for StdoutSink {
    fn write_lines(&mut self, lines: &[String]) {
        let mut stdout = io::stdout().lock();
        for line in lines {
            if writeln!(stdout, "{line}").is_err() {
                return;
            }
        }
        let _ = stdout.flush();
    }
}

pub(crate) struct ConsoleSimulation<S: PrefsStore, P: Presentation, O: OutputSink> {
    session: Session<S, P>,
    processor: ConsoleCommandProcessor,
    output: ConsoleOutput,
    input: Receiver<String>,
    input_closed: bool,
    sink: O,
}

impl<S: PrefsStore, P: Presentation, O: OutputSink> ConsoleSimulation<S, P, O> {
    pub(crate) fn new(session: Session<S, P>, input: Receiver<String>, sink: O) -> Self {
        Self {
            session,
            processor: ConsoleCommandProcessor::new(),
            output: ConsoleOutput::default(),
            input,
            input_closed: false,
            sink,
        }
    }

    fn drain_input(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            match self.input.try_recv() {
                Ok(line) => lines.push(line),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.input_closed {
                        info!("console_input_closed");
                        self.input_closed = true;
                    }
                    break;
                }
            }
        }
        lines
    }

    fn flush_output(&mut self) {
        let mut lines = Vec::new();
        self.output.drain_output_lines_into(&mut lines);
        if !lines.is_empty() {
            self.sink.write_lines(&lines);
        }
    }
}

impl<S: PrefsStore, P: Presentation, O: OutputSink> Simulation for ConsoleSimulation<S, P, O> {
    fn tick(&mut self, fixed_dt: Duration) -> LoopControl {
        let lines = self.drain_input();
        self.processor.process_lines(lines, &mut self.output);

        let mut commands = Vec::new();
        self.processor
            .drain_pending_session_commands_into(&mut commands);
        for command in commands {
            if apply_session_command(&mut self.session, command, &mut self.output)
                == LoopControl::Quit
            {
                self.flush_output();
                return LoopControl::Quit;
            }
        }

        self.session.tick(fixed_dt);
        self.flush_output();

        // Closed input ends the run once nothing is mid-transition.
        if self.input_closed && !self.session.transition_in_flight() {
            return LoopControl::Quit;
        }
        LoopControl::Continue
    }

    fn status_line(&self) -> Option<String> {
        Some(format!(
            "level={} hostiles={} transition_in_flight={}",
            self.session.current_level_name().unwrap_or("<none>"),
            self.session.live_hostile_count(),
            self.session.transition_in_flight()
        ))
    }
}
