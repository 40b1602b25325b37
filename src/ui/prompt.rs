//! Console prompts
//!
//! Line-based questions on any `BufRead`/`Write` pair, so the whole
//! configuration dialogue can be replayed from a string in tests.

use std::io::{BufRead, Write};

use tracing::{debug, info};

use crate::core::session::{parse_command_list, PortNaming, Result, SessionAnswers, SessionError};

const YES_ANSWERS: [&str; 8] = ["y", "yes", "yeah", "sure", "okay", "ok", "fine", "why not"];
const NO_ANSWERS: [&str; 6] = ["n", "no", "nah", "nope", "no man", "not today"];

/// Interpret a yes/no answer, `None` if it is neither.
///
/// Only case is ignored; surrounding spaces make the answer unrecognised.
pub fn parse_yes_no(answer: &str) -> Option<bool> {
    let answer = answer.to_lowercase();
    if YES_ANSWERS.contains(&answer.as_str()) {
        Some(true)
    } else if NO_ANSWERS.contains(&answer.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Asks questions on `output` and reads answers from `input`
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `question` and read one line, without its line ending
    pub fn ask(&mut self, question: &str) -> Result<String> {
        writeln!(self.output, "{}", question).map_err(SessionError::Console)?;
        self.output.flush().map_err(SessionError::Console)?;

        let mut answer = String::new();
        let read = self
            .input
            .read_line(&mut answer)
            .map_err(SessionError::Console)?;
        if read == 0 {
            return Err(SessionError::InputClosed);
        }
        Ok(answer.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Ask until the answer is a recognised yes or no
    pub fn ask_yes_no(&mut self, question: &str) -> Result<bool> {
        let question = format!("{} (y/n)", question);
        loop {
            let answer = self.ask(&question)?;
            if let Some(value) = parse_yes_no(&answer) {
                return Ok(value);
            }
            debug!("Unrecognised yes/no answer {:?}", answer);
            writeln!(self.output, "Answer not understood. Please try again.")
                .map_err(SessionError::Console)?;
        }
    }

    /// Run the setup dialogue.
    ///
    /// All five questions are always asked; the speed is checked later by
    /// `SessionAnswers::into_config`.
    pub fn collect_answers(&mut self, naming: &PortNaming) -> Result<SessionAnswers> {
        let port = naming.resolve(&self.ask("Enter the COM port of the Arduino")?);
        let baud_rate = self.ask("Enter the serial communication speed")?;
        let output_dir = self.ask("Enter the path to save the file to")?;
        let timestamp_lines = self.ask_yes_no("Write time to .csv file?")?;
        let commands = parse_command_list(&self.ask(
            "Enter a comma seperated list of commands to send to the Arduino before beginning logging",
        )?);

        info!(
            "Answers port={} baud={:?} output={:?} timestamps={} commands={:?}",
            port, baud_rate, output_dir, timestamp_lines, commands
        );

        Ok(SessionAnswers {
            port,
            baud_rate,
            output_dir,
            timestamp_lines,
            commands,
        })
    }
}
