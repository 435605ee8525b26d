//! In-memory host implementations for driving flows without a terminal or docker.

use anyhow::{Result, bail};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::host::{
    InputRequest, OutputSink, PickItem, ProcessOutput, ProcessRequest, ProcessRunner,
    TerminalCommand, UserPrompts,
};

/// One scripted reaction to a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedAnswer {
    /// Choose the pick item with this label.
    Pick(String),
    /// Submit this text.
    Input(String),
    /// Submit the pre-filled value unchanged.
    Accept,
    /// Dismiss the prompt.
    Cancel,
}

/// A prompt that was shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskedPrompt {
    /// Quick pick with its title and item labels.
    Pick {
        /// Title
        title: String,
        /// Labels in display order
        labels: Vec<String>,
    },
    /// Input box.
    Input(InputRequest),
}

/// Prompts answered from a script, in order. Running out of answers is an error.
#[derive(Debug, Default)]
pub struct ScriptedPrompts {
    answers: Mutex<VecDeque<ScriptedAnswer>>,
    asked: Mutex<Vec<AskedPrompt>>,
}

impl ScriptedPrompts {
    /// Script with the given answers.
    pub fn new(answers: impl IntoIterator<Item = ScriptedAnswer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Append an answer.
    pub fn push(&self, answer: ScriptedAnswer) {
        self.answers.lock().unwrap().push_back(answer);
    }

    /// Prompts shown so far.
    pub fn asked(&self) -> Vec<AskedPrompt> {
        self.asked.lock().unwrap().clone()
    }

    /// Answers not consumed yet.
    pub fn remaining(&self) -> usize {
        self.answers.lock().unwrap().len()
    }

    fn next_answer(&self) -> Result<ScriptedAnswer> {
        match self.answers.lock().unwrap().pop_front() {
            Some(answer) => Ok(answer),
            None => bail!("Unexpected prompt: script exhausted"),
        }
    }
}

impl UserPrompts for ScriptedPrompts {
    async fn quick_pick(&self, title: &str, items: &[PickItem]) -> Result<Option<usize>> {
        let labels: Vec<String> = items.iter().map(|item| item.label.clone()).collect();
        self.asked.lock().unwrap().push(AskedPrompt::Pick {
            title: title.to_string(),
            labels: labels.clone(),
        });

        match self.next_answer()? {
            ScriptedAnswer::Pick(label) => match labels.iter().position(|l| *l == label) {
                Some(index) => Ok(Some(index)),
                None => bail!("'{label}' is not one of {labels:?}"),
            },
            ScriptedAnswer::Accept => Ok(Some(0)),
            ScriptedAnswer::Cancel => Ok(None),
            ScriptedAnswer::Input(text) => bail!("Expected a pick answer, got input '{text}'"),
        }
    }

    async fn input_box(&self, request: &InputRequest) -> Result<Option<String>> {
        self.asked.lock().unwrap().push(AskedPrompt::Input(request.clone()));

        match self.next_answer()? {
            ScriptedAnswer::Input(text) => Ok(Some(text)),
            ScriptedAnswer::Accept => Ok(Some(request.value.clone().unwrap_or_default())),
            ScriptedAnswer::Cancel => Ok(None),
            ScriptedAnswer::Pick(label) => bail!("Expected an input answer, got pick '{label}'"),
        }
    }
}

/// Process runner replaying canned results and recording requests.
#[derive(Debug, Default)]
pub struct FakeProcessRunner {
    results: Mutex<VecDeque<std::result::Result<ProcessOutput, String>>>,
    requests: Mutex<Vec<ProcessRequest>>,
}

impl FakeProcessRunner {
    /// Runner with nothing queued; every run fails until results are pushed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a finished process.
    pub fn push_output(&self, output: ProcessOutput) {
        self.results.lock().unwrap().push_back(Ok(output));
    }

    /// Queue a successful process printing `stdout`.
    pub fn push_stdout(&self, stdout: &str) {
        self.push_output(ProcessOutput {
            code: Some(0),
            success: true,
            stdout: stdout.to_string(),
            ..ProcessOutput::default()
        });
    }

    /// Queue a spawn failure.
    pub fn push_error(&self, message: &str) {
        self.results.lock().unwrap().push_back(Err(message.to_string()));
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ProcessRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl ProcessRunner for FakeProcessRunner {
    async fn run(&self, request: &ProcessRequest) -> Result<ProcessOutput> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.results.lock().unwrap().pop_front();
        match next {
            Some(Ok(output)) => Ok(output),
            Some(Err(message)) => bail!(message),
            None => bail!("No scripted result for {}", request.display_command()),
        }
    }
}

/// Output sink that keeps everything it is given.
#[derive(Debug, Default)]
pub struct RecordingOutput {
    infos: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    terminal: Mutex<Vec<TerminalCommand>>,
}

impl RecordingOutput {
    /// Informational messages.
    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().unwrap().clone()
    }

    /// Warnings.
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }

    /// Errors.
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    /// Commands sent to the terminal.
    pub fn terminal_commands(&self) -> Vec<TerminalCommand> {
        self.terminal.lock().unwrap().clone()
    }
}

impl OutputSink for RecordingOutput {
    fn info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }

    fn warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    async fn send_to_terminal(&self, command: &TerminalCommand) -> Result<()> {
        self.terminal.lock().unwrap().push(command.clone());
        Ok(())
    }
}
