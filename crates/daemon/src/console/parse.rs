// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Console command grammar.
//!
//! Keywords are case-insensitive; values keep their case. Whitespace around
//! `=` is optional. Anything left over after a complete command is a syntax
//! error.

use dbsrv_core::{ConfigParam, ConfigPart, ConnectionId, ParamScope};

use super::ConsoleError;

/// Where `DISPLAY` output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Reply,
    /// `TO LOG`: reply and write to the log.
    ReplyAndLog,
    /// `TO LOG ONLY`
    LogOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSelection {
    All,
    Part(ConfigPart),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayTarget {
    ServerStatus,
    ServerLevel,
    Worker(ConnectionId),
    WorkerKey(String),
    WorkerAll { in_call_only: bool },
    WorkerShort,
    Configuration(ConfigSelection),
    Filenames,
    #[cfg(feature = "dev-commands")]
    LeadItem,
    #[cfg(feature = "dev-commands")]
    WorkerDump(ConnectionId),
}

/// Per-worker values settable with `SET CLIENT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientSetting {
    TraceFile,
    Debug,
    ReceiveTimeout,
    FetchBlockSize,
}

impl ClientSetting {
    pub fn keyword(self) -> &'static str {
        match self {
            ClientSetting::TraceFile => "TRACE FILE",
            ClientSetting::Debug => "DEBUG",
            ClientSetting::ReceiveTimeout => "RECEIVE TIMEOUT",
            ClientSetting::FetchBlockSize => "FETCH BLOCK SIZE",
        }
    }

    fn lookup(words: &str) -> Option<Self> {
        [
            ClientSetting::TraceFile,
            ClientSetting::Debug,
            ClientSetting::ReceiveTimeout,
            ClientSetting::FetchBlockSize,
        ]
        .into_iter()
        .find(|s| s.keyword() == words)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Display {
        target: DisplayTarget,
        route: Route,
    },
    Set {
        param: ConfigParam,
        value: String,
    },
    SetClient {
        id: ConnectionId,
        setting: ClientSetting,
        value: String,
    },
    ClearServerCounts,
    Help,
}

/// Parse one command line.
pub fn parse(line: &str) -> Result<Command, ConsoleError> {
    let spaced = line.replace('=', " = ");
    let mut tokens = Tokens::new(spaced.split_whitespace().collect());

    let verb = tokens
        .next_keyword()
        .ok_or_else(|| ConsoleError::Syntax("empty command".to_string()))?;
    let command = match verb.as_str() {
        "DISPLAY" => parse_display(&mut tokens)?,
        "SET" => parse_set(&mut tokens)?,
        "CLEAR" => {
            tokens.expect("SERVER")?;
            tokens.expect("COUNTS")?;
            Command::ClearServerCounts
        }
        "HELP" => Command::Help,
        other => return Err(ConsoleError::Syntax(format!("unknown command {other}"))),
    };
    tokens.finish()?;
    Ok(command)
}

fn parse_display(tokens: &mut Tokens<'_>) -> Result<Command, ConsoleError> {
    let object = tokens.required_keyword("SERVER, WORKER, CONFIGURATION or FILENAMES")?;
    let target = match object.as_str() {
        "SERVER" => match tokens.required_keyword("STATUS or LEVEL")?.as_str() {
            "STATUS" => DisplayTarget::ServerStatus,
            "LEVEL" => DisplayTarget::ServerLevel,
            other => return Err(unexpected(other)),
        },
        "WORKER" => parse_display_worker(tokens)?,
        "CONFIG" | "CONFIGURATION" => DisplayTarget::Configuration(parse_selection(tokens)?),
        "FILENAMES" => DisplayTarget::Filenames,
        #[cfg(feature = "dev-commands")]
        "LEAD" => {
            tokens.expect("ITEM")?;
            DisplayTarget::LeadItem
        }
        other => return Err(unexpected(other)),
    };
    let route = parse_route(tokens)?;
    Ok(Command::Display { target, route })
}

fn parse_display_worker(tokens: &mut Tokens<'_>) -> Result<DisplayTarget, ConsoleError> {
    let word = tokens
        .word()
        .ok_or_else(|| ConsoleError::Syntax("expected a connection id".to_string()))?;
    Ok(match word.to_ascii_uppercase().as_str() {
        "KEY" => {
            let key = tokens
                .word()
                .ok_or_else(|| ConsoleError::Syntax("expected a key".to_string()))?;
            DisplayTarget::WorkerKey(key.to_string())
        }
        "ALL" => {
            let in_call_only = tokens.accept("IN");
            if in_call_only {
                tokens.expect("CALL")?;
            }
            DisplayTarget::WorkerAll { in_call_only }
        }
        "SHORT" => DisplayTarget::WorkerShort,
        #[cfg(feature = "dev-commands")]
        "DUMP" => {
            let id = tokens
                .word()
                .ok_or_else(|| ConsoleError::Syntax("expected a connection id".to_string()))?;
            DisplayTarget::WorkerDump(parse_connection_id(id)?)
        }
        _ => DisplayTarget::Worker(parse_connection_id(word)?),
    })
}

fn parse_selection(tokens: &mut Tokens<'_>) -> Result<ConfigSelection, ConsoleError> {
    if tokens.accept("ALL") {
        return Ok(ConfigSelection::All);
    }
    if !tokens.accept("PART") {
        return Ok(ConfigSelection::All);
    }
    match tokens.word() {
        Some("1") => Ok(ConfigSelection::Part(ConfigPart::Part1)),
        Some("2") => Ok(ConfigSelection::Part(ConfigPart::Part2)),
        Some(other) => Err(unexpected(other)),
        None => Err(ConsoleError::Syntax("expected PART 1 or PART 2".to_string())),
    }
}

fn parse_route(tokens: &mut Tokens<'_>) -> Result<Route, ConsoleError> {
    if !tokens.accept("TO") {
        return Ok(Route::Reply);
    }
    tokens.expect("LOG")?;
    if tokens.accept("ONLY") {
        Ok(Route::LogOnly)
    } else {
        Ok(Route::ReplyAndLog)
    }
}

fn parse_set(tokens: &mut Tokens<'_>) -> Result<Command, ConsoleError> {
    // `CLIENT RECEIVE TIMEOUT` is a server parameter; `SET CLIENT` needs an id.
    let targets_client = tokens.peek().is_some_and(|w| w.eq_ignore_ascii_case("CLIENT"))
        && tokens
            .peek_nth(1)
            .is_some_and(|w| w == "*" || w.bytes().all(|b| b.is_ascii_digit()));
    if targets_client {
        tokens.pos += 1;
        let id = tokens
            .word()
            .ok_or_else(|| ConsoleError::Syntax("expected a connection id".to_string()))?;
        let id = parse_connection_id(id)?;
        let (words, value) = tokens.assignment()?;
        let setting = ClientSetting::lookup(&words)
            .ok_or_else(|| ConsoleError::Syntax(format!("unknown client setting {words}")))?;
        return Ok(Command::SetClient { id, setting, value });
    }

    let scope = if tokens.accept("TRANSPORT") {
        ParamScope::Transport
    } else {
        ParamScope::Server
    };
    let (words, value) = tokens.assignment()?;
    let param = match scope {
        ParamScope::Transport => ConfigParam::lookup(ParamScope::Transport, &words),
        _ => lookup_server_param(&words),
    }
    .ok_or_else(|| ConsoleError::Syntax(format!("unknown parameter {words}")))?;
    Ok(Command::Set { param, value })
}

/// `SERVER` is an optional scope keyword but also begins some parameter
/// names, so the full words are tried before the stripped ones.
fn lookup_server_param(words: &str) -> Option<ConfigParam> {
    let find = |w: &str| {
        ConfigParam::lookup(ParamScope::Server, w)
            .or_else(|| ConfigParam::lookup(ParamScope::Console, w))
    };
    find(words).or_else(|| words.strip_prefix("SERVER ").and_then(find))
}

fn parse_connection_id(token: &str) -> Result<ConnectionId, ConsoleError> {
    if token == "*" {
        return Ok(ConnectionId::FIRST_ASSIGNED);
    }
    token
        .parse::<u32>()
        .map(ConnectionId)
        .map_err(|_| ConsoleError::Syntax(format!("invalid connection id {token}")))
}

fn unexpected(word: &str) -> ConsoleError {
    ConsoleError::Syntax(format!("unexpected {word}"))
}

struct Tokens<'a> {
    words: Vec<&'a str>,
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(words: Vec<&'a str>) -> Self {
        Self { words, pos: 0 }
    }

    fn peek(&self) -> Option<&'a str> {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> Option<&'a str> {
        self.words.get(self.pos + n).copied()
    }

    fn word(&mut self) -> Option<&'a str> {
        let word = self.peek()?;
        self.pos += 1;
        Some(word)
    }

    fn next_keyword(&mut self) -> Option<String> {
        self.word().map(str::to_ascii_uppercase)
    }

    fn required_keyword(&mut self, wanted: &str) -> Result<String, ConsoleError> {
        self.next_keyword()
            .ok_or_else(|| ConsoleError::Syntax(format!("expected {wanted}")))
    }

    /// Consume `keyword` if it is next.
    fn accept(&mut self, keyword: &str) -> bool {
        let hit = self
            .peek()
            .is_some_and(|w| w.eq_ignore_ascii_case(keyword));
        if hit {
            self.pos += 1;
        }
        hit
    }

    fn expect(&mut self, keyword: &str) -> Result<(), ConsoleError> {
        if self.accept(keyword) {
            Ok(())
        } else {
            Err(ConsoleError::Syntax(match self.peek() {
                Some(word) => format!("expected {keyword}, found {word}"),
                None => format!("expected {keyword}"),
            }))
        }
    }

    /// `<words> = <value>`: upper-cased, single-spaced name and the raw value.
    fn assignment(&mut self) -> Result<(String, String), ConsoleError> {
        let mut name = Vec::new();
        loop {
            match self.word() {
                Some("=") => break,
                Some(word) => name.push(word.to_ascii_uppercase()),
                None => return Err(ConsoleError::Syntax("expected <name>=<value>".to_string())),
            }
        }
        if name.is_empty() {
            return Err(ConsoleError::Syntax("missing parameter name".to_string()));
        }
        let value = self
            .word()
            .filter(|v| *v != "=")
            .ok_or_else(|| ConsoleError::Syntax("missing value".to_string()))?;
        Ok((name.join(" "), value.to_string()))
    }

    fn finish(&self) -> Result<(), ConsoleError> {
        match self.words.get(self.pos..) {
            Some(rest) if !rest.is_empty() => Err(ConsoleError::Syntax(format!(
                "unexpected trailing input: {}",
                rest.join(" ")
            ))),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
