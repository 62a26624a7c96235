//! Line commands understood by the REPL.

use iadess_types::{Realm, RealmParseError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Status,
    Balance,
    Realm(Realm),
    /// Set the working intent and show its cost.
    Intent(String),
    Heat,
    /// Strike with the given intent, or the working one when `None`.
    Strike(Option<String>),
    Infinity,
    Quench,
    List,
    /// Select by id, or by 1-based position in `list`.
    Select(String),
    Simulate,
    Chat(String),
    Speak(String),
    Voice(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    Unknown(String),
    MissingArgument(&'static str),
    Realm(RealmParseError),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Empty => f.write_str("empty command"),
            ParseError::Unknown(word) => write!(f, "unknown command `{word}` (try `help`)"),
            ParseError::MissingArgument(what) => write!(f, "missing {what}"),
            ParseError::Realm(err) => write!(f, "{err}"),
        }
    }
}

pub const HELP: &str = "\
commands:
  realm <name>     align the forge to a realm (PAGES, COMPONENTS, UI, ENTITIES,
                   LAYOUT, FUNCTIONS, INDEX, SRC)
  intent <text>    set the working intent and show its strike cost
  heat             raise forge heat
  strike [text]    strike with the given or working intent
  infinity         toggle infinity mode (transmutes an existing draft)
  quench           crystallize the draft into an artifact
  status           show the forge state
  balance          show the IQ-T balance
  list             list artifacts
  select <id|n>    select an artifact
  simulate         simulate the selected artifact
  chat <text>      talk to Iadess
  speak <text>     synthesize speech in the current voice
  voice <name>     choose a voice (Puck, Kore)
  quit             leave";

impl Command {
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let arg = |what| {
            if rest.is_empty() {
                Err(ParseError::MissingArgument(what))
            } else {
                Ok(rest.to_string())
            }
        };

        match word.to_ascii_lowercase().as_str() {
            "" => Err(ParseError::Empty),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            "status" => Ok(Command::Status),
            "balance" => Ok(Command::Balance),
            "realm" => Realm::parse(&arg("realm name")?)
                .map(Command::Realm)
                .map_err(ParseError::Realm),
            "intent" => arg("intent text").map(Command::Intent),
            "heat" => Ok(Command::Heat),
            "strike" => Ok(Command::Strike(arg("intent").ok())),
            "infinity" => Ok(Command::Infinity),
            "quench" => Ok(Command::Quench),
            "list" | "ls" => Ok(Command::List),
            "select" => arg("artifact id").map(Command::Select),
            "simulate" | "sim" => Ok(Command::Simulate),
            "chat" => arg("message").map(Command::Chat),
            "speak" => arg("text").map(Command::Speak),
            "voice" => arg("voice name").map(Command::Voice),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }
}
