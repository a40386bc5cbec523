//! Line commands read from stdin.
//!
//! Plain lines replace the input text. Lines starting with `:` are commands.

use std::str::FromStr;
use suggest_core::NavKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Replace the input text.
    Input(String),
    Key(NavKey),
    Focus,
    Blur,
    /// Pointer-down on the item at the given index.
    Pick(usize),
    /// Programmatically set the input text.
    Set(String),
    Clear,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let Some(rest) = line.strip_prefix(':') else {
            return Ok(Command::Input(line.to_string()));
        };

        let (name, arg) = match rest.split_once(' ') {
            Some((name, arg)) => (name, Some(arg)),
            None => (rest, None),
        };

        match (name, arg) {
            ("focus", None) => Ok(Command::Focus),
            ("blur", None) => Ok(Command::Blur),
            ("clear", None) => Ok(Command::Clear),
            ("help", None) => Ok(Command::Help),
            ("q" | "quit", None) => Ok(Command::Quit),
            ("pick", Some(arg)) => arg
                .trim()
                .parse()
                .map(Command::Pick)
                .map_err(|_| format!("Invalid index: {}", arg)),
            ("set", arg) => Ok(Command::Set(arg.unwrap_or_default().to_string())),
            (key, None) => key.parse().map(Command::Key),
            (name, Some(_)) => Err(format!("Unexpected argument for :{}", name)),
        }
    }
}

pub const HELP: &str = "\
text          replace the input text
:down :up     move the highlight
:enter :esc   commit or dismiss
:pick N       click item N
:focus :blur  move focus
:set TEXT     set the input text without fetching
:clear        clear the input
:quit         exit";
