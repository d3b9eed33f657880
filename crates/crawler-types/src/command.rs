//! Text command grammar.
//!
//! One datagram carries one command: a verb followed by whitespace-separated
//! arguments.
//!
//! | Datagram | [`Verb`] |
//! |---|---|
//! | `connect [nosound]` | [`Verb::Connect`] |
//! | `disconnect [nosound]` | [`Verb::Disconnect`] |
//! | `quit` | [`Verb::Quit`] |
//! | `startcam [nosound]` | [`Verb::StartCam`] |
//! | `stopcam [nosound]` | [`Verb::StopCam`] |
//! | `move forward\|backward\|left\|right` | [`Verb::Move`] |
//! | `speed <0-100>` | [`Verb::Speed`] |
//! | `step <12 integers>` | [`Verb::Step`] |
//!
//! Parsing happens in two steps.  [`Command::parse`] only tokenises, so the
//! dispatcher can check who sent a datagram before it looks at the argument
//! shape; [`Command::verb`] then validates the arguments.

use crate::{CommandError, Direction, LEG_COUNT, StepVector};

/// Token that suppresses the confirmation chime of a session command.
pub const NOSOUND: &str = "nosound";

/// A tokenised datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    raw: String,
    verb: String,
    args: Vec<String>,
}

/// A fully validated command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// `sound` is `Some(false)` when the `nosound` token was present and
    /// `None` when the configured default applies.
    Connect { sound: Option<bool> },
    Disconnect { sound: Option<bool> },
    Quit,
    StartCam { sound: Option<bool> },
    StopCam { sound: Option<bool> },
    Move(Direction),
    Speed(u8),
    Step(StepVector),
}

impl Command {
    /// Tokenise `raw` on whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Malformed`] for an empty or blank datagram.
    pub fn parse(raw: &str) -> Result<Self, CommandError> {
        let mut tokens = raw.split_whitespace().map(str::to_string);
        let verb = tokens
            .next()
            .ok_or_else(|| CommandError::malformed(raw, "empty datagram"))?;
        Ok(Self {
            raw: raw.trim().to_string(),
            verb,
            args: tokens.collect(),
        })
    }

    /// The first token.
    pub fn verb_token(&self) -> &str {
        &self.verb
    }

    /// Every token after the verb.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The trimmed datagram text.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// `true` for `connect`, the only verb honoured while unconnected.
    pub fn is_connect(&self) -> bool {
        self.verb == "connect"
    }

    /// `Some(false)` if the last token is `nosound`.
    pub fn sound_override(&self) -> Option<bool> {
        match self.args.last() {
            Some(token) if token == NOSOUND => Some(false),
            _ => None,
        }
    }

    /// Validate the arguments and resolve the [`Verb`].
    ///
    /// # Errors
    ///
    /// - [`CommandError::UnknownVerb`] when the first token is not part of the
    ///   grammar.
    /// - [`CommandError::Malformed`] when the arguments do not fit the verb.
    pub fn verb(&self) -> Result<Verb, CommandError> {
        match self.verb.as_str() {
            "connect" => Ok(Verb::Connect {
                sound: self.sound_override(),
            }),
            "disconnect" => Ok(Verb::Disconnect {
                sound: self.sound_override(),
            }),
            "startcam" => Ok(Verb::StartCam {
                sound: self.sound_override(),
            }),
            "stopcam" => Ok(Verb::StopCam {
                sound: self.sound_override(),
            }),
            "quit" => {
                if self.args.is_empty() {
                    Ok(Verb::Quit)
                } else {
                    Err(self.malformed("quit takes no arguments"))
                }
            }
            "move" => self.parse_move(),
            "speed" => self.parse_speed(),
            "step" => self.parse_step(),
            other => Err(CommandError::UnknownVerb(other.to_string())),
        }
    }

    fn parse_move(&self) -> Result<Verb, CommandError> {
        match self.args.as_slice() {
            [token] => Direction::from_token(token)
                .map(Verb::Move)
                .ok_or_else(|| self.malformed(format!("unknown direction `{token}`"))),
            _ => Err(self.malformed("expected exactly one direction")),
        }
    }

    fn parse_speed(&self) -> Result<Verb, CommandError> {
        let [token] = self.args.as_slice() else {
            return Err(self.malformed("expected exactly one speed value"));
        };
        match token.parse::<u8>() {
            Ok(speed) if speed <= 100 => Ok(Verb::Speed(speed)),
            _ => Err(self.malformed(format!("speed `{token}` is not an integer in 0..=100"))),
        }
    }

    fn parse_step(&self) -> Result<Verb, CommandError> {
        let expected = LEG_COUNT * 3;
        if self.args.len() != expected {
            return Err(self.malformed(format!(
                "expected {expected} coordinates, got {}",
                self.args.len()
            )));
        }
        let mut values = Vec::with_capacity(expected);
        for token in &self.args {
            let value = token
                .parse::<i32>()
                .map_err(|_| self.malformed(format!("`{token}` is not an integer")))?;
            values.push(value);
        }
        StepVector::from_flat(&values)
            .map(Verb::Step)
            .ok_or_else(|| self.malformed("invalid step vector"))
    }

    fn malformed(&self, reason: impl Into<String>) -> CommandError {
        CommandError::malformed(&self.raw, reason)
    }
}
