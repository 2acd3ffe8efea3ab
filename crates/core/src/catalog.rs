//! Command Catalog
//!
//! The fixed, weighted list of spoken commands and the pose each one expects.
//! Selection is a cumulative-weight walk over a uniform draw.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A pose class produced by the browser-side classifier.
///
/// The classifier's own class names are accepted as aliases so raw
/// predictions can be forwarded without translation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PoseLabel {
    #[serde(alias = "기본")]
    Neutral,
    #[serde(alias = "왼손 올리기")]
    LeftRaised,
    #[serde(alias = "오른손 올리기")]
    RightRaised,
    #[serde(alias = "양손 올리기")]
    BothRaised,
}

impl PoseLabel {
    /// The class name the pose model was trained with.
    pub fn class_name(&self) -> &'static str {
        match self {
            PoseLabel::Neutral => "기본",
            PoseLabel::LeftRaised => "왼손 올리기",
            PoseLabel::RightRaised => "오른손 올리기",
            PoseLabel::BothRaised => "양손 올리기",
        }
    }
}

impl fmt::Display for PoseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoseLabel::Neutral => write!(f, "neutral"),
            PoseLabel::LeftRaised => write!(f, "left_raised"),
            PoseLabel::RightRaised => write!(f, "right_raised"),
            PoseLabel::BothRaised => write!(f, "both_raised"),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Unknown pose label: {0}")]
pub struct UnknownPose(pub String);

impl FromStr for PoseLabel {
    type Err = UnknownPose;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "neutral" | "기본" => Ok(PoseLabel::Neutral),
            "left_raised" | "왼손 올리기" => Ok(PoseLabel::LeftRaised),
            "right_raised" | "오른손 올리기" => Ok(PoseLabel::RightRaised),
            "both_raised" | "양손 올리기" => Ok(PoseLabel::BothRaised),
            other => Err(UnknownPose(other.to_string())),
        }
    }
}

/// How a command is judged.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Resolved as soon as the expected pose shows up; timing out fails.
    Raise,
    /// Judged only at timeout: succeeds if no non-neutral pose was seen.
    Hold,
}

/// A single spoken command.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FlagCommand {
    pub text: String,
    pub expected_pose: PoseLabel,
    pub kind: CommandKind,
    pub weight: u32,
}

impl FlagCommand {
    pub fn new(text: impl Into<String>, expected_pose: PoseLabel, kind: CommandKind, weight: u32) -> Self {
        Self {
            text: text.into(),
            expected_pose,
            kind,
            weight,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("A command catalog needs at least one command")]
    Empty,
    #[error("Command '{0}' has a zero weight")]
    ZeroWeight(String),
}

/// An ordered, validated list of weighted commands.
#[derive(Debug, Clone)]
pub struct Catalog {
    commands: Vec<FlagCommand>,
    total_weight: u64,
}

impl Catalog {
    /// Builds a catalog from a custom command list.
    pub fn new(commands: Vec<FlagCommand>) -> Result<Self, CatalogError> {
        if commands.is_empty() {
            return Err(CatalogError::Empty);
        }
        if let Some(cmd) = commands.iter().find(|c| c.weight == 0) {
            return Err(CatalogError::ZeroWeight(cmd.text.clone()));
        }
        let total_weight = commands.iter().map(|c| u64::from(c.weight)).sum();
        Ok(Self {
            commands,
            total_weight,
        })
    }

    /// The six commands of the blue flag / white flag game.
    pub fn standard() -> Self {
        use CommandKind::{Hold, Raise};
        use PoseLabel::*;

        let commands = vec![
            FlagCommand::new("청기 올려", LeftRaised, Raise, 35),
            FlagCommand::new("백기 올려", RightRaised, Raise, 35),
            FlagCommand::new("둘 다 올려", BothRaised, Raise, 15),
            FlagCommand::new("청기 올리지 마", Neutral, Hold, 5),
            FlagCommand::new("백기 올리지 마", Neutral, Hold, 5),
            FlagCommand::new("둘 다 올리지 마", Neutral, Hold, 5),
        ];
        let total_weight = commands.iter().map(|c| u64::from(c.weight)).sum();
        Self {
            commands,
            total_weight,
        }
    }

    pub fn commands(&self) -> &[FlagCommand] {
        &self.commands
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Draws a command with probability proportional to its weight.
    pub fn select_weighted<R: Rng + ?Sized>(&self, rng: &mut R) -> &FlagCommand {
        let draw = rng.random::<f64>() * self.total_weight as f64;
        self.pick(draw)
    }

    /// Walks the cumulative weights and returns the first command whose
    /// running total exceeds `draw`. Falls back to the first entry when
    /// rounding leaves the draw at or past the total.
    pub fn pick(&self, draw: f64) -> &FlagCommand {
        let mut cumulative = 0.0;
        for command in &self.commands {
            cumulative += f64::from(command.weight);
            if draw < cumulative {
                return command;
            }
        }
        &self.commands[0]
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}
