use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four meeting states the bulb can signal, each bound to a hue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    /// Red: the user joined a meeting.
    Joined,
    /// Green: nothing going on.
    Free,
    /// Blue: a meeting starts soon.
    Upcoming,
    /// Purple: a meeting is running and the user has not joined.
    Ongoing,
}

impl StatusColor {
    pub const ALL: [StatusColor; 4] = [
        StatusColor::Joined,
        StatusColor::Free,
        StatusColor::Upcoming,
        StatusColor::Ongoing,
    ];

    pub fn hue(&self) -> u16 {
        match self {
            StatusColor::Joined => 0,
            StatusColor::Free => 120,
            StatusColor::Upcoming => 240,
            StatusColor::Ongoing => 300,
        }
    }

    /// Maps an observed hue back to a status; any other hue is a manual color.
    pub fn from_hue(hue: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.hue() == hue)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusColor::Joined => "joined",
            StatusColor::Free => "free",
            StatusColor::Upcoming => "upcoming",
            StatusColor::Ongoing => "ongoing",
        }
    }
}

impl fmt::Display for StatusColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "joined" | "in" | "red" => Ok(StatusColor::Joined),
            "free" | "out" | "green" => Ok(StatusColor::Free),
            "upcoming" | "blue" => Ok(StatusColor::Upcoming),
            "ongoing" | "purple" => Ok(StatusColor::Ongoing),
            _ => Err(format!(
                "Invalid color '{}'. Valid options: joined, free, upcoming, ongoing",
                s
            )),
        }
    }
}
