//! Player gestures and their key bindings.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gesture {
    /// Climb to the next level (Enter).
    Advance,
    /// Record a failure on the current level (Z).
    Fail,
}

impl Gesture {
    /// Map a key name as reported by the input device.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "Enter" | "enter" | "\n" | "\r" => Some(Self::Advance),
            "z" | "Z" => Some(Self::Fail),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_gestures() {
        assert_eq!(Gesture::from_key("Enter"), Some(Gesture::Advance));
        assert_eq!(Gesture::from_key("z"), Some(Gesture::Fail));
        assert_eq!(Gesture::from_key("Z"), Some(Gesture::Fail));
        assert_eq!(Gesture::from_key("x"), None);
    }
}
