use serde::{Deserialize, Serialize};
use std::fmt;

/// Output categories in the order the trained model emits its scores.
///
/// The order is part of the model contract: index `i` of the score vector
/// belongs to `LABELS[i]`.
pub const LABELS: [ArtLabel; 2] = [ArtLabel::RealArt, ArtLabel::AiArt];

/// One of the two fixed classification labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtLabel {
    #[serde(rename = "Real Art")]
    RealArt,
    #[serde(rename = "AI Art")]
    AiArt,
}

impl ArtLabel {
    /// Label for a score index, if the index is inside the label set.
    pub fn from_index(index: usize) -> Option<Self> {
        LABELS.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            ArtLabel::RealArt => 0,
            ArtLabel::AiArt => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArtLabel::RealArt => "Real Art",
            ArtLabel::AiArt => "AI Art",
        }
    }

    pub fn is_human_made(self) -> bool {
        matches!(self, ArtLabel::RealArt)
    }

    pub fn badge(self) -> &'static str {
        match self {
            ArtLabel::RealArt => "🎨 Real Art",
            ArtLabel::AiArt => "🤖 AI Art",
        }
    }

    pub fn headline(self) -> &'static str {
        match self {
            ArtLabel::RealArt => "Human-Created Artwork",
            ArtLabel::AiArt => "AI-Generated Image",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ArtLabel::RealArt => {
                "This appears to be traditional artwork created by human hands, showing the unique characteristics of human creativity."
            }
            ArtLabel::AiArt => {
                "This image shows patterns typical of AI-generated content, with telltale signs of artificial creation."
            }
        }
    }
}

impl fmt::Display for ArtLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, Some(ArtLabel::RealArt))]
    #[case(1, Some(ArtLabel::AiArt))]
    #[case(2, None)]
    fn index_maps_to_label_order(#[case] index: usize, #[case] expected: Option<ArtLabel>) {
        assert_eq!(ArtLabel::from_index(index), expected);
    }

    #[test]
    fn index_round_trips_for_every_label() {
        for (i, label) in LABELS.iter().enumerate() {
            assert_eq!(label.index(), i);
        }
    }

    #[test]
    fn serializes_as_display_name() {
        let json = serde_json::to_string(&LABELS).unwrap();
        assert_eq!(json, r#"["Real Art","AI Art"]"#);
        let back: ArtLabel = serde_json::from_str(r#""AI Art""#).unwrap();
        assert_eq!(back, ArtLabel::AiArt);
    }

    #[test]
    fn only_real_art_counts_as_human_made() {
        assert!(ArtLabel::RealArt.is_human_made());
        assert!(!ArtLabel::AiArt.is_human_made());
    }
}
