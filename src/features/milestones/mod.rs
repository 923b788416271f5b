//! # Feature: Milestone Tests
//!
//! The closed set of developmental milestone tests a parent can run on a child profile.
//! Wire names are camelCase and appear in reminder metadata, storage and the outcome catalog.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

use serde::{Deserialize, Serialize};

/// Identifier of a milestone test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TestId {
    PupilResponse,
    FallingToy,
    LetsCrawl,
    PointFollowing,
    Hearing,
    CrossingEyes,
    AttentionAtDistance,
    Symmetry,
    PincerGrasp,
    PartiallyCoveredToy,
    CompletelyCoveredToy,
    SelfRecognition,
    SocialSmiling,
    FacialMimic,
    UnassistedSitting,
    ReachingWhileSitting,
    PlasticJar,
    ReceptiveLanguage,
}

impl TestId {
    pub const ALL: [TestId; 18] = [
        TestId::PupilResponse,
        TestId::FallingToy,
        TestId::LetsCrawl,
        TestId::PointFollowing,
        TestId::Hearing,
        TestId::CrossingEyes,
        TestId::AttentionAtDistance,
        TestId::Symmetry,
        TestId::PincerGrasp,
        TestId::PartiallyCoveredToy,
        TestId::CompletelyCoveredToy,
        TestId::SelfRecognition,
        TestId::SocialSmiling,
        TestId::FacialMimic,
        TestId::UnassistedSitting,
        TestId::ReachingWhileSitting,
        TestId::PlasticJar,
        TestId::ReceptiveLanguage,
    ];

    /// Wire name, as stored in reminder metadata and the profile store
    pub fn as_str(&self) -> &'static str {
        match self {
            TestId::PupilResponse => "pupilResponse",
            TestId::FallingToy => "fallingToy",
            TestId::LetsCrawl => "letsCrawl",
            TestId::PointFollowing => "pointFollowing",
            TestId::Hearing => "hearing",
            TestId::CrossingEyes => "crossingEyes",
            TestId::AttentionAtDistance => "attentionAtDistance",
            TestId::Symmetry => "symmetry",
            TestId::PincerGrasp => "pincerGrasp",
            TestId::PartiallyCoveredToy => "partiallyCoveredToy",
            TestId::CompletelyCoveredToy => "completelyCoveredToy",
            TestId::SelfRecognition => "selfRecognition",
            TestId::SocialSmiling => "socialSmiling",
            TestId::FacialMimic => "facialMimic",
            TestId::UnassistedSitting => "unassistedSitting",
            TestId::ReachingWhileSitting => "reachingWhileSitting",
            TestId::PlasticJar => "plasticJar",
            TestId::ReceptiveLanguage => "receptiveLanguage",
        }
    }

    /// Name shown to parents in reminder and confirmation copy
    pub fn display_name(&self) -> &'static str {
        match self {
            TestId::PupilResponse => "Pupil Response",
            TestId::FallingToy => "Falling Toy",
            TestId::LetsCrawl => "Let's Crawl",
            TestId::PointFollowing => "Point Following",
            TestId::Hearing => "Hearing",
            TestId::CrossingEyes => "Crossing Eyes",
            TestId::AttentionAtDistance => "Attention at Distance",
            TestId::Symmetry => "Symmetry",
            TestId::PincerGrasp => "Pincer Grasp",
            TestId::PartiallyCoveredToy => "Partially Covered Toy",
            TestId::CompletelyCoveredToy => "Completely Covered Toy",
            TestId::SelfRecognition => "Self Recognition",
            TestId::SocialSmiling => "Social Smiling",
            TestId::FacialMimic => "Facial Mimic",
            TestId::UnassistedSitting => "Unassisted Sitting",
            TestId::ReachingWhileSitting => "Reaching While Sitting",
            TestId::PlasticJar => "Plastic Jar",
            TestId::ReceptiveLanguage => "Receptive Language",
        }
    }
}

impl std::fmt::Display for TestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TestId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        TestId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown test id: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip() {
        for id in TestId::ALL {
            assert_eq!(id.as_str().parse::<TestId>().unwrap(), id);
        }
    }

    #[test]
    fn test_serde_matches_wire_name() {
        assert_eq!(
            serde_json::to_string(&TestId::PincerGrasp).unwrap(),
            "\"pincerGrasp\""
        );
        let parsed: TestId = serde_json::from_str("\"selfRecognition\"").unwrap();
        assert_eq!(parsed, TestId::SelfRecognition);
    }

    #[test]
    fn test_unknown_test_id() {
        assert!("unknownTest".parse::<TestId>().is_err());
        assert!("PincerGrasp".parse::<TestId>().is_err());
        assert!("".parse::<TestId>().is_err());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(TestId::LetsCrawl.display_name(), "Let's Crawl");
        assert_eq!(TestId::FacialMimic.to_string(), "facialMimic");
    }
}
