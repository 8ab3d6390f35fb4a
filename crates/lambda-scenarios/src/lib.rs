//! Scenario registry and selection.
//!
//! A scenario names one handler behavior under test. Which scenario is enabled is
//! configuration: callers build a [`ScenarioSelection`] once (from a CLI flag or an
//! environment value read at the edge) and pass it into whatever runs cases.

use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scenario {
    Echo,
    ListRegions,
}

impl Scenario {
    pub const ALL: [Scenario; 2] = [Scenario::Echo, Scenario::ListRegions];

    pub fn as_str(self) -> &'static str {
        match self {
            Scenario::Echo => "echo",
            Scenario::ListRegions => "list-regions",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "echo" => Some(Scenario::Echo),
            "list-regions" | "list_regions" | "ec2-regions" | "ec2_regions" => {
                Some(Scenario::ListRegions)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid scenario {value:?} (expected one of: echo, list-regions)")]
pub struct ScenarioParseError {
    value: String,
}

impl FromStr for Scenario {
    type Err = ScenarioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::parse(s).ok_or_else(|| ScenarioParseError {
            value: s.trim().to_string(),
        })
    }
}

#[cfg(feature = "clap")]
impl clap::ValueEnum for Scenario {
    fn value_variants<'a>() -> &'a [Self] {
        &Scenario::ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Scenario::Echo => Some(clap::builder::PossibleValue::new("echo")),
            Scenario::ListRegions => Some(
                clap::builder::PossibleValue::new("list-regions")
                    .alias("list_regions")
                    .alias("ec2-regions")
                    .alias("ec2_regions"),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No selector was configured at all.
    Unset,
    /// A selector was configured but names a different (or unknown) scenario.
    Mismatch { selected: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unset => f.write_str("no scenario selected"),
            SkipReason::Mismatch { selected } => write!(f, "scenario {selected:?} selected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Run,
    Skip(SkipReason),
}

impl Decision {
    pub fn is_run(&self) -> bool {
        matches!(self, Decision::Run)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("no scenario selected")]
    Missing,
    #[error(transparent)]
    Unknown(#[from] ScenarioParseError),
}

/// The externally configured scenario selector.
///
/// An absent selector and a selector naming some other scenario are treated the
/// same way: the case is skipped, never failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioSelection {
    selector: Option<String>,
}

impl ScenarioSelection {
    pub fn none() -> Self {
        Self { selector: None }
    }

    pub fn only(scenario: Scenario) -> Self {
        Self {
            selector: Some(scenario.as_str().to_string()),
        }
    }

    /// Builds a selection from a raw selector value. Blank values count as unset.
    pub fn from_selector(raw: Option<&str>) -> Self {
        let selector = raw
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Self { selector }
    }

    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref()
    }

    pub fn decide(&self, scenario: Scenario) -> Decision {
        let Some(selected) = self.selector.as_deref() else {
            return Decision::Skip(SkipReason::Unset);
        };
        if Scenario::parse(selected) == Some(scenario) {
            Decision::Run
        } else {
            Decision::Skip(SkipReason::Mismatch {
                selected: selected.to_string(),
            })
        }
    }

    /// Strict form for callers that treat a missing selector as a configuration error.
    pub fn require(&self) -> Result<Scenario, SelectionError> {
        let selected = self.selector.as_deref().ok_or(SelectionError::Missing)?;
        Ok(selected.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_parse() {
        for s in Scenario::ALL {
            assert_eq!(Scenario::parse(s.as_str()), Some(s));
            assert_eq!(s.as_str().parse::<Scenario>(), Ok(s));
        }
    }

    #[test]
    fn legacy_region_selector_is_accepted() {
        assert_eq!(Scenario::parse("ec2_regions"), Some(Scenario::ListRegions));
        assert_eq!(Scenario::parse(" ec2-regions "), Some(Scenario::ListRegions));
    }

    #[test]
    fn absent_and_mismatched_selectors_both_skip() {
        let unset = ScenarioSelection::from_selector(None);
        assert_eq!(unset.decide(Scenario::Echo), Decision::Skip(SkipReason::Unset));

        let blank = ScenarioSelection::from_selector(Some("   "));
        assert_eq!(blank, unset);

        let other = ScenarioSelection::only(Scenario::ListRegions);
        assert_eq!(
            other.decide(Scenario::Echo),
            Decision::Skip(SkipReason::Mismatch {
                selected: "list-regions".to_string()
            })
        );

        let unknown = ScenarioSelection::from_selector(Some("nope"));
        assert!(!unknown.decide(Scenario::Echo).is_run());
        assert!(!unknown.decide(Scenario::ListRegions).is_run());
    }

    #[test]
    fn matching_selector_runs() {
        let sel = ScenarioSelection::from_selector(Some("echo"));
        assert!(sel.decide(Scenario::Echo).is_run());
        assert!(!sel.decide(Scenario::ListRegions).is_run());
    }

    #[test]
    fn require_distinguishes_missing_from_unknown() {
        assert_eq!(
            ScenarioSelection::none().require(),
            Err(SelectionError::Missing)
        );
        assert!(matches!(
            ScenarioSelection::from_selector(Some("nope")).require(),
            Err(SelectionError::Unknown(_))
        ));
        assert_eq!(
            ScenarioSelection::from_selector(Some("ec2_regions")).require(),
            Ok(Scenario::ListRegions)
        );
    }
}
