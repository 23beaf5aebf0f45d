//! Generation state machine

use std::fmt;

use serde::{Deserialize, Serialize};

/// Phase of one report generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    NotStarted,
    /// Data sources are being initialized and queried
    SourcesInitializing,
    SourcesReady,
    /// The preparation pass is binding data onto elements
    Preparing,
    Prepared,
    /// The exporter is rendering the prepared template
    Exporting,
    Done,
    /// Absorbing failure state
    Faulted,
}

impl GenerationState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::SourcesInitializing => "sources_initializing",
            Self::SourcesReady => "sources_ready",
            Self::Preparing => "preparing",
            Self::Prepared => "prepared",
            Self::Exporting => "exporting",
            Self::Done => "done",
            Self::Faulted => "faulted",
        }
    }

    /// Check whether moving to `next` is a legal transition
    pub fn can_transition_to(&self, next: GenerationState) -> bool {
        use GenerationState::*;
        match (self, next) {
            (Done | Faulted, _) => false,
            (_, Faulted) => true,
            (NotStarted, SourcesInitializing)
            | (SourcesInitializing, SourcesReady)
            | (SourcesReady, Preparing)
            | (Preparing, Prepared)
            | (Prepared, Exporting)
            | (Exporting, Done) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Faulted)
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_is_linear() {
        use GenerationState::*;
        let path = [
            NotStarted,
            SourcesInitializing,
            SourcesReady,
            Preparing,
            Prepared,
            Exporting,
            Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(!NotStarted.can_transition_to(Preparing));
        assert!(!Prepared.can_transition_to(SourcesInitializing));
    }

    #[test]
    fn test_faulted_reachable_and_absorbing() {
        use GenerationState::*;
        for state in [NotStarted, SourcesInitializing, Preparing, Exporting] {
            assert!(state.can_transition_to(Faulted));
        }
        assert!(Faulted.is_terminal());
        assert!(!Faulted.can_transition_to(NotStarted));
        assert!(!Done.can_transition_to(Faulted));
    }
}
