//! Ordered steps of the post-upgrade verification.

use std::fmt;

/// One state of the verifier. Each step is a precondition for the next and
/// no step is entered twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerifierStep {
    /// Every node reports the target `min_observer_version`.
    VersionCheck,
    /// The upgrade self-inspection has no unfinished items.
    InspectionCheck,
    /// `enable_ddl` is on everywhere.
    EnableDdl,
    /// `enable_rebalance` is on everywhere.
    EnableRebalance,
    /// `enable_rereplication` is on everywhere.
    EnableRereplication,
    /// `enable_major_freeze` is on everywhere.
    EnableMajorCompaction,
    /// Terminal state.
    Done,
}

impl VerifierStep {
    /// All steps in execution order, `Done` last.
    pub const ORDER: [Self; 7] = [
        Self::VersionCheck,
        Self::InspectionCheck,
        Self::EnableDdl,
        Self::EnableRebalance,
        Self::EnableRereplication,
        Self::EnableMajorCompaction,
        Self::Done,
    ];

    /// The step that follows this one. `Done` is absorbing.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::VersionCheck => Self::InspectionCheck,
            Self::InspectionCheck => Self::EnableDdl,
            Self::EnableDdl => Self::EnableRebalance,
            Self::EnableRebalance => Self::EnableRereplication,
            Self::EnableRereplication => Self::EnableMajorCompaction,
            Self::EnableMajorCompaction | Self::Done => Self::Done,
        }
    }

    /// Stable name used in log lines.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::VersionCheck => "version_check",
            Self::InspectionCheck => "inspection_check",
            Self::EnableDdl => "enable_ddl",
            Self::EnableRebalance => "enable_rebalance",
            Self::EnableRereplication => "enable_rereplication",
            Self::EnableMajorCompaction => "enable_major_compaction",
            Self::Done => "done",
        }
    }

    /// Cluster switch toggled by this step, if it is an enable step.
    #[must_use]
    pub const fn switch(self) -> Option<&'static str> {
        match self {
            Self::EnableDdl => Some("enable_ddl"),
            Self::EnableRebalance => Some("enable_rebalance"),
            Self::EnableRereplication => Some("enable_rereplication"),
            Self::EnableMajorCompaction => Some("enable_major_freeze"),
            Self::VersionCheck | Self::InspectionCheck | Self::Done => None,
        }
    }
}

impl fmt::Display for VerifierStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_follows_order() {
        for pair in VerifierStep::ORDER.windows(2) {
            let [from, to] = pair else {
                unreachable!("windows(2)");
            };
            assert_eq!(from.next(), *to);
        }
    }

    #[test]
    fn done_is_absorbing() {
        assert_eq!(VerifierStep::Done.next(), VerifierStep::Done);
    }

    #[test]
    fn only_enable_steps_have_switches() {
        let switches: Vec<_> = VerifierStep::ORDER
            .iter()
            .filter_map(|s| s.switch())
            .collect();
        assert_eq!(
            switches,
            vec![
                "enable_ddl",
                "enable_rebalance",
                "enable_rereplication",
                "enable_major_freeze"
            ]
        );
    }

    #[test]
    fn display_uses_name() {
        assert_eq!(VerifierStep::EnableMajorCompaction.to_string(), "enable_major_compaction");
    }
}
