use thiserror::Error;

/// Broken authored content. These never come from normal play: they mean a
/// dialogue or quest file references something that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    #[error("node '{from}' points option '{key}' at unknown node '{target}'")]
    UnknownTarget {
        from: String,
        key: char,
        target: String,
    },

    #[error("check node '{check}' has no outcome node '{missing}'")]
    MissingOutcome { check: String, missing: String },

    #[error("check node '{0}' needs both check_skill and difficulty_class")]
    IncompleteCheck(String),

    #[error("option key '{key}' on node '{node}' is not a single character")]
    InvalidKey { node: String, key: String },

    #[error("graph has no 'Start' node")]
    MissingStart,

    #[error("no entry node 'Start{0}' for condition value {0}")]
    MissingEntry(i32),

    #[error("duplicate node title '{0}'")]
    DuplicateTitle(String),

    #[error("quest rule '{rule}' references unknown condition '{scene}.{flag}'")]
    UnknownCondition {
        rule: String,
        scene: String,
        flag: String,
    },
}
