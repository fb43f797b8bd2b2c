/// Options recognized by the synthesizer. Defaults favor maximal safe
/// merging: the smallest dispatch code that still answers every operand
/// tuple exactly like the rule table.
#[derive(Debug, Clone)]
pub struct Config {
    /// Merge aggressiveness. 0 favors execution speed (least merging,
    /// only multi-action subtrees coalesce), 2 favors code size (most
    /// merging).
    pub merge_level: u8,
    /// Permit merges that can grow the emitted code by comparing a
    /// single-child branch against a multi-child branch.
    pub size_increasing_merge: bool,
    /// When two branches each have a single child, decide compatibility by
    /// recursing into the children instead of a shallow tag comparison.
    pub correct_compatibility: bool,
    /// Start the dispatch plan with a combined primary-tag-pair test for
    /// two-operand instructions.
    pub use_tagpair: bool,
    /// Run the cross-branch merge pass after local merging.
    pub relative_merge: bool,
    /// Re-check the diagram against the rule table after every pass.
    pub verify_diagram: bool,
    /// Precede each action with a comment naming the representation types
    /// and rule it was selected for.
    pub debug_comment: bool,
    /// Pad each switch with explicit case labels for the unused remainder
    /// of its tag domain, falling through to the default arm. Has no
    /// effect unless `use_default` is set.
    pub pad_cases: bool,
    /// Emit a `default:` arm carrying the standard error action.
    pub use_default: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            merge_level: 2,
            size_increasing_merge: false,
            correct_compatibility: true,
            use_tagpair: true,
            relative_merge: true,
            verify_diagram: true,
            debug_comment: false,
            pad_cases: false,
            use_default: true,
        }
    }
}
