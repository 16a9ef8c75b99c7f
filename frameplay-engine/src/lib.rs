//! Frameplay Engine
//!
//! Randomized frame generation for online developmental-science studies.
//! A randomized frame declares a list of frame templates and a collection of
//! parameter sets; this crate picks one parameter set (optionally weighted by
//! the participant's age), fills the templates in, and reports which condition
//! was assigned. It performs no I/O and renders nothing.

pub mod config;
pub mod error;
pub mod expander;
pub mod merge;
pub mod numbers;
pub mod permutation;
pub mod rng;
pub mod sampler;
pub mod selector;
pub mod substitute;
pub mod weights;

// Re-export commonly used types
pub use config::{ConditionLog, ConditionRecord, FrameConfig, ParameterSet};
pub use error::{
    RandomizerError, SelectorError, SubstitutionError, Warning, WeightError, Warnings,
};
pub use expander::{
    Expansion, FnResolver, FrameListExpander, FrameResolver, PassthroughResolver, SelectionTrace,
    generate,
};
pub use merge::deep_merge;
pub use permutation::{PermutationState, UniqueCursor};
pub use rng::{CountingRng, RngBundle};
pub use sampler::{WeightedDraw, draw_weighted};
pub use selector::{Reference, Selector, parse_reference};
pub use substitute::Substituter;
pub use weights::{
    AgeBracket, BirthDate, ChildProfile, ChildRecord, ResolvedWeights, WeightSpec,
    resolve_weights,
};
