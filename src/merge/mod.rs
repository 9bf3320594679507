pub mod executor;
pub mod policy;

pub use executor::{Approval, MergeExecutor};
pub use policy::{
    AttributeMergeRule, LongestNonEmptyWins, MostCompleteSurvives, SmallerIdSurvives,
    SurvivorPolicy,
};
