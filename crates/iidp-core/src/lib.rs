pub mod ability;
pub mod circuit_breaker;
pub mod composer;
pub mod config;
pub mod domain;
pub mod engine;
pub mod irt;
pub mod phase;
pub mod ports;
pub mod ranker;
pub mod review;
pub mod selector;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{EngineConfig, TopicWeightTable};
pub use domain::{
    DifficultyTier, IidpError, IrtParams, Item, ItemId, ItemType, LearnerProfile, LearningPhase,
    Quiz, Response, Result, Subject, TopicAbility, TopicId,
};
pub use engine::AssessmentEngine;
pub use ports::{Clock, EngineRng, Repository, StdEngineRng, SystemClock};
