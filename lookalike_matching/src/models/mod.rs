// src/models/mod.rs
pub mod errors;
pub mod organization;
pub mod results;
pub mod target;

pub use errors::LookalikeError;
pub use organization::{Executive, JoinedRow, Organization, Physician};
pub use results::{
    LookalikeRequest, LookalikeResponse, LookalikeResultSet, ScoredOrganization, SharedResultSet,
    SimilarityTier,
};
pub use target::{ScoringContext, TargetProfile};
