//! IDE queries over the declaration model.
//!
//! [`AnalysisHost`] is the only writer: it feeds file text through the
//! parse database into the project. [`Analysis`] handles read the model
//! from any thread and return owned [`DeclInfo`] snapshots.

mod analysis;
mod info;
mod scope;

pub use analysis::{Analysis, AnalysisHost, FileUpdate};
pub use info::{DeclInfo, MemberFilter};
