//! Pipeline stages built on ordered lanes and hot-swappable behaviors.
//!
//! - [`PipelineNode`]: a named stage owning exactly one scheduler
//! - [`DynamicBehaviorNode`]: a stage whose hooks run through a reloadable
//!   [`BehaviorHost`](lane_behavior::BehaviorHost)
//! - [`QueueImporter`]: periodic producer that drives synthesized items
//!   through the behavior's dispatch hooks

pub mod dynamic;
pub mod error;
pub mod importer;
pub mod node;

pub use dynamic::DynamicBehaviorNode;
pub use error::NodeError;
pub use importer::QueueImporter;
pub use node::{NextStage, NodeBase, PipelineNode};
