pub mod id;
pub mod quest_ops;
