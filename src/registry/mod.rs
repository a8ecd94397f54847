mod core;

pub use self::core::{
    FocusableNode, MovePermissions, NodeId, NodeMapping, NodeRegistry, node_mapping,
};
