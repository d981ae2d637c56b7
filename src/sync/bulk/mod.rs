pub mod copy_to;
pub mod delete;

pub use copy_to::{copy_to, copy_to_with_overwrite, CopyToItem, CopyToOutcome};
pub use delete::{
    delete_items, reconcile_tree_after_delete, DeletedSide, DeleteItem, DeleteMode, DeleteOutcome, TreeDeletion,
};
