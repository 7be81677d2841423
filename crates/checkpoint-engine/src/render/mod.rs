pub mod card;
pub mod lookup;
pub mod nearby;
pub mod summary;

pub use card::{cards, render_table, CheckpointCard, SlotView};
pub use lookup::{filter_groups, lookup, query_terms, GroupFilter};
pub use nearby::{closest, nearby, NearbyCheckpoint};
pub use summary::describe;
