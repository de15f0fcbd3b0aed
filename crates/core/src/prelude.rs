pub use crate::adj_slab::AdjSlab;
pub use crate::bitset::BitSet;
pub use crate::config::Config;
pub use crate::edgelist::{DegreeSidecar, Edge, EdgeCursor, EdgeListHeader};
pub use crate::heap::MinHeap;
pub use crate::shuffler::Shuffler;
pub use crate::writer::AssignmentWriter;
pub use crate::{PartitionError, Pid, Vid};
