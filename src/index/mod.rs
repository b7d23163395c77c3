pub mod term;
pub mod posting;
pub mod segment_index;
