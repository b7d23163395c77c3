pub mod index_writer;
pub mod batch;
pub mod source;
