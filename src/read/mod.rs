pub mod cell;
pub mod operation;
pub mod ticker;
