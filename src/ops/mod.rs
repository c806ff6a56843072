pub mod check;
pub mod import;
pub mod merge;
pub mod placement;
pub mod search;
