pub mod analyze;
pub mod compress;
pub mod merge;
pub mod pages;
pub mod rotate;
pub mod search;
pub mod split;
