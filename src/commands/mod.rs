pub mod enrich;
pub mod langmerge;
pub mod merge;
pub mod status;
