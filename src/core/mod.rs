pub mod fuzzy;
pub mod grouping;
pub mod naming;
pub mod policy;
pub mod record;
