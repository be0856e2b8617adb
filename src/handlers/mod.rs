pub mod entity;
pub mod meta;
