pub mod records;
pub mod tokens;
