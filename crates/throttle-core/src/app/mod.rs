//! App - エンジンの構築

pub mod builder;

pub use self::builder::{BuildError, ThrottleBuilder};
