//! The tree-walking interpreter that runs rewritten programs against a [`scope::Scope`].

pub mod builtins;
pub mod conv;
pub mod env;
pub mod exec;
pub mod operator;
pub mod realm;
pub mod scope;
pub mod value;
pub mod vm;
