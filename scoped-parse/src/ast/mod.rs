pub mod expr;
pub mod func;
pub mod node;
pub mod obj;
pub mod stmt;
pub mod stx;
