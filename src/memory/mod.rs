mod exp;

pub use exp::*;
