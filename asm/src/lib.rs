pub mod assemble;
pub mod error;
pub mod ident;
pub mod image;
pub mod layout;
pub mod lexer;
pub mod msg;
pub mod operand;
pub mod parser;
pub mod util;

pub use assemble::{assemble, Assembly};
pub use error::Error;
