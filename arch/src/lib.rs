pub mod inst;
pub mod op;
pub mod reg;
pub mod word;

pub use inst::{EncodeError, Inst, Mode, ModeKind};
pub use op::{OpClass, OpKind};
pub use reg::Reg;
pub use word::Word;
