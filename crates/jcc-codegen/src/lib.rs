//! Lowering of the type-annotated AST into TIR.
//!
//! Every method with a body becomes a TIR function. Parameters and locals
//! live in entry-block allocas (promoted later by mem2reg); instance
//! methods take the receiver as a leading pointer argument; instance
//! fields are addressed by `getelementptr` into the class struct layout;
//! logical `&&`/`||` lower as short-circuit control flow.
//!
//! There is no runtime: allocation and string concatenation lower to calls
//! of declared-but-not-defined hook functions, and `instanceof` (which
//! would need runtime type information) lowers to a null check.

mod expr;
mod layout;
mod lower;

pub use lower::lower_program;
