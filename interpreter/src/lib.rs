pub mod builtins;
pub mod error;
pub mod evaluator;
pub mod evaluator_helpers;
pub mod executor;
pub mod methods;
pub mod namespace;
pub mod runtime_value;

pub use error::{CompileError, ErrorKind, ExecError, RuntimeError};
pub use executor::{CodeObject, Interpreter, MAX_CALL_DEPTH, STACK_SIZE, compile, exec};
pub use namespace::{BUILTINS_KEY, Namespace};
pub use runtime_value::RuntimeValue;
