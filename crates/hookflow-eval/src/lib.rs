pub mod blocks;
mod eval;
mod executor;
mod interpolate;
pub mod natives;
mod resolve;

pub use blocks::{Block, BlockRegistry, BlockSettings};
pub use eval::{eval_expr, eval_str};
pub use executor::{Executor, FlowRun};
pub use interpolate::{interpolate, interpolate_in};
pub use resolve::{expand_brackets, resolve};
