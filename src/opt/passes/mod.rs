//! The built-in transformation passes.

mod constprop;
mod cse;
mod dce;

pub use constprop::ConstantFoldingPass;
pub use cse::CsePass;
pub use dce::DcePass;
