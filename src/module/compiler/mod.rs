//! Module compilation
//!
//! Produces the compiled plan and lookup table the runtime loader consumes.

pub mod compiler;
pub mod plan;

pub use compiler::{CompileOutcome, CompileReport, ModuleCompiler, ModuleReport, ModuleStatus};
pub use plan::{CompiledPlan, PlanEntry};
