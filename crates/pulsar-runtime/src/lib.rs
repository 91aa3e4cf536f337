//! Evaluation primitives for emitted Beacon sources: three-valued logic,
//! sensor resolution with fallback policies, temporal window trackers,
//! emit-mode gates, and the per-rule evaluation driver.

pub mod emit;
pub mod eval;
pub mod rule;
pub mod store;
pub mod temporal;
pub mod truth;

pub use emit::EmitGates;
pub use eval::{SensorResolver, eval_condition, eval_expr_truth, eval_expr_value};
pub use rule::{CompiledRule, CycleState, Emission, RuleOutcome, SampleBuffers, evaluate_rule};
pub use store::{
    BackendReading, CycleOutputs, LastKnownCache, OutputRead, SensorSnapshot, decode_reading,
};
pub use temporal::{DEFAULT_BUFFER_CAPACITY, TemporalStore, TrackerKey, WindowTracker};
pub use truth::Truth;

/// Everything an emitted evaluation unit needs in scope.
pub mod prelude {
    pub use pulsar_core::Value;
    pub use pulsar_lang::ast::{
        Action, BinOp, CmpOp, ConditionTree, EmitMode, Expr, FallbackPolicy, InputBinding,
        Literal, LogLevel, MathFn, SourcedExpr, TemporalMode,
    };

    pub use crate::rule::{CompiledRule, CycleState, RuleOutcome, evaluate_rule};
    pub use crate::truth::Truth;
}
