mod flow;
mod meta;
mod step;
mod validation;

pub use flow::FlowDocument;
pub use meta::{Channel, DaySchedule, FlowMeta, FlowStatus, WeeklySchedule};
pub use step::{NEW_STEP_MESSAGE, Step, StepId, StepKind, Transition};
pub use validation::{DanglingTransition, Validation, ValidationIssue};
