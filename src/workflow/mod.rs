pub mod context;
pub mod flow;
pub mod machine;

pub use context::{SubmissionSnapshot, WorkflowContext};
pub use flow::{Command, CommandOutcome, Workflow};
pub use machine::{
    ActionLabel, ActionStatus, Completion, SendSelectedPolicy, Ticket, WorkflowState,
    WorkflowStateMachine,
};
