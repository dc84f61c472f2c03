/// The overall run lifecycle (SPEC_FULL.md §4.4). Distinct from `model::slot::SlotStatus`, which
/// tracks one expected result rather than the whole run.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RunState {
    Initializing,
    Running,
    PostProcessing,
    Assembling,
    Done,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}
