pub mod essay_flow;
pub mod session;

pub use essay_flow::{Action, EssayFlow, FlowOutcome, FlowResponse, FlowWarning};
pub use session::{AnalysisSession, ExtractedText, FlowState};
