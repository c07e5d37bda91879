//! State management module
//! 
//! This module handles conversation state and the deal transition table

pub mod context;
pub mod scenarios;
pub mod storage;
pub mod transitions;

// Re-export commonly used state components
pub use context::{ConversationContext, ConversationState, SessionStep, DealDraft, AdminPrompt, AdminPromptKind};
pub use scenarios::{ScenarioManager, ScenarioStep, StepOutcome};
pub use storage::{StateStorage, StorageStats};
pub use transitions::{DealInput, Trigger, TransitionRule, TRANSITIONS};
