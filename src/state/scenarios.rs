//! Deal composition scenario
//!
//! Two short branches converge on the quantity step:
//! local currency asks for bank then initials, crypto asks for the network.

use regex::Regex;
use crate::config::FloorsConfig;
use crate::models::{CreateDealRequest, Currency};
use crate::utils::errors::{TradeDeskError, Result};
use super::context::{ConversationContext, ConversationState, SessionStep};

pub const CURRENCY_CHOICES: &[&str] = &["💴 ГРН", "💵 USDT"];
pub const BANK_CHOICES: &[&str] = &["Приват24", "Монобанк", "Другие"];
pub const NETWORK_CHOICES: &[&str] = &["Binance ID", "BEP20", "TRC20"];

/// Prompt shown when a step becomes current
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioStep {
    pub step: SessionStep,
    pub prompt: &'static str,
    /// Suggested answers rendered as a reply keyboard; free text is always accepted
    pub choices: &'static [&'static str],
}

/// Result of feeding one message into a composition session
#[derive(Debug)]
pub enum StepOutcome {
    /// Input stored, the session moved to this step
    Advanced(SessionStep),
    /// Input refused, the session stays where it was
    Rejected { step: SessionStep, reason: TradeDeskError },
    /// All fields valid; the caller persists the deal and drops the session
    Ready(CreateDealRequest),
}

#[derive(Debug, Clone)]
pub struct ScenarioManager {
    quantity_pattern: Regex,
}

impl ScenarioManager {
    pub fn new() -> Result<Self> {
        let quantity_pattern = Regex::new(r"(?i)^\s*(\d+)\s*(?:кк|kk)?\s*$")
            .map_err(|e| TradeDeskError::Config(format!("Invalid quantity pattern: {}", e)))?;
        Ok(Self { quantity_pattern })
    }

    /// Prompt and choices for a step
    pub fn describe(&self, step: SessionStep) -> ScenarioStep {
        let (prompt, choices) = match step {
            SessionStep::Currency => ("Выберите валюту:", CURRENCY_CHOICES),
            SessionStep::Bank => ("Выберите банк:", BANK_CHOICES),
            SessionStep::Initials => ("Введите инициалы:", &[][..]),
            SessionStep::Network => ("Выберите сеть:", NETWORK_CHOICES),
            SessionStep::Quantity => ("Введите количество (кк):", &[][..]),
        };
        ScenarioStep { step, prompt, choices }
    }

    /// Store `input` under the current step and move the cursor
    pub fn apply_input(
        &self,
        context: &mut ConversationContext,
        input: &str,
        floors: &FloorsConfig,
    ) -> Result<StepOutcome> {
        context.touch();
        let user_id = context.user_id;
        let (step, draft) = match &mut context.state {
            ConversationState::Composing { step, draft } => (step, draft),
            ConversationState::AwaitingAdmin(_) => {
                return Err(TradeDeskError::InvalidInput("No deal is being composed".to_string()));
            }
        };

        let text = input.trim();
        let current = *step;

        if current != SessionStep::Quantity && text.is_empty() {
            return Ok(StepOutcome::Rejected {
                step: current,
                reason: TradeDeskError::InvalidInput(format!("Empty {}", current.as_str())),
            });
        }

        let next = match current {
            SessionStep::Currency => match Currency::from_choice(text) {
                Some(currency) => {
                    draft.currency = Some(currency);
                    match currency {
                        Currency::Uah => SessionStep::Bank,
                        Currency::Usdt => SessionStep::Network,
                    }
                }
                None => {
                    return Ok(StepOutcome::Rejected {
                        step: current,
                        reason: TradeDeskError::InvalidInput(format!("Unknown currency: {}", text)),
                    });
                }
            },
            SessionStep::Bank => {
                draft.bank = Some(text.to_string());
                SessionStep::Initials
            }
            SessionStep::Initials => {
                draft.initials = Some(text.to_string());
                SessionStep::Quantity
            }
            SessionStep::Network => {
                draft.network = Some(text.to_string());
                SessionStep::Quantity
            }
            SessionStep::Quantity => {
                let currency = draft.currency.ok_or_else(|| {
                    TradeDeskError::InvalidInput("Session reached quantity without a currency".to_string())
                })?;

                let quantity = match self.parse_quantity(text) {
                    Ok(quantity) => quantity,
                    Err(reason) => return Ok(StepOutcome::Rejected { step: current, reason }),
                };

                let floor = floors.floor_for(currency, draft.network.as_deref());
                if quantity < floor {
                    return Ok(StepOutcome::Rejected {
                        step: current,
                        reason: TradeDeskError::BelowFloor { quantity, floor },
                    });
                }

                let request = draft.clone().into_request(user_id, currency, quantity);
                return Ok(StepOutcome::Ready(request));
            }
        };

        *step = next;
        Ok(StepOutcome::Advanced(next))
    }

    /// Positive integer with an optional `кк`/`kk` suffix
    pub fn parse_quantity(&self, input: &str) -> Result<i64> {
        let digits = self
            .quantity_pattern
            .captures(input)
            .and_then(|caps| caps.get(1))
            .ok_or_else(|| TradeDeskError::InvalidInput(format!("Not a number: {}", input.trim())))?;

        let quantity: i64 = digits
            .as_str()
            .parse()
            .map_err(|_| TradeDeskError::InvalidInput(format!("Number out of range: {}", digits.as_str())))?;

        if quantity <= 0 {
            return Err(TradeDeskError::InvalidInput("Quantity must be positive".to_string()));
        }
        Ok(quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn feed(manager: &ScenarioManager, context: &mut ConversationContext, inputs: &[&str]) -> StepOutcome {
        let floors = FloorsConfig::default();
        let mut outcome = None;
        for input in inputs {
            outcome = Some(manager.apply_input(context, input, &floors).unwrap());
        }
        outcome.unwrap()
    }

    #[test]
    fn test_local_branch_collects_bank_and_initials() {
        let manager = ScenarioManager::new().unwrap();
        let mut context = ConversationContext::composing(1);

        let outcome = feed(&manager, &mut context, &["💴 ГРН", "Монобанк", "I.I.", "20кк"]);
        assert_matches!(outcome, StepOutcome::Ready(request) => {
            assert_eq!(request.currency, Currency::Uah);
            assert_eq!(request.bank.as_deref(), Some("Монобанк"));
            assert_eq!(request.initials.as_deref(), Some("I.I."));
            assert_eq!(request.quantity, 20);
        });
    }

    #[test]
    fn test_crypto_branch_skips_bank() {
        let manager = ScenarioManager::new().unwrap();
        let mut context = ConversationContext::composing(1);

        assert_matches!(feed(&manager, &mut context, &["💵 USDT"]), StepOutcome::Advanced(SessionStep::Network));
        assert_matches!(feed(&manager, &mut context, &["BEP20"]), StepOutcome::Advanced(SessionStep::Quantity));
    }

    #[test]
    fn test_unknown_currency_stays_on_step() {
        let manager = ScenarioManager::new().unwrap();
        let mut context = ConversationContext::composing(1);

        assert_matches!(
            feed(&manager, &mut context, &["EUR"]),
            StepOutcome::Rejected { step: SessionStep::Currency, .. }
        );
        assert_eq!(context.step(), Some(SessionStep::Currency));
    }

    #[test]
    fn test_below_floor_keeps_quantity_step() {
        let manager = ScenarioManager::new().unwrap();
        let mut context = ConversationContext::composing(1);

        let outcome = feed(&manager, &mut context, &["💴 ГРН", "Приват24", "A.B.", "5"]);
        assert_matches!(
            outcome,
            StepOutcome::Rejected { step: SessionStep::Quantity, reason: TradeDeskError::BelowFloor { quantity: 5, floor: 10 } }
        );
        assert_eq!(context.step(), Some(SessionStep::Quantity));
    }

    #[test]
    fn test_parse_quantity() {
        let manager = ScenarioManager::new().unwrap();
        assert_eq!(manager.parse_quantity("15").unwrap(), 15);
        assert_eq!(manager.parse_quantity(" 15 кк ").unwrap(), 15);
        assert_eq!(manager.parse_quantity("15KK").unwrap(), 15);
        assert!(manager.parse_quantity("0").is_err());
        assert!(manager.parse_quantity("-3").is_err());
        assert!(manager.parse_quantity("ten").is_err());
        assert!(manager.parse_quantity("99999999999999999999").is_err());
    }
}
