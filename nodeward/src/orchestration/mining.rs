//! Mining state of the running node.

use std::fmt;

use serde_json::{json, Value};

/// Whether the node is mining, as last confirmed by the node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MiningState {
    #[default]
    Off,
    On,
}

impl MiningState {
    pub fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Off => Self::On,
            Self::On => Self::Off,
        }
    }

    /// RPC call that moves the node out of this state.
    pub(crate) fn toggle_call(&self) -> (&'static str, Vec<Value>) {
        match self {
            // One mining thread.
            Self::Off => ("miner_start", vec![json!(1)]),
            // miner_stop takes no parameters.
            Self::On => ("miner_stop", Vec::new()),
        }
    }

    /// State after the node answered a toggle call with `result`.
    ///
    /// Only a truthy answer confirms the toggle. `false`, `null`, `0` and
    /// the empty string leave the state as it was.
    pub(crate) fn after_toggle(self, result: &Value) -> Self {
        if is_truthy(result) {
            self.toggled()
        } else {
            self
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl fmt::Display for MiningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "off",
            Self::On => "on",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_calls() {
        assert_eq!(
            MiningState::Off.toggle_call(),
            ("miner_start", vec![json!(1)])
        );
        assert_eq!(MiningState::On.toggle_call(), ("miner_stop", vec![]));
    }

    #[test]
    fn test_refusal_keeps_state() {
        assert_eq!(MiningState::Off.after_toggle(&json!(false)), MiningState::Off);
        assert_eq!(MiningState::Off.after_toggle(&json!(true)), MiningState::On);
        assert_eq!(MiningState::On.after_toggle(&json!(true)), MiningState::Off);
    }

    #[test]
    fn test_falsy_answers_do_not_toggle() {
        for answer in [Value::Null, json!(0), json!(0.0), json!("")] {
            assert_eq!(MiningState::Off.after_toggle(&answer), MiningState::Off);
            assert_eq!(MiningState::On.after_toggle(&answer), MiningState::On);
        }
    }

    #[test]
    fn test_truthy_answers_toggle() {
        for answer in [json!(1), json!("ok"), json!([]), json!({})] {
            assert_eq!(MiningState::Off.after_toggle(&answer), MiningState::On);
        }
    }
}
