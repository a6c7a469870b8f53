//! Process-wide action registry.
//!
//! The registry is a lazily-initialized static, seeded with every
//! [`StdAction`] on first access. It is exposed only through the functions
//! below; there is no registry value to construct.

use crate::{Action, BizLogError, StdAction, LOG_TARGET};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, warn};

static REGISTRY: Lazy<RwLock<HashMap<String, Action>>> = Lazy::new(|| {
    let seeded = StdAction::all()
        .map(|action| (action.code().to_string(), Action::from(action)))
        .collect();
    RwLock::new(seeded)
});

/// Register an action, overwriting any previous action with the same code.
///
/// Re-registering an equal action is reported as a duplicate but is not an
/// error. Returns the action previously registered under the code.
pub fn register(action: Action) -> Result<Option<Action>, BizLogError> {
    if action.code().trim().is_empty() {
        return Err(BizLogError::PipelineMisuse(
            "action code must not be empty".to_string(),
        ));
    }

    let mut actions = REGISTRY.write();
    if let Some(existing) = actions.get(action.code()) {
        if existing == &action {
            warn!(target: LOG_TARGET, code = action.code(), "duplicate action registration");
        } else {
            debug!(
                target: LOG_TARGET,
                code = action.code(),
                previous = existing.description(),
                description = action.description(),
                "overwriting action"
            );
        }
    }
    Ok(actions.insert(action.code().to_string(), action))
}

/// Register an action from its code and description.
pub fn register_code(
    code: impl Into<String>,
    description: impl Into<String>,
) -> Result<Option<Action>, BizLogError> {
    register(Action::new(code, description))
}

/// Register several actions; stops at the first invalid one.
pub fn register_all<I>(actions: I) -> Result<(), BizLogError>
where
    I: IntoIterator<Item = Action>,
{
    for action in actions {
        register(action)?;
    }
    Ok(())
}

/// Look up an action by code.
pub fn of(code: &str) -> Result<Action, BizLogError> {
    REGISTRY
        .read()
        .get(code)
        .cloned()
        .ok_or_else(|| BizLogError::NotRegistered {
            code: code.to_string(),
        })
}

/// Look up a built-in action. Absence is not an error.
pub fn of_std(action: StdAction) -> Option<Action> {
    REGISTRY.read().get(action.code()).cloned()
}

/// Whether an action is registered under the code.
pub fn contains(code: &str) -> bool {
    REGISTRY.read().contains_key(code)
}

/// All registered actions, ordered by code.
pub fn registered() -> Vec<Action> {
    let mut actions: Vec<Action> = REGISTRY.read().values().cloned().collect();
    actions.sort_by(|a, b| a.code().cmp(b.code()));
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_builtins_are_seeded() {
        for action in StdAction::all() {
            let found = of_std(action).unwrap();
            assert_eq!(found.code(), action.code());
            assert!(contains(action.code()));
        }
        assert_eq!(of("LOGIN").unwrap().description(), "登录");
    }

    #[test]
    fn test_unknown_code_is_not_registered() {
        match of("REG_TEST_MISSING") {
            Err(BizLogError::NotRegistered { code }) => assert_eq!(code, "REG_TEST_MISSING"),
            other => panic!("Expected NotRegistered, got {:?}", other),
        }
    }

    #[test]
    fn test_last_registration_wins() {
        assert_eq!(register_code("REG_TEST_APPROVE", "审批").unwrap(), None);
        let previous = register_code("REG_TEST_APPROVE", "审核").unwrap();
        assert_eq!(previous, Some(Action::new("REG_TEST_APPROVE", "审批")));
        assert_eq!(of("REG_TEST_APPROVE").unwrap().description(), "审核");
    }

    #[test]
    fn test_duplicate_registration_is_not_fatal() {
        let action = Action::new("REG_TEST_DUP", "重复");
        register(action.clone()).unwrap();
        assert_eq!(register(action.clone()).unwrap(), Some(action));
    }

    #[test]
    fn test_empty_code_is_misuse() {
        assert!(matches!(
            register_code("  ", "空"),
            Err(BizLogError::PipelineMisuse(_))
        ));
    }

    #[test]
    fn test_register_all_and_listing() {
        register_all(vec![
            Action::new("REG_TEST_A", "甲"),
            Action::new("REG_TEST_B", "乙"),
        ])
        .unwrap();

        let codes: Vec<String> = registered().iter().map(|a| a.code().to_string()).collect();
        let a = codes.iter().position(|c| c == "REG_TEST_A").unwrap();
        let b = codes.iter().position(|c| c == "REG_TEST_B").unwrap();
        assert!(a < b);
    }

    proptest! {
        #[test]
        fn lookup_returns_registered_code(code in "PROP_[A-Z]{1,12}", desc in "\\PC{0,16}") {
            register_code(code.clone(), desc.clone()).unwrap();
            let found = of(&code).unwrap();
            prop_assert_eq!(found.code(), code.as_str());
        }
    }
}
