//! Composable temporal conditions.
//!
//! A condition is satisfied at most once; once `satisfied_at` is set it
//! never changes. Updates are idempotent per request identity, guarded by a
//! last-request memo, so nodes shared across several trees are counted once
//! per request no matter how many parents reach them.

use serde::{Deserialize, Serialize};
use std::fmt;

use signal::Time;
use wire::{Request, RequestMatcher};

use crate::shared::Shared;

/// Handle to a condition node, shared by identity.
pub type SharedCondition = Shared<Condition>;

/// What an `After` node is waiting for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Cause {
    /// A fixed delay past the child's satisfaction time (or past t=0).
    Delay(Time),
    /// The first matching request once the child is satisfied.
    Match(RequestMatcher),
}

/// Structure of a condition node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ConditionKind {
    After {
        cause: Cause,
        child: Option<SharedCondition>,
    },
    AnyOf(Vec<SharedCondition>),
    AllOf(Vec<SharedCondition>),
}

/// A temporal predicate over the request stream.
///
/// Equality compares structure only; runtime state (satisfaction time, memo)
/// is excluded so that freshly built and already-replayed trees of the same
/// shape compare equal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Condition {
    kind: ConditionKind,
    #[serde(skip)]
    satisfied_at: Option<Time>,
    #[serde(skip)]
    last_update: Option<Request>,
}

impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Condition {
    fn node(kind: ConditionKind) -> SharedCondition {
        Shared::new(Condition {
            kind,
            satisfied_at: None,
            last_update: None,
        })
    }

    /// Satisfied `delay` after t=0.
    pub fn after(delay: Time) -> SharedCondition {
        Self::node(ConditionKind::After {
            cause: Cause::Delay(delay),
            child: None,
        })
    }

    /// Satisfied `delay` after `child` is.
    pub fn after_child(delay: Time, child: &SharedCondition) -> SharedCondition {
        Self::node(ConditionKind::After {
            cause: Cause::Delay(delay),
            child: Some(child.clone()),
        })
    }

    /// Satisfied by the first request the matcher accepts.
    pub fn when(matcher: RequestMatcher) -> SharedCondition {
        Self::node(ConditionKind::After {
            cause: Cause::Match(matcher),
            child: None,
        })
    }

    /// Satisfied by the first matching request once `child` is satisfied.
    pub fn when_after(matcher: RequestMatcher, child: &SharedCondition) -> SharedCondition {
        Self::node(ConditionKind::After {
            cause: Cause::Match(matcher),
            child: Some(child.clone()),
        })
    }

    /// Satisfied when any child is; resolves to the minimum child time.
    pub fn any_of(children: Vec<SharedCondition>) -> SharedCondition {
        Self::node(ConditionKind::AnyOf(children))
    }

    /// Satisfied when every child is; resolves to the maximum child time.
    pub fn all_of(children: Vec<SharedCondition>) -> SharedCondition {
        Self::node(ConditionKind::AllOf(children))
    }
}

impl Shared<Condition> {
    pub fn satisfied_at(&self) -> Option<Time> {
        self.lock().satisfied_at
    }

    pub fn is_satisfied(&self) -> bool {
        self.satisfied_at().is_some()
    }

    /// Feeds one request through the node and its children.
    ///
    /// Re-feeding the same request is a no-op, as is any update once the
    /// node is satisfied.
    pub fn update(&self, request: &Request) {
        let mut this = self.lock();
        if this.last_update.as_ref() == Some(request) {
            return;
        }
        this.last_update = Some(request.clone());
        if this.satisfied_at.is_some() {
            return;
        }

        let resolved = match &this.kind {
            ConditionKind::After { cause, child } => {
                let start = match child {
                    Some(child) => {
                        child.update(request);
                        child.satisfied_at()
                    }
                    None => Some(0),
                };
                match (start, cause) {
                    // The satisfaction time pegs at the deadline, not at the
                    // arriving request's timestamp.
                    (Some(start), Cause::Delay(delay)) => {
                        let due = start + delay;
                        (due <= request.timestamp()).then_some(due)
                    }
                    (Some(_), Cause::Match(matcher)) => {
                        matcher.matches(request).then(|| request.timestamp())
                    }
                    (None, _) => None,
                }
            }
            ConditionKind::AnyOf(children) => {
                for child in children {
                    child.update(request);
                }
                children.iter().filter_map(|c| c.satisfied_at()).min()
            }
            ConditionKind::AllOf(children) => {
                for child in children {
                    child.update(request);
                }
                children
                    .iter()
                    .map(|c| c.satisfied_at())
                    .collect::<Option<Vec<_>>>()
                    .and_then(|times| times.into_iter().max())
            }
        };

        if resolved.is_some() {
            this.satisfied_at = resolved;
        }
    }

    /// Deep copy with all runtime state cleared, for replaying against a log
    /// without polluting the live tree.
    pub fn reset_clone(&self) -> SharedCondition {
        let this = self.lock();
        let kind = match &this.kind {
            ConditionKind::After { cause, child } => ConditionKind::After {
                cause: cause.clone(),
                child: child.as_ref().map(|c| c.reset_clone()),
            },
            ConditionKind::AnyOf(children) => {
                ConditionKind::AnyOf(children.iter().map(|c| c.reset_clone()).collect())
            }
            ConditionKind::AllOf(children) => {
                ConditionKind::AllOf(children.iter().map(|c| c.reset_clone()).collect())
            }
        };
        Condition::node(kind)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ConditionKind::After { cause, child } => {
                match cause {
                    Cause::Delay(delay) => write!(f, "{delay} ms")?,
                    Cause::Match(matcher) => write!(f, "{matcher}")?,
                }
                if let Some(child) = child {
                    write!(f, " after ({})", child.lock())?;
                }
                Ok(())
            }
            ConditionKind::AnyOf(children) => join_children(f, "any of", children),
            ConditionKind::AllOf(children) => join_children(f, "all of", children),
        }
    }
}

fn join_children(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    children: &[SharedCondition],
) -> fmt::Result {
    write!(f, "{label} [")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, "; ")?;
        }
        write!(f, "{}", child.lock())?;
    }
    write!(f, "]")
}
