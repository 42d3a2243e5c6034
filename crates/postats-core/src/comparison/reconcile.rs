use crate::model::Named;
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Whether a named child exists on both sides of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    New,
    Missing,
    NoChange,
}

impl PresenceStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Missing => "Missing",
            Self::NoChange => "NoChange",
        }
    }
}

impl Display for PresenceStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// A current child and its same-named baseline counterpart. At least one side
/// is always present.
#[derive(Debug)]
pub struct Pairing<'a, T> {
    current: Option<&'a T>,
    accepted: Option<&'a T>,
}

impl<T> Clone for Pairing<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Pairing<'_, T> {}

impl<'a, T: Named> Pairing<'a, T> {
    /// # Panics
    ///
    /// Panics when both sides are absent; reconciliation never produces such
    /// a pair.
    pub fn new(current: Option<&'a T>, accepted: Option<&'a T>) -> Self {
        assert!(
            current.is_some() || accepted.is_some(),
            "comparison pair must have a current or an accepted side"
        );
        Self { current, accepted }
    }

    pub fn current(&self) -> Option<&'a T> {
        self.current
    }

    pub fn accepted(&self) -> Option<&'a T> {
        self.accepted
    }

    pub fn name(&self) -> &'a str {
        match (self.current, self.accepted) {
            (Some(current), _) => current.name(),
            (None, Some(accepted)) => accepted.name(),
            (None, None) => unreachable!("pairing invariant checked in Pairing::new"),
        }
    }

    pub fn presence(&self) -> PresenceStatus {
        match (self.current, self.accepted) {
            (None, _) => PresenceStatus::Missing,
            (Some(_), None) => PresenceStatus::New,
            (Some(_), Some(_)) => PresenceStatus::NoChange,
        }
    }
}

/// Three-way diff of two sets of named children.
///
/// Every current child is paired with the first same-named accepted child;
/// accepted children left unmatched become `(None, accepted)` pairs. The
/// result is ordered by name using ordinal byte comparison.
pub fn reconcile<'a, T: Named>(current: &'a [T], accepted: Option<&'a [T]>) -> Vec<Pairing<'a, T>> {
    let accepted = accepted.unwrap_or(&[]);
    let mut matched = vec![false; accepted.len()];
    let mut pairings = Vec::with_capacity(current.len() + accepted.len());

    for current_child in current {
        let counterpart = accepted
            .iter()
            .position(|candidate| candidate.name() == current_child.name());
        if let Some(index) = counterpart {
            matched[index] = true;
        }
        pairings.push(Pairing::new(
            Some(current_child),
            counterpart.map(|index| &accepted[index]),
        ));
    }

    for (accepted_child, _) in accepted
        .iter()
        .zip(&matched)
        .filter(|(_, matched)| !**matched)
    {
        pairings.push(Pairing::new(None, Some(accepted_child)));
    }

    pairings.sort_by(|left, right| left.name().cmp(right.name()));
    pairings
}
