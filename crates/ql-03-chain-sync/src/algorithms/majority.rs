//! # Majority Selection
//!
//! Answers are grouped into classes of identical values. The first
//! participant of the single largest class wins. Missing answers vote for
//! nothing, and two largest classes of equal size mean no majority.

use crate::domain::{invariant_quorum, MajorityWarning};

/// Winning participant of a majority selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Winner {
    /// Position of the winner in the answer list.
    pub index: usize,
    /// Size of the winning class.
    pub agreeing: usize,
    /// Participants that answered.
    pub responded: usize,
}

/// Pick the majority answer. `None` marks a participant that failed.
pub fn select_majority<T: PartialEq>(answers: &[Option<T>]) -> Result<Winner, MajorityWarning> {
    let total = answers.len();
    let responded = answers.iter().filter(|a| a.is_some()).count();
    if !invariant_quorum(responded, total) {
        return Err(MajorityWarning::InsufficientQuorum { responded, total });
    }

    // (index of first member, class size)
    let mut classes: Vec<(usize, usize)> = Vec::new();
    for (index, answer) in answers.iter().enumerate() {
        let Some(answer) = answer else { continue };
        match classes
            .iter_mut()
            .find(|(first, _)| answers[*first].as_ref() == Some(answer))
        {
            Some((_, size)) => *size += 1,
            None => classes.push((index, 1)),
        }
    }

    let largest = classes.iter().map(|&(_, size)| size).max().unwrap_or(0);
    let mut leaders = classes.iter().filter(|&&(_, size)| size == largest);
    match (leaders.next(), leaders.next()) {
        (Some(&(index, agreeing)), None) => Ok(Winner {
            index,
            agreeing,
            responded,
        }),
        _ => Err(MajorityWarning::NoMajority),
    }
}
