use crate::{
    error::Error,
    types::{HashMap, MergedEvent, Rank, TaskOutcome},
};
use crossbeam_channel::Receiver;
use derive_more::{Debug, Deref};

/// Per-task ranks derived from a priority list.
///
/// Priorities are compressed into dense, order-preserving ranks: the smallest
/// priority gets rank `0`, equal priorities share a rank. Only the first
/// `task_count` priorities are considered. Tasks past the end of the list all
/// get one extra rank below every explicit one.
///
/// ```
/// use cpf::priority::Ranks;
///
/// let ranks = Ranks::derive(&[5, 10, 3, 10], 6);
/// let ranks: Vec<usize> = ranks.iter().map(|rank| rank.get()).collect();
/// assert_eq!(ranks, [1, 2, 0, 2, 3, 3]);
/// ```
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Deref)]
pub struct Ranks {
    #[deref]
    ranks: Vec<Rank>,
    slot_count: usize,
}

impl Ranks {
    pub fn derive(priorities: &[i64], task_count: usize) -> Self {
        let explicit = &priorities[..priorities.len().min(task_count)];

        let mut distinct = explicit.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        let dense: HashMap<i64, usize> = distinct
            .iter()
            .enumerate()
            .map(|(rank, &priority)| (priority, rank))
            .collect();

        // `max(explicit rank) + 1`, or `0` when nothing is explicit.
        let lowest = distinct.len();
        let ranks = (0..task_count)
            .map(|index| Rank(explicit.get(index).map_or(lowest, |priority| dense[priority])))
            .collect();
        let slot_count = if explicit.len() < task_count {
            lowest + 1
        } else {
            lowest
        };
        Self { ranks, slot_count }
    }

    /// Number of distinct ranks in use.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskStatus {
    Waiting,
    Succeeded,
    Failed,
}

#[derive(Debug)]
struct RankSlot<T> {
    status: TaskStatus,
    /// Tasks of this rank that have not delivered yet.
    pending: usize,
    #[debug(skip)]
    value: Option<T>,
}

/// Outcome of the resolved-prefix scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scan {
    /// The most preferred undecided rank is still waiting.
    Pending,
    /// Every rank above this one failed and this one succeeded.
    Resolved(Rank),
    /// Every rank failed.
    Exhausted,
}

/// Status and first successful value of every rank.
///
/// A rank succeeds on the first successful delivery of any of its tasks and
/// fails once all of its tasks delivered a failure. Either transition happens
/// at most once; later deliveries to a decided rank are ignored.
#[derive(Debug)]
pub(crate) struct RankTable<T> {
    slots: Vec<RankSlot<T>>,
}

impl<T> RankTable<T> {
    pub(crate) fn new(ranks: &Ranks) -> Self {
        let mut slots: Vec<RankSlot<T>> = (0..ranks.slot_count())
            .map(|_| RankSlot {
                status: TaskStatus::Waiting,
                pending: 0,
                value: None,
            })
            .collect();
        for rank in ranks.iter() {
            slots[rank.get()].pending += 1;
        }
        Self { slots }
    }

    /// Records one delivery: `Some(value)` for a success, `None` for a
    /// failure.
    pub(crate) fn record(&mut self, rank: Rank, outcome: Option<T>) {
        let slot = &mut self.slots[rank.get()];
        if slot.status != TaskStatus::Waiting {
            return;
        }
        slot.pending = slot
            .pending
            .checked_sub(1)
            .expect("RankTable::record: more deliveries than tasks");
        match outcome {
            Some(value) => {
                slot.status = TaskStatus::Succeeded;
                slot.value = Some(value);
            }
            None if slot.pending == 0 => slot.status = TaskStatus::Failed,
            None => {}
        }
    }

    /// Walks ranks from the most preferred down, stopping at the first one
    /// that is still waiting or has succeeded.
    pub(crate) fn scan(&self) -> Scan {
        for (rank, slot) in self.slots.iter().enumerate() {
            match slot.status {
                TaskStatus::Waiting => return Scan::Pending,
                TaskStatus::Succeeded => return Scan::Resolved(Rank(rank)),
                TaskStatus::Failed => {}
            }
        }
        Scan::Exhausted
    }

    /// The value of the most preferred rank that succeeded, ignoring ranks
    /// still waiting.
    pub(crate) fn take_best(&mut self) -> Option<T> {
        self.slots
            .iter_mut()
            .find(|slot| slot.status == TaskStatus::Succeeded)
            .and_then(|slot| slot.value.take())
    }

    pub(crate) fn take(&mut self, rank: Rank) -> Option<T> {
        self.slots[rank.get()].value.take()
    }

    #[cfg(test)]
    pub(crate) fn status(&self, rank: Rank) -> TaskStatus {
        self.slots[rank.get()].status
    }
}

/// Drains `events` until the most preferred successful value is known.
///
/// After every event the resolved-prefix scan runs; it returns as soon as
/// every rank above a successful one has failed. If the stream closes first,
/// the best success seen so far (if any) is returned.
///
/// # Errors
/// [`Error::NoSuccess`] if no delivered value was accepted by `is_success`.
pub(crate) fn resolve<T, P>(
    ranks: &Ranks,
    events: &Receiver<MergedEvent<TaskOutcome<T>>>,
    is_success: P,
) -> Result<T, Error>
where
    P: Fn(&T) -> bool,
{
    let mut table = RankTable::new(ranks);
    for MergedEvent { value, index } in events {
        let rank = ranks[index];
        let accepted = value.ok().filter(|value| is_success(value));
        tracing::trace!(index, rank = rank.get(), success = accepted.is_some(), "task delivered");
        table.record(rank, accepted);
        match table.scan() {
            Scan::Resolved(rank) => {
                tracing::debug!(index, rank = rank.get(), "resolved most preferred result");
                return table.take(rank).ok_or(Error::NoSuccess);
            }
            Scan::Exhausted => break,
            Scan::Pending => {}
        }
    }
    match table.take_best() {
        Some(value) => {
            tracing::debug!("resolved best result after stream closed");
            Ok(value)
        }
        None => {
            tracing::debug!("no task succeeded");
            Err(Error::NoSuccess)
        }
    }
}
