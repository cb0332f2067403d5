use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::invocation::{ArgumentValue, InvocationMethod};

/// Registration request for a function, as accepted from `/api/function`
/// and as stored inside a [`FunctionState`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub subs: Vec<String>,
    pub url: String,
    #[serde(default)]
    pub method: InvocationMethod,
    #[serde(default)]
    pub mock: bool,
}

/// One row's per-subscription readiness, for `/api/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowStatus {
    pub ready: Vec<String>,
    pub waiting: Vec<String>,
}

/// Flattened, lock-free view of a [`FunctionState`] safe to return from
/// `snapshot()` once the registry lock is released.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEntry {
    pub name: String,
    pub subs: Vec<String>,
    /// Millisecond epoch timestamp of the last dispatched invocation.
    pub last_invoke: Option<i64>,
    #[serde(rename = "events")]
    pub rows: Vec<RowStatus>,
}

/// A registered function together with its event-conjunction matrix.
///
/// `pending[e][r]` holds the event that filled subscription `e`'s slot in
/// row `r`, or `None` if that slot is still waiting. All subscriptions'
/// vectors are kept at the same length (the row count) by construction —
/// see [`FunctionState::offer`] — which is how invariant 1 and 2 of the
/// matching contract (distinct subs, slot-emptiness agrees with `pending`)
/// are upheld without a separate length check on every access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionState {
    pub def: FunctionDef,
    pending: HashMap<String, Vec<Option<Event>>>,
    last_complete: Option<usize>,
    last_invoke: Option<i64>,
}

impl FunctionState {
    pub fn new(def: FunctionDef) -> Self {
        let pending = def.subs.iter().cloned().map(|s| (s, Vec::new())).collect();
        Self {
            def,
            pending,
            last_complete: None,
            last_invoke: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    fn rows_len(&self) -> usize {
        self.def
            .subs
            .first()
            .and_then(|s| self.pending.get(s))
            .map(|v| v.len())
            .unwrap_or(0)
    }

    fn row_complete(&self, row: usize) -> bool {
        self.def
            .subs
            .iter()
            .all(|s| matches!(self.pending.get(s), Some(v) if v.get(row).map(|e| e.is_some()).unwrap_or(false)))
    }

    /// Offers `event` to this function's matrix. Returns `true` if a row is
    /// now complete (and `last_complete` identifies it), `false` otherwise —
    /// including when `event.name` is not among `self.def.subs`.
    ///
    /// Scans existing rows for the earliest one whose slot for
    /// `event.name` is still empty and fills it there; only if every row
    /// already has that slot filled does it append a new row. This is the
    /// single code path for both "no rows yet" and "all rows saturated for
    /// this subscription" — an empty matrix is just the zero-row case of
    /// "no row has an empty slot".
    pub fn offer(&mut self, event: Event) -> bool {
        if !self.def.subs.iter().any(|s| s == &event.name) {
            return false;
        }

        let rows_len = self.rows_len();
        let target_row = {
            let slots = self.pending.get(&event.name).expect("subscribed column missing");
            (0..rows_len).find(|&r| slots[r].is_none())
        };

        let row = match target_row {
            Some(r) => {
                let slots = self.pending.get_mut(&event.name).unwrap();
                slots[r] = Some(event);
                r
            }
            None => {
                for sub in &self.def.subs {
                    let slots = self.pending.get_mut(sub).unwrap();
                    slots.push(None);
                }
                let slots = self.pending.get_mut(&event.name).unwrap();
                *slots.last_mut().unwrap() = Some(event);
                rows_len
            }
        };

        if self.row_complete(row) {
            self.last_complete = Some(row);
            true
        } else {
            false
        }
    }

    /// Builds the argument map for the completed row and retires it.
    /// Returns `None` if no row is currently complete.
    pub fn consume_ready(&mut self) -> Option<BTreeMap<String, ArgumentValue>> {
        let row = self.last_complete?;
        let mut args = BTreeMap::new();
        for sub in &self.def.subs {
            let slots = self.pending.get_mut(sub).expect("subscribed column missing");
            let event = slots
                .remove(row)
                .expect("row marked complete but slot was empty");
            args.insert(
                sub.clone(),
                ArgumentValue {
                    data: event.data,
                    timestamp: event.created_at,
                },
            );
        }
        self.last_complete = None;
        self.last_invoke = Some(Utc::now().timestamp_millis());
        Some(args)
    }

    pub fn last_invoke(&self) -> Option<i64> {
        self.last_invoke
    }

    pub fn status(&self) -> StatusEntry {
        let rows_len = self.rows_len();
        let rows = (0..rows_len)
            .map(|r| {
                let mut ready = Vec::new();
                let mut waiting = Vec::new();
                for sub in &self.def.subs {
                    let filled = self.pending[sub][r].is_some();
                    if filled {
                        ready.push(sub.clone());
                    } else {
                        waiting.push(sub.clone());
                    }
                }
                RowStatus { ready, waiting }
            })
            .collect();
        StatusEntry {
            name: self.def.name.clone(),
            subs: self.def.subs.clone(),
            last_invoke: self.last_invoke,
            rows,
        }
    }
}
