//! Wait-for graph between keys under production
//!
//! An edge `a -> b` means some task producing `a` (directly or through a
//! descendant) is blocked on `b`. A wait that would close a loop in this
//! graph can never finish, so it is refused with the loop as its path.

use crate::error::LookupError;
use crate::key::{RefKey, ScaffoldKind};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Keys the current task is producing, outermost first
pub(crate) type Chain<K> = im::Vector<RefKey<K>>;

/// Cycle through `key` when `chain` already contains it
pub(crate) fn self_cycle<K: ScaffoldKind>(chain: &Chain<K>, key: &RefKey<K>) -> Option<LookupError> {
    let start = chain.iter().position(|k| k == key)?;
    let path = chain
        .iter()
        .skip(start)
        .chain(std::iter::once(key))
        .map(ToString::to_string)
        .collect();
    Some(LookupError::Cycle {
        key: key.to_string(),
        path,
    })
}

#[derive(Debug)]
pub(crate) struct WaitGraph<K: ScaffoldKind> {
    edges: HashMap<RefKey<K>, Vec<RefKey<K>>>,
}

impl<K: ScaffoldKind> WaitGraph<K> {
    pub(crate) fn new() -> Self {
        Self {
            edges: HashMap::new(),
        }
    }

    /// Record that every key in `chain` waits on `target`
    ///
    /// Refused when `target` already (transitively) waits on a key in
    /// `chain`.
    pub(crate) fn enter(&mut self, chain: &Chain<K>, target: &RefKey<K>) -> Result<(), LookupError> {
        if chain.is_empty() {
            return Ok(());
        }
        if let Some(path) = self.path_into(target, chain) {
            return Err(LookupError::Cycle {
                key: target.to_string(),
                path,
            });
        }
        for key in chain {
            self.edges
                .entry(key.clone())
                .or_default()
                .push(target.clone());
        }
        Ok(())
    }

    /// Remove the edges recorded by a matching [`WaitGraph::enter`]
    pub(crate) fn leave(&mut self, chain: &Chain<K>, target: &RefKey<K>) {
        for key in chain {
            let drained = match self.edges.get_mut(key) {
                Some(targets) => {
                    if let Some(index) = targets.iter().position(|t| t == target) {
                        targets.swap_remove(index);
                    }
                    targets.is_empty()
                }
                None => false,
            };
            if drained {
                self.edges.remove(key);
            }
        }
    }

    /// Breadth-first search from `target` to any key in `chain`
    ///
    /// Returns the rendered loop `chain[i] .. -> target -> .. -> chain[i]`.
    fn path_into(&self, target: &RefKey<K>, chain: &Chain<K>) -> Option<Vec<String>> {
        let members: HashSet<&RefKey<K>> = chain.iter().collect();
        let mut parent: HashMap<&RefKey<K>, &RefKey<K>> = HashMap::new();
        let mut seen: HashSet<&RefKey<K>> = HashSet::from([target]);
        let mut queue = VecDeque::from([target]);

        while let Some(current) = queue.pop_front() {
            let Some(next) = self.edges.get(current) else {
                continue;
            };
            for blocked_on in next {
                if !seen.insert(blocked_on) {
                    continue;
                }
                parent.insert(blocked_on, current);
                if members.contains(blocked_on) {
                    return Some(Self::render(chain, target, blocked_on, &parent));
                }
                queue.push_back(blocked_on);
            }
        }
        None
    }

    fn render(
        chain: &Chain<K>,
        target: &RefKey<K>,
        end: &RefKey<K>,
        parent: &HashMap<&RefKey<K>, &RefKey<K>>,
    ) -> Vec<String> {
        let mut back = vec![end];
        let mut cursor = end;
        while cursor != target {
            match parent.get(cursor) {
                Some(&previous) => {
                    cursor = previous;
                    back.push(cursor);
                }
                None => break,
            }
        }
        back.reverse();

        let start = chain.iter().position(|k| k == end).unwrap_or(0);
        chain
            .iter()
            .skip(start)
            .chain(back)
            .map(ToString::to_string)
            .collect()
    }
}

/// Wait-for bookkeeping for one registry
///
/// Every resolver working against the same registry must see the same
/// waits, so the registry owns this and hands it out through
/// [`Registry::waits`](crate::Registry::waits). Clones share one graph.
pub struct Waits<K: ScaffoldKind> {
    graph: Arc<Mutex<WaitGraph<K>>>,
}

impl<K: ScaffoldKind> Waits<K> {
    /// Create empty bookkeeping
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: Arc::new(Mutex::new(WaitGraph::new())),
        }
    }

    /// Number of keys currently blocked on another key
    #[must_use]
    pub fn blocked(&self) -> usize {
        self.graph.lock().edges.len()
    }

    /// Register a wait of every key in `chain` on `target`
    pub(crate) fn enter(
        &self,
        chain: &Chain<K>,
        target: &RefKey<K>,
    ) -> Result<WaitTicket<K>, LookupError> {
        self.graph.lock().enter(chain, target)?;
        Ok(WaitTicket {
            waits: self.clone(),
            chain: chain.clone(),
            target: target.clone(),
        })
    }
}

impl<K: ScaffoldKind> Default for Waits<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ScaffoldKind> Clone for Waits<K> {
    fn clone(&self) -> Self {
        Self {
            graph: Arc::clone(&self.graph),
        }
    }
}

impl<K: ScaffoldKind> fmt::Debug for Waits<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waits")
            .field("blocked", &self.blocked())
            .finish()
    }
}

/// Registered wait; its edges are removed on drop, including cancellation
pub(crate) struct WaitTicket<K: ScaffoldKind> {
    waits: Waits<K>,
    chain: Chain<K>,
    target: RefKey<K>,
}

impl<K: ScaffoldKind> Drop for WaitTicket<K> {
    fn drop(&mut self) {
        self.waits.graph.lock().leave(&self.chain, &self.target);
    }
}
