use std::collections::VecDeque;

use super::*;

/// Which decorated table and column a header cell sorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HeaderBinding {
    pub(crate) table_slot: usize,
    pub(crate) column: usize,
}

#[derive(Debug, Default)]
pub(crate) struct HandlerStore {
    bindings: HashMap<NodeId, HeaderBinding>,
}

impl HandlerStore {
    pub(crate) fn bind(&mut self, header: NodeId, binding: HeaderBinding) -> Option<HeaderBinding> {
        self.bindings.insert(header, binding)
    }

    pub(crate) fn get(&self, header: NodeId) -> Option<HeaderBinding> {
        self.bindings.get(&header).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.bindings.len()
    }
}

#[derive(Debug)]
pub(crate) struct TraceState {
    pub(crate) enabled: bool,
    pub(crate) logs: VecDeque<String>,
    pub(crate) log_limit: usize,
}

impl Default for TraceState {
    fn default() -> Self {
        Self {
            enabled: false,
            logs: VecDeque::new(),
            log_limit: 10_000,
        }
    }
}

impl TraceState {
    pub(crate) fn line(&mut self, line: String) {
        log::trace!(target: "sortable_table::trace", "{line}");
        if !self.enabled || self.log_limit == 0 {
            return;
        }
        while self.logs.len() >= self.log_limit {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    pub(crate) fn set_limit(&mut self, limit: usize) {
        self.log_limit = limit;
        while self.logs.len() > limit {
            self.logs.pop_front();
        }
    }

    pub(crate) fn take(&mut self) -> Vec<String> {
        self.logs.drain(..).collect()
    }
}
