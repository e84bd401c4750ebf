//! Per-group priority weights used when the upstream proxy flattens qualities.

use std::collections::HashMap;

/// Weight used for unlisted groups when the configuration has no `=weight` entry.
pub const DEFAULT_PRIORITY: f64 = 0.1;

/// Maps lower-cased group names to priority weights.
///
/// Built from a configuration value such as `=0.1,Admin=0.5,Delinquent=1.0`.
/// The entry with an empty group name is the default for every unlisted
/// group; without one, [`DEFAULT_PRIORITY`] applies.
///
/// Weights are stored exactly as configured. They are not clamped to `[0, 1]`
/// or rounded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupPriorities {
    priorities: HashMap<String, f64>,
}

impl GroupPriorities {
    /// Parse a comma-separated list of `group=weight` pairs.
    ///
    /// Pairs whose weight is not a valid float are skipped. A later pair for
    /// the same group overrides an earlier one.
    pub fn new(conf_value: &str) -> Self {
        let mut priorities = HashMap::new();

        for group_spec in conf_value.split(',') {
            let group_spec = group_spec.trim();
            let (group, prio) = group_spec.split_once('=').unwrap_or((group_spec, ""));

            let Ok(prio) = prio.trim().parse::<f64>() else {
                continue;
            };

            priorities.insert(group.trim().to_lowercase(), prio);
        }

        Self { priorities }
    }

    /// Priority for a group; callers pass the name already lower-cased.
    ///
    /// Never fails: unknown groups get [`Self::default_priority`].
    pub fn get(&self, group: &str) -> f64 {
        match self.priorities.get(group) {
            Some(prio) => *prio,
            None => self.default_priority(),
        }
    }

    /// Weight configured under the empty group name, or [`DEFAULT_PRIORITY`].
    pub fn default_priority(&self) -> f64 {
        self.priorities.get("").copied().unwrap_or(DEFAULT_PRIORITY)
    }

    pub fn len(&self) -> usize {
        self.priorities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.priorities.is_empty()
    }
}
