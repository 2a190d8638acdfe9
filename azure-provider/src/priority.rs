//! Security rule priority allocation.

use std::collections::HashSet;

use crate::error::{CloudError, Result};
use crate::resources::SecurityRule;

/// Lowest priority handed out to service rules.
pub const PRIORITY_MIN: u32 = 500;
/// Exclusive upper bound of the priority range.
pub const PRIORITY_MAX: u32 = 4096;

/// Lowest priority in `[PRIORITY_MIN, PRIORITY_MAX)` not used by any rule.
pub fn next_available_priority(rules: &[SecurityRule]) -> Result<u32> {
    let taken: HashSet<u32> = rules.iter().filter_map(|r| r.priority).collect();
    (PRIORITY_MIN..PRIORITY_MAX)
        .find(|p| !taken.contains(p))
        .ok_or(CloudError::OutOfPriorities)
}
