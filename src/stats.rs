use std::fmt;
use std::ops::AddAssign;

/// Counters of a dataset scan
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stats {
    pub num_nodes: usize,
    pub num_ways: usize,
    pub num_skipped_blocks: usize,
    pub num_skipped_ways: usize,
    pub num_unresolved_node_refs: usize,
    pub num_invalid_node_ids: usize,
}

impl AddAssign for Stats {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.num_nodes += other.num_nodes;
        self.num_ways += other.num_ways;
        self.num_skipped_blocks += other.num_skipped_blocks;
        self.num_skipped_ways += other.num_skipped_ways;
        self.num_unresolved_node_refs += other.num_unresolved_node_refs;
        self.num_invalid_node_ids += other.num_invalid_node_ids;
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(
            f,
            r#"Read:
  nodes:        {}
  ways:         {}
Skipped:
  blocks:       {} (unreadable)
  ways:         {}
  node refs:    {} (unresolved)
  node ids:     {} (invalid)"#,
            self.num_nodes,
            self.num_ways,
            self.num_skipped_blocks,
            self.num_skipped_ways,
            self.num_unresolved_node_refs,
            self.num_invalid_node_ids,
        )
    }
}
