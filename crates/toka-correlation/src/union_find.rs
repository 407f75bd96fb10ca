//! A plain disjoint-set structure used to group findings under the
//! similarity relation (§4.6).
//!
//! Kept deliberately separate from the similarity rule itself: this module
//! knows nothing about findings, only indices, so the equivalence-relation
//! invariants (reflexive, symmetric, transitive closure) can be tested on
//! their own.

pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    /// Create a structure with `len` singleton sets, one per index `0..len`.
    pub fn new(len: usize) -> Self {
        Self { parent: (0..len).collect(), rank: vec![0; len] }
    }

    /// Find the representative of `i`'s set, path-compressing along the way.
    pub fn find(&mut self, i: usize) -> usize {
        if self.parent[i] != i {
            self.parent[i] = self.find(self.parent[i]);
        }
        self.parent[i]
    }

    /// Merge the sets containing `a` and `b`.
    pub fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }

    /// Partition `0..len` into its groups, each sorted ascending, groups
    /// themselves ordered by their lowest member index.
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let len = self.parent.len();
        let mut by_root: std::collections::BTreeMap<usize, Vec<usize>> = std::collections::BTreeMap::new();
        for i in 0..len {
            let root = self.find(i);
            by_root.entry(root).or_default().push(i);
        }
        by_root.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn singletons_are_all_in_their_own_group() {
        let mut uf = UnionFind::new(4);
        let groups = uf.groups();
        assert_eq!(groups, vec![vec![0], vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn union_is_transitive() {
        let mut uf = UnionFind::new(5);
        uf.union(0, 1);
        uf.union(1, 2);
        uf.union(4, 3);
        assert_eq!(uf.find(0), uf.find(2));
        assert_ne!(uf.find(0), uf.find(3));
        assert_eq!(uf.find(3), uf.find(4));
    }

    #[test]
    fn union_is_idempotent() {
        let mut uf = UnionFind::new(3);
        uf.union(0, 1);
        uf.union(0, 1);
        uf.union(1, 0);
        assert_eq!(uf.groups(), vec![vec![0, 1], vec![2]]);
    }

    proptest! {
        /// Every pair unioned together ends up `find`-equal, regardless of
        /// the order the pairs are applied in (symmetry + transitivity of
        /// the induced equivalence relation).
        #[test]
        fn arbitrary_unions_produce_an_equivalence_relation(
            len in 1usize..20,
            pairs in proptest::collection::vec((0usize..20, 0usize..20), 0..30),
        ) {
            let pairs: Vec<(usize, usize)> = pairs.into_iter().filter(|(a, b)| *a < len && *b < len).collect();
            let mut uf = UnionFind::new(len);
            for (a, b) in &pairs {
                uf.union(*a, *b);
            }
            for (a, b) in &pairs {
                prop_assert_eq!(uf.find(*a), uf.find(*b));
            }

            // Reflexivity: every element is equal to itself.
            for i in 0..len {
                prop_assert_eq!(uf.find(i), uf.find(i));
            }

            // Partition covers every index exactly once.
            let groups = uf.groups();
            let mut seen: Vec<usize> = groups.iter().flatten().copied().collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..len).collect::<Vec<_>>());
        }
    }
}
