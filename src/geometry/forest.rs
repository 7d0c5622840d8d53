use log::{debug, trace};

use super::contour::Contour;

/// Nesting cutoff for synthesized region forests.
///
/// Children are followed only while their depth is below this value, which
/// drops orphan islands nested inside a hole inside a hole. This is a fixed
/// output policy, not a general even-odd fill evaluator; generalizing it
/// would change the output for existing boards.
pub const MAX_NESTING_DEPTH: usize = 2;

/// Material polarity at a given nesting depth: even depths add copper, odd
/// depths remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Dark,
    Clear,
}

impl Polarity {
    pub fn for_depth(depth: usize) -> Self {
        if depth % 2 == 0 {
            Polarity::Dark
        } else {
            Polarity::Clear
        }
    }
}

/// One polygon of a region forest; children are the material removed (or
/// restored) at the next nesting level.
#[derive(Debug, Clone)]
pub struct ForestNode {
    pub contour: Contour,
    pub children: Vec<ForestNode>,
}

impl ForestNode {
    pub fn new(contour: Contour) -> Self {
        Self {
            contour,
            children: Vec::new(),
        }
    }
}

/// The outcome of a boolean difference: top-level loops are copper, their
/// children holes, their grandchildren islands. Polarity alternates strictly
/// by depth and depth never exceeds [`MAX_NESTING_DEPTH`].
#[derive(Debug, Clone)]
pub struct PolygonForest {
    pub roots: Vec<ForestNode>,
}

impl PolygonForest {
    pub fn single(contour: Contour) -> Self {
        Self {
            roots: vec![ForestNode::new(contour)],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total node count across all depths.
    pub fn node_count(&self) -> usize {
        fn count(node: &ForestNode) -> usize {
            1 + node.children.iter().map(count).sum::<usize>()
        }
        self.roots.iter().map(count).sum()
    }

    /// Nests a flat set of disjoint loops into a forest by containment.
    ///
    /// Loops are placed largest-first; each loop becomes a child of the
    /// smallest already-placed loop that contains it, or a root. Anything
    /// that would land below [`MAX_NESTING_DEPTH`] is discarded.
    pub fn assemble(loops: Vec<Contour>) -> Self {
        let mut indexed: Vec<(f64, Contour)> = loops
            .into_iter()
            .map(|contour| (contour.area().abs(), contour))
            .collect();
        // largest first, so every container precedes its contents
        indexed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut forest = PolygonForest {
            roots: Vec::new(),
        };

        for (_area, contour) in indexed {
            let bbox = contour.bounding_box();
            let probe = contour.representative_point();

            // find the deepest placed node containing this loop
            let mut path: Vec<usize> = Vec::new();
            let mut depth = 0;
            loop {
                let level = forest.level_mut(&path);
                let found = level.iter().position(|node| {
                    node.contour.bounding_box().intersects(&bbox) && node.contour.contains(probe)
                });
                match found {
                    Some(index) => {
                        path.push(index);
                        depth += 1;
                    }
                    None => break,
                }
            }

            if depth > MAX_NESTING_DEPTH {
                debug!("discarding loop nested at depth {} (cutoff {})", depth, MAX_NESTING_DEPTH);
                continue;
            }

            trace!("placing loop at depth {}", depth);
            forest
                .level_mut(&path)
                .push(ForestNode::new(contour));
        }

        forest
    }

    fn level_mut(&mut self, path: &[usize]) -> &mut Vec<ForestNode> {
        let mut level = &mut self.roots;
        for &index in path {
            level = &mut level[index].children;
        }
        level
    }

    /// Walks the forest depth-first, visiting each node with its depth.
    pub fn walk(&self, mut visit: impl FnMut(&ForestNode, usize)) {
        fn recurse(node: &ForestNode, depth: usize, visit: &mut impl FnMut(&ForestNode, usize)) {
            visit(node, depth);
            if depth < MAX_NESTING_DEPTH {
                for child in &node.children {
                    recurse(child, depth + 1, visit);
                }
            }
        }
        for root in &self.roots {
            recurse(root, 0, &mut visit);
        }
    }
}

#[cfg(test)]
mod forest_tests {
    use super::*;
    use crate::spacial::Position;

    fn square(center: (f64, f64), size: f64) -> Contour {
        Contour::rectangle(Position::new(center.0, center.1), size, size, 0.0)
    }

    #[test]
    fn test_assemble_nests_by_containment() {
        let loops = vec![square((0.0, 0.0), 10.0), square((0.0, 0.0), 4.0), square((20.0, 0.0), 6.0)];

        let forest = PolygonForest::assemble(loops);

        assert_eq!(forest.roots.len(), 2);
        let with_child = forest
            .roots
            .iter()
            .find(|root| !root.children.is_empty())
            .expect("one root has a child");
        assert_eq!(with_child.children.len(), 1);
    }

    #[test]
    fn test_assemble_discards_beyond_cutoff() {
        // four concentric squares: depths 0, 1, 2 kept, depth 3 dropped
        let loops = vec![
            square((0.0, 0.0), 16.0),
            square((0.0, 0.0), 12.0),
            square((0.0, 0.0), 8.0),
            square((0.0, 0.0), 4.0),
        ];

        let forest = PolygonForest::assemble(loops);

        assert_eq!(forest.node_count(), 3);
    }

    #[test]
    fn test_polarity_by_depth() {
        assert_eq!(Polarity::for_depth(0), Polarity::Dark);
        assert_eq!(Polarity::for_depth(1), Polarity::Clear);
        assert_eq!(Polarity::for_depth(2), Polarity::Dark);
    }

    #[test]
    fn test_walk_reports_alternating_depths() {
        let loops = vec![square((0.0, 0.0), 16.0), square((0.0, 0.0), 8.0), square((0.0, 0.0), 3.0)];

        let forest = PolygonForest::assemble(loops);

        let mut seen = Vec::new();
        forest.walk(|_node, depth| seen.push(depth));
        assert_eq!(seen, vec![0, 1, 2]);
    }
}
