//! Minimum spanning tree over 2D points.
//!
//! The node drop connects the nodes of each avoidance component with an MST
//! and reads the adjacency off the tree to decide which branches to merge and
//! where to lean. Group sizes are at most a few hundred points, so a plain
//! O(n²) Prim construction is the right tool; edge weights are squared
//! Euclidean distances in 128-bit arithmetic.

use crate::geometry::Point;
use std::collections::HashMap;

/// A minimum spanning tree, queried through per-point adjacency lists.
#[derive(Debug, Default)]
pub struct MinimumSpanningTree {
    adjacency: HashMap<Point, Vec<Point>>,
}

impl MinimumSpanningTree {
    /// Build the tree over the given points with Prim's algorithm. Input
    /// order does not affect the result: points are sorted first so distance
    /// ties break the same way in every run.
    pub fn new(mut points: Vec<Point>) -> Self {
        points.sort_by_key(|p| (p.x, p.y));
        let mut adjacency: HashMap<Point, Vec<Point>> = HashMap::with_capacity(points.len());
        for p in &points {
            adjacency.insert(*p, Vec::new());
        }
        if points.len() < 2 {
            return Self { adjacency };
        }

        let n = points.len();
        let mut in_tree = vec![false; n];
        let mut best_dist = vec![i128::MAX; n];
        let mut best_parent = vec![0usize; n];

        in_tree[0] = true;
        for i in 1..n {
            best_dist[i] = points[0].distance_squared(&points[i]);
        }

        for _ in 1..n {
            let mut next = usize::MAX;
            let mut next_dist = i128::MAX;
            for i in 0..n {
                if !in_tree[i] && best_dist[i] < next_dist {
                    next_dist = best_dist[i];
                    next = i;
                }
            }

            in_tree[next] = true;
            let parent = points[best_parent[next]];
            let child = points[next];
            if let Some(edges) = adjacency.get_mut(&parent) {
                edges.push(child);
            }
            if let Some(edges) = adjacency.get_mut(&child) {
                edges.push(parent);
            }

            for i in 0..n {
                if !in_tree[i] {
                    let dist = points[next].distance_squared(&points[i]);
                    if dist < best_dist[i] {
                        best_dist[i] = dist;
                        best_parent[i] = next;
                    }
                }
            }
        }

        Self { adjacency }
    }

    /// The tree neighbours of a point. Points not in the tree have none.
    pub fn adjacent_nodes(&self, point: &Point) -> &[Point] {
        self.adjacency
            .get(point)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
