use std::collections::HashMap;

use crate::geom::{LocationKey, Point2};

/// Extra elevations recorded at shared locations, such as breaklines from bridges or water edges.
///
/// Each column is kept ascending without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeColumns {
    columns: HashMap<LocationKey, Vec<i32>>,
}

impl NodeColumns {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `z_cm` to the column at `point`; returns false if it was already present.
    pub fn insert(&mut self, point: Point2, z_cm: i32) -> bool {
        let column = self.columns.entry(LocationKey::of(point)).or_default();
        match column.binary_search(&z_cm) {
            Ok(_) => false,
            Err(pos) => {
                column.insert(pos, z_cm);
                true
            }
        }
    }

    /// Column at `point`, empty when nothing was recorded there.
    #[must_use]
    pub fn column(&self, point: Point2) -> &[i32] {
        self.columns
            .get(&LocationKey::of(point))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(Point2, i32)> for NodeColumns {
    fn from_iter<I: IntoIterator<Item = (Point2, i32)>>(iter: I) -> Self {
        let mut columns = Self::new();
        for (p, z) in iter {
            columns.insert(p, z);
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_stay_sorted_and_unique() {
        let mut nc = NodeColumns::new();
        let p = Point2::new(10.0, 20.0);
        assert!(nc.insert(p, 300));
        assert!(nc.insert(p, 100));
        assert!(!nc.insert(p, 300));
        assert!(nc.insert(Point2::new(10.0002, 20.0), 200));

        assert_eq!(nc.column(p), &[100, 200, 300]);
        assert_eq!(nc.len(), 1);
        assert!(nc.column(Point2::new(0.0, 0.0)).is_empty());
    }

    #[test]
    fn test_from_iter() {
        let nc: NodeColumns = [(Point2::new(1.0, 1.0), 5), (Point2::new(2.0, 2.0), 7)]
            .into_iter()
            .collect();
        assert_eq!(nc.len(), 2);
        assert_eq!(nc.column(Point2::new(2.0, 2.0)), &[7]);
    }
}
