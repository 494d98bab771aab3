//! Binary basket × item incidence matrix.
//!
//! Rows are baskets and columns are items, both sorted by identifier. Storage
//! is sparse: each column keeps the sorted list of rows containing the item,
//! so a cell lookup is a binary search and itemset support reduces to
//! intersecting those lists.

use crate::basket::{BasketId, Baskets, ItemId};
use std::collections::HashMap;

/// Immutable 0/1 membership matrix with identifier indices.
///
/// # Examples
///
/// ```
/// use aprender_basket::basket::{Baskets, Observation};
/// use aprender_basket::matrix::IncidenceMatrix;
///
/// let observations = vec![
///     Observation::new("1", "9", "4", "2017-08-06"),
///     Observation::new("1", "46", "4", "2017-08-21"),
///     Observation::new("2", "9", "4", "2017-08-02"),
/// ];
/// let baskets = Baskets::from_observations(&observations).expect("valid");
/// let matrix = IncidenceMatrix::from_baskets(&baskets);
///
/// assert_eq!(matrix.shape(), (2, 2));
/// assert_eq!(matrix.column_sum(matrix.column_index(&"9_4".parse().unwrap()).unwrap()), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct IncidenceMatrix {
    baskets: Vec<BasketId>,
    items: Vec<ItemId>,
    basket_index: HashMap<BasketId, usize>,
    item_index: HashMap<ItemId, usize>,
    // Sorted row indices per column
    postings: Vec<Vec<usize>>,
    // Distinct items per row
    row_sums: Vec<usize>,
}

impl IncidenceMatrix {
    /// Build the matrix from grouped baskets.
    #[must_use]
    pub fn from_baskets(baskets: &Baskets) -> Self {
        // Both come out of ordered collections, so indices are sorted by identifier
        let basket_ids: Vec<BasketId> = baskets.iter().map(|(id, _)| id.clone()).collect();
        let items: Vec<ItemId> = baskets.items().into_iter().cloned().collect();

        let basket_index: HashMap<BasketId, usize> = basket_ids
            .iter()
            .enumerate()
            .map(|(row, id)| (id.clone(), row))
            .collect();
        let item_index: HashMap<ItemId, usize> = items
            .iter()
            .enumerate()
            .map(|(col, id)| (id.clone(), col))
            .collect();

        let mut postings = vec![Vec::new(); items.len()];
        let mut row_sums = Vec::with_capacity(basket_ids.len());

        // Rows are visited in increasing order, so every column list stays sorted
        for (row, (_, basket_items)) in baskets.iter().enumerate() {
            for item in basket_items {
                postings[item_index[item]].push(row);
            }
            row_sums.push(basket_items.len());
        }

        Self {
            baskets: basket_ids,
            items,
            basket_index,
            item_index,
            postings,
            row_sums,
        }
    }

    /// Returns the shape as (baskets, items).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_cols())
    }

    /// Number of baskets.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.baskets.len()
    }

    /// Number of distinct items.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.items.len()
    }

    /// Gets the cell at (row, col).
    ///
    /// # Panics
    ///
    /// Panics if indices are out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        assert!(row < self.n_rows(), "row {row} out of bounds");
        u8::from(self.postings[col].binary_search(&row).is_ok())
    }

    /// Whether `basket` contains `item`. Unknown identifiers yield `false`.
    #[must_use]
    pub fn contains(&self, basket: &BasketId, item: &ItemId) -> bool {
        match (self.row_index(basket), self.column_index(item)) {
            (Some(row), Some(col)) => self.get(row, col) == 1,
            _ => false,
        }
    }

    /// Row of a basket.
    #[must_use]
    pub fn row_index(&self, basket: &BasketId) -> Option<usize> {
        self.basket_index.get(basket).copied()
    }

    /// Column of an item.
    #[must_use]
    pub fn column_index(&self, item: &ItemId) -> Option<usize> {
        self.item_index.get(item).copied()
    }

    /// Basket identifier of a row.
    #[must_use]
    pub fn basket(&self, row: usize) -> &BasketId {
        &self.baskets[row]
    }

    /// Item identifier of a column.
    #[must_use]
    pub fn item(&self, col: usize) -> &ItemId {
        &self.items[col]
    }

    /// All items in column order.
    #[must_use]
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    /// All baskets in row order.
    #[must_use]
    pub fn baskets(&self) -> &[BasketId] {
        &self.baskets
    }

    /// Number of distinct items in a basket.
    #[must_use]
    pub fn row_sum(&self, row: usize) -> usize {
        self.row_sums[row]
    }

    /// Number of baskets containing an item.
    #[must_use]
    pub fn column_sum(&self, col: usize) -> usize {
        self.postings[col].len()
    }

    /// Sorted rows of the baskets containing an item.
    #[must_use]
    pub fn column_rows(&self, col: usize) -> &[usize] {
        &self.postings[col]
    }

    /// Number of baskets containing every column in `cols`.
    ///
    /// The empty set is contained in every basket.
    #[must_use]
    pub fn support_count(&self, cols: &[usize]) -> usize {
        let mut lists: Vec<&[usize]> = cols.iter().map(|&c| self.column_rows(c)).collect();
        lists.sort_by_key(|rows| rows.len());

        let Some((shortest, rest)) = lists.split_first() else {
            return self.n_rows();
        };

        shortest
            .iter()
            .filter(|&&row| rest.iter().all(|rows| rows.binary_search(&row).is_ok()))
            .count()
    }

    /// Fraction of baskets containing every column in `cols`; 0 for an empty matrix.
    #[must_use]
    pub fn support(&self, cols: &[usize]) -> f64 {
        if self.n_rows() == 0 {
            return 0.0;
        }
        self.support_count(cols) as f64 / self.n_rows() as f64
    }

    /// Fraction of cells set to 1.
    #[must_use]
    pub fn density(&self) -> f64 {
        if self.n_rows() == 0 || self.n_cols() == 0 {
            return 0.0;
        }
        let ones: usize = self.row_sums.iter().sum();
        ones as f64 / (self.n_rows() as f64 * self.n_cols() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basket::Observation;

    fn scenario() -> IncidenceMatrix {
        let observations = vec![
            Observation::new("1", "x", "0", "2017-08-01"),
            Observation::new("1", "y", "0", "2017-08-02"),
            Observation::new("1", "y", "0", "2017-08-03"),
            Observation::new("2", "x", "0", "2017-08-01"),
            Observation::new("2", "y", "0", "2017-08-01"),
            Observation::new("3", "x", "0", "2017-08-01"),
        ];
        let baskets = Baskets::from_observations(&observations).expect("valid");
        IncidenceMatrix::from_baskets(&baskets)
    }

    #[test]
    fn test_shape_and_indices() {
        let m = scenario();
        assert_eq!(m.shape(), (3, 2));

        let x: ItemId = "x_0".parse().expect("valid");
        let y: ItemId = "y_0".parse().expect("valid");
        assert_eq!(m.column_index(&x), Some(0));
        assert_eq!(m.column_index(&y), Some(1));
        assert_eq!(m.item(1), &y);
        assert_eq!(m.basket(0).to_string(), "1_2017-08");
        assert_eq!(m.row_index(m.basket(2)), Some(2));
    }

    #[test]
    fn test_row_sum_counts_distinct_items() {
        let m = scenario();
        // Basket 1 bought y twice, still one cell
        assert_eq!(m.row_sum(0), 2);
        assert_eq!(m.row_sum(1), 2);
        assert_eq!(m.row_sum(2), 1);
    }

    #[test]
    fn test_cells_and_contains() {
        let m = scenario();
        assert_eq!(m.get(2, 0), 1);
        assert_eq!(m.get(2, 1), 0);

        let y: ItemId = "y_0".parse().expect("valid");
        let unknown: ItemId = "z_0".parse().expect("valid");
        assert!(m.contains(m.basket(0), &y));
        assert!(!m.contains(m.basket(2), &y));
        assert!(!m.contains(m.basket(0), &unknown));
    }

    #[test]
    fn test_support_count_intersects_columns() {
        let m = scenario();
        assert_eq!(m.column_sum(0), 3);
        assert_eq!(m.column_sum(1), 2);
        assert_eq!(m.support_count(&[0, 1]), 2);
        assert_eq!(m.support_count(&[]), 3);
        assert!((m.support(&[1]) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_density() {
        let m = scenario();
        assert!((m.density() - 5.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_cells_agree_with_row_sums() {
        let m = scenario();
        for row in 0..m.n_rows() {
            let ones: usize = (0..m.n_cols()).map(|col| usize::from(m.get(row, col))).sum();
            assert_eq!(ones, m.row_sum(row));
        }
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_get_row_out_of_bounds() {
        let m = scenario();
        let _ = m.get(m.n_rows(), 0);
    }

    #[test]
    fn test_empty_matrix() {
        let m = IncidenceMatrix::from_baskets(&Baskets::default());
        assert_eq!(m.shape(), (0, 0));
        assert_eq!(m.support(&[]), 0.0);
        assert_eq!(m.density(), 0.0);
    }
}
