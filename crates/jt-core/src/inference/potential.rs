//! Dense potential tables over discrete variables.
//!
//! A table covers a scope of variable indices in ascending order and holds
//! one value per joint assignment, row-major with the last variable varying
//! fastest.

use serde::Serialize;

/// Dense table over a sorted scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Potential {
    scope: Vec<usize>,
    cards: Vec<usize>,
    values: Vec<f64>,
}

impl Potential {
    /// Table of ones. `scope` must be sorted and pair with `cards`.
    pub fn ones(scope: Vec<usize>, cards: Vec<usize>) -> Self {
        Self::filled(scope, cards, 1.0)
    }

    pub fn zeros(scope: Vec<usize>, cards: Vec<usize>) -> Self {
        Self::filled(scope, cards, 0.0)
    }

    fn filled(scope: Vec<usize>, cards: Vec<usize>, value: f64) -> Self {
        debug_assert_eq!(scope.len(), cards.len());
        debug_assert!(scope.windows(2).all(|w| w[0] < w[1]));
        let len = cards.iter().product();
        Self {
            scope,
            cards,
            values: vec![value; len],
        }
    }

    pub fn scope(&self) -> &[usize] {
        &self.scope
    }

    pub fn cards(&self) -> &[usize] {
        &self.cards
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Position of `var` in the scope.
    pub fn position(&self, var: usize) -> Option<usize> {
        self.scope.binary_search(&var).ok()
    }

    pub fn contains(&self, var: usize) -> bool {
        self.position(var).is_some()
    }

    /// Row index of a full assignment given in scope order.
    pub fn row_of(&self, states: &[usize]) -> usize {
        states
            .iter()
            .zip(&self.cards)
            .fold(0, |acc, (&s, &c)| acc * c + s)
    }

    /// Decode a row index into per-variable states (scope order).
    pub fn assignment(&self, mut row: usize) -> Vec<usize> {
        let mut states = vec![0; self.cards.len()];
        for (slot, &card) in states.iter_mut().zip(&self.cards).rev() {
            *slot = row % card;
            row /= card;
        }
        states
    }

    /// Rows as `(assignment, value)` pairs.
    pub fn rows(&self) -> impl Iterator<Item = (Vec<usize>, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(row, &v)| (self.assignment(row), v))
    }

    /// Per scope position: the row stride of that variable in `sub`, or 0
    /// when `sub` does not contain it.
    fn offsets_into(&self, sub: &Potential) -> Vec<usize> {
        let mut sub_strides = vec![1usize; sub.cards.len()];
        for i in (0..sub.cards.len().saturating_sub(1)).rev() {
            sub_strides[i] = sub_strides[i + 1] * sub.cards[i + 1];
        }
        self.scope
            .iter()
            .map(|v| sub.position(*v).map_or(0, |j| sub_strides[j]))
            .collect()
    }

    /// Walk every row together with the matching row of a sub-table.
    fn for_each_aligned(&self, offsets: &[usize], mut f: impl FnMut(usize, usize)) {
        let k = self.cards.len();
        let mut states = vec![0usize; k];
        let mut sub = 0usize;
        let len: usize = self.cards.iter().product();
        for row in 0..len {
            f(row, sub);
            let mut i = k;
            while i > 0 {
                i -= 1;
                states[i] += 1;
                sub += offsets[i];
                if states[i] < self.cards[i] {
                    break;
                }
                sub -= offsets[i] * self.cards[i];
                states[i] = 0;
            }
        }
    }

    /// Sum out every variable not in `target`.
    ///
    /// `target` must be a sorted subset of this table's scope.
    pub fn marginalize(&self, target: &[usize]) -> Potential {
        debug_assert!(target.iter().all(|v| self.contains(*v)));
        let cards = target
            .iter()
            .filter_map(|v| self.position(*v).map(|p| self.cards[p]))
            .collect();
        let mut out = Potential::zeros(target.to_vec(), cards);
        let offsets = self.offsets_into(&out);
        let values = &self.values;
        let out_values = &mut out.values;
        self.for_each_aligned(&offsets, |row, sub| out_values[sub] += values[row]);
        out
    }

    /// Multiply every row by the message row it restricts to.
    ///
    /// The message scope must be a subset of this table's scope.
    pub fn absorb(&mut self, message: &Potential) {
        debug_assert!(message.scope.iter().all(|v| self.contains(*v)));
        let offsets = self.offsets_into(message);
        let mut values = std::mem::take(&mut self.values);
        self.for_each_aligned(&offsets, |row, sub| values[row] *= message.values[sub]);
        self.values = values;
    }

    /// Elementwise quotient over the same scope; a zero divisor yields the
    /// dividend unchanged.
    pub fn divide(&self, divisor: &Potential) -> Potential {
        debug_assert_eq!(self.scope, divisor.scope);
        let values = self
            .values
            .iter()
            .zip(&divisor.values)
            .map(|(&n, &d)| if d == 0.0 { n } else { n / d })
            .collect();
        Potential {
            scope: self.scope.clone(),
            cards: self.cards.clone(),
            values,
        }
    }

    /// Zero every row where `var` is not in `state`. No-op if `var` is out
    /// of scope.
    pub fn restrict(&mut self, var: usize, state: usize) {
        let Some(pos) = self.position(var) else {
            return;
        };
        let stride: usize = self.cards[pos + 1..].iter().product();
        let card = self.cards[pos];
        for (row, v) in self.values.iter_mut().enumerate() {
            if (row / stride) % card != state {
                *v = 0.0;
            }
        }
    }

    /// Scale rows to sum to one; returns the original sum. A zero sum
    /// leaves the table untouched.
    pub fn normalize(&mut self) -> f64 {
        let total = self.sum();
        if total != 0.0 {
            for v in &mut self.values {
                *v /= total;
            }
        }
        total
    }

    /// Sum of the rows that agree with every `(var, state)` pair; pairs on
    /// variables outside the scope are ignored.
    pub fn sum_matching(&self, fixed: &[(usize, usize)]) -> f64 {
        let checks: Vec<(usize, usize, usize)> = fixed
            .iter()
            .filter_map(|&(var, state)| {
                self.position(var).map(|pos| {
                    let stride: usize = self.cards[pos + 1..].iter().product();
                    (stride, self.cards[pos], state)
                })
            })
            .collect();
        self.values
            .iter()
            .enumerate()
            .filter(|(row, _)| {
                checks
                    .iter()
                    .all(|&(stride, card, state)| (row / stride) % card == state)
            })
            .map(|(_, v)| v)
            .sum()
    }

    /// Largest absolute elementwise difference (same scope).
    pub fn max_abs_diff(&self, other: &Potential) -> f64 {
        self.values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(scope: &[usize], cards: &[usize], values: &[f64]) -> Potential {
        let mut p = Potential::ones(scope.to_vec(), cards.to_vec());
        p.values_mut().copy_from_slice(values);
        p
    }

    #[test]
    fn test_row_layout_last_fastest() {
        let p = Potential::ones(vec![0, 1], vec![2, 3]);
        assert_eq!(p.len(), 6);
        assert_eq!(p.assignment(0), vec![0, 0]);
        assert_eq!(p.assignment(1), vec![0, 1]);
        assert_eq!(p.assignment(3), vec![1, 0]);
        assert_eq!(p.row_of(&[1, 2]), 5);
    }

    #[test]
    fn test_empty_scope_has_one_row() {
        let p = Potential::ones(vec![], vec![]);
        assert_eq!(p.len(), 1);
        assert_eq!(p.marginalize(&[]).values(), &[1.0]);
    }

    #[test]
    fn test_marginalize_sums_agreeing_rows() {
        // Scope {0, 1}: rows (0,0) (0,1) (1,0) (1,1).
        let p = table(&[0, 1], &[2, 2], &[0.1, 0.2, 0.3, 0.4]);
        let onto_first = p.marginalize(&[0]);
        assert_eq!(onto_first.values(), &[0.1 + 0.2, 0.3 + 0.4]);
        let onto_second = p.marginalize(&[1]);
        assert_eq!(onto_second.values(), &[0.1 + 0.3, 0.2 + 0.4]);
    }

    #[test]
    fn test_marginalize_middle_variable() {
        let p = Potential::ones(vec![0, 1, 2], vec![2, 3, 2]);
        let m = p.marginalize(&[0, 2]);
        assert_eq!(m.cards(), &[2, 2]);
        assert!(m.values().iter().all(|&v| v == 3.0));
    }

    #[test]
    fn test_absorb_multiplies_by_restriction() {
        let mut p = table(&[0, 1], &[2, 2], &[1.0, 2.0, 3.0, 4.0]);
        let msg = table(&[1], &[2], &[10.0, 100.0]);
        p.absorb(&msg);
        assert_eq!(p.values(), &[10.0, 200.0, 30.0, 400.0]);
    }

    #[test]
    fn test_divide_zero_divisor_keeps_dividend() {
        let n = table(&[3], &[3], &[0.5, 0.0, 0.7]);
        let d = table(&[3], &[3], &[0.25, 0.0, 0.0]);
        assert_eq!(n.divide(&d).values(), &[2.0, 0.0, 0.7]);
    }

    #[test]
    fn test_normalize() {
        let mut p = table(&[0], &[2], &[1.0, 3.0]);
        assert_eq!(p.normalize(), 4.0);
        assert_eq!(p.values(), &[0.25, 0.75]);

        let mut z = Potential::zeros(vec![0], vec![2]);
        assert_eq!(z.normalize(), 0.0);
        assert_eq!(z.values(), &[0.0, 0.0]);
    }

    #[test]
    fn test_restrict_and_sum_matching() {
        let mut p = table(&[0, 1], &[2, 2], &[0.1, 0.2, 0.3, 0.4]);
        assert!((p.sum_matching(&[(1, 1)]) - 0.6).abs() < 1e-12);
        assert!((p.sum_matching(&[(0, 1), (1, 0)]) - 0.3).abs() < 1e-12);
        // Out-of-scope pairs are ignored.
        assert!((p.sum_matching(&[(7, 0)]) - 1.0).abs() < 1e-12);

        p.restrict(0, 0);
        assert_eq!(p.values(), &[0.1, 0.2, 0.0, 0.0]);
        p.restrict(9, 0);
        assert_eq!(p.values(), &[0.1, 0.2, 0.0, 0.0]);
    }

    #[test]
    fn test_rows_iterator() {
        let p = table(&[2, 5], &[1, 2], &[0.3, 0.7]);
        let rows: Vec<_> = p.rows().collect();
        assert_eq!(rows, vec![(vec![0, 0], 0.3), (vec![0, 1], 0.7)]);
    }
}
