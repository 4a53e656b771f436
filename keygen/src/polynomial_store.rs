//! Named storage for the polynomials materialized while synthesizing keys.
//!
//! Every polynomial built by the composer (selectors, permutation polynomials, lookup tables,
//! wires) is moved into a [`PolynomialStore`] and retrieved later by its logical name, so that the
//! proving key, the prover and the commitment routines never recompute them.

use std::mem::size_of;

use anyhow::{anyhow, Result};
use hashbrown::HashMap;
use itertools::Itertools;
use log::debug;
use plonky2_field::polynomial::PolynomialValues;
use plonky2_field::types::Field;

/// Owns polynomials in point-value form, keyed by name.
///
/// Insertion moves the polynomial into the store. Borrows handed out by [`PolynomialStore::get`]
/// keep the store immutably borrowed, so they cannot outlive a later [`PolynomialStore::put`] of
/// the same name.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PolynomialStore<F: Field> {
    polynomials: HashMap<String, PolynomialValues<F>>,
}

impl<F: Field> PolynomialStore<F> {
    pub fn new() -> Self {
        Self {
            polynomials: HashMap::new(),
        }
    }

    /// Transfer ownership of `value` to the store, replacing any polynomial previously stored
    /// under `key`.
    pub fn put(&mut self, key: impl Into<String>, value: PolynomialValues<F>) {
        self.polynomials.insert(key.into(), value);
    }

    /// Borrow the polynomial stored under `key`. Fails if there is none.
    pub fn get(&self, key: &str) -> Result<&PolynomialValues<F>> {
        self.polynomials
            .get(key)
            .ok_or_else(|| anyhow!("Polynomial `{}` not found in the polynomial store", key))
    }

    pub fn get_mut(&mut self, key: &str) -> Result<&mut PolynomialValues<F>> {
        self.polynomials
            .get_mut(key)
            .ok_or_else(|| anyhow!("Polynomial `{}` not found in the polynomial store", key))
    }

    /// Take the polynomial stored under `key` back out of the store.
    ///
    /// Panics if `key` is absent; callers are expected to only remove what they inserted.
    pub fn remove(&mut self, key: &str) -> PolynomialValues<F> {
        self.polynomials.remove(key).unwrap_or_else(|| {
            panic!("Attempted to remove polynomial `{key}` which is not in the store")
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.polynomials.contains_key(key)
    }

    /// The number of stored polynomials.
    pub fn len(&self) -> usize {
        self.polynomials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polynomials.is_empty()
    }

    /// The memory used by the values of all stored polynomials, in bytes.
    pub fn size_in_bytes(&self) -> usize {
        self.polynomials
            .values()
            .map(|poly| poly.len() * size_of::<F>())
            .sum()
    }

    /// Iterates over `(name, polynomial)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PolynomialValues<F>)> {
        self.polynomials
            .iter()
            .map(|(name, poly)| (name.as_str(), poly))
    }

    /// The names of all stored polynomials, sorted. Use this wherever the output has to be
    /// deterministic.
    pub fn names_sorted(&self) -> Vec<String> {
        self.polynomials.keys().cloned().sorted().collect()
    }

    /// Log a summary of the store contents.
    pub fn print(&self) {
        debug!("Polynomial store contents:");
        for name in self.names_sorted() {
            let poly = &self.polynomials[&name];
            debug!(
                "- {}: {} values, {} bytes",
                name,
                poly.len(),
                poly.len() * size_of::<F>()
            );
        }
        debug!(
            "{} polynomials, {} bytes in total",
            self.len(),
            self.size_in_bytes()
        );
    }
}

impl<'a, F: Field> IntoIterator for &'a PolynomialStore<F> {
    type Item = (&'a String, &'a PolynomialValues<F>);
    type IntoIter = hashbrown::hash_map::Iter<'a, String, PolynomialValues<F>>;

    fn into_iter(self) -> Self::IntoIter {
        self.polynomials.iter()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use plonky2_field::goldilocks_field::GoldilocksField;
    use plonky2_field::types::Sample;

    use super::*;

    type F = GoldilocksField;

    fn random_poly(len: usize) -> PolynomialValues<F> {
        PolynomialValues::new(F::rand_vec(len))
    }

    #[test]
    fn test_put_get() -> Result<()> {
        let mut store = PolynomialStore::<F>::new();
        let poly = random_poly(16);
        store.put("q_m", poly.clone());

        assert_eq!(store.get("q_m")?, &poly);
        assert!(store.contains("q_m"));
        assert_eq!(store.len(), 1);
        Ok(())
    }

    #[test]
    fn test_put_overwrites() -> Result<()> {
        let mut store = PolynomialStore::<F>::new();
        let first = random_poly(8);
        let second = random_poly(8);
        store.put("sigma_1", first.clone());
        store.put("sigma_1", second.clone());

        assert_eq!(store.get("sigma_1")?, &second);
        assert_ne!(store.get("sigma_1")?, &first);
        assert_eq!(store.len(), 1);
        Ok(())
    }

    #[test]
    fn test_get_missing_fails() {
        let mut store = PolynomialStore::<F>::new();
        store.put("w_l", random_poly(4));
        assert!(store.get("w_r").is_err());
        assert!(store.get_mut("w_r").is_err());
    }

    #[test]
    #[should_panic]
    fn test_remove_missing_panics() {
        let mut store = PolynomialStore::<F>::new();
        store.remove("id_1");
    }

    #[test]
    fn test_remove_returns_polynomial() {
        let mut store = PolynomialStore::<F>::new();
        let poly = random_poly(4);
        store.put("id_1", poly.clone());

        assert_eq!(store.remove("id_1"), poly);
        assert!(!store.contains("id_1"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_size_in_bytes() {
        let mut store = PolynomialStore::<F>::new();
        assert_eq!(store.size_in_bytes(), 0);

        store.put("a", random_poly(8));
        store.put("b", random_poly(32));
        assert_eq!(store.size_in_bytes(), 40 * size_of::<F>());

        store.put("a", random_poly(2));
        assert_eq!(store.size_in_bytes(), 34 * size_of::<F>());

        store.remove("b");
        assert_eq!(store.size_in_bytes(), 2 * size_of::<F>());
    }

    #[test]
    fn test_iteration_visits_every_entry() {
        let mut store = PolynomialStore::<F>::new();
        for name in ["c", "a", "b"] {
            store.put(name, random_poly(4));
        }

        let mut seen = store.iter().map(|(name, _)| name.to_string()).collect::<Vec<_>>();
        seen.sort();
        assert_eq!(seen, store.names_sorted());
        assert_eq!(store.names_sorted(), vec!["a", "b", "c"]);
        assert_eq!((&store).into_iter().count(), 3);
    }
}
