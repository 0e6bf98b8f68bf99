//! Code for handling IDs
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::rc::Rc;

/// A data structure containing records keyed by ID
pub trait IDCollection {
    /// Get the position of the record with the given ID, checking that it exists.
    ///
    /// # Arguments
    ///
    /// * `id` - The ID to look up
    ///
    /// # Returns
    ///
    /// The record's index or an error if not found.
    fn index_of_id(&self, id: &str) -> Result<usize>;
}

impl<T> IDCollection for IndexMap<Rc<str>, T> {
    fn index_of_id(&self, id: &str) -> Result<usize> {
        self.get_index_of(id)
            .with_context(|| format!("Unknown ID {id} found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_of_id() {
        let ids: IndexMap<Rc<str>, u32> = [("north".into(), 1), ("south".into(), 2)]
            .into_iter()
            .collect();

        assert_eq!(ids.index_of_id("south").unwrap(), 1);
        assert!(ids.index_of_id("east").is_err());
    }
}
