use indexmap::IndexMap;
use model::records::dump::DumpRecord;

/// Records held back until the whole source has been read, so categories
/// can be processed parents first.
pub struct CategoryQueue<T> {
    categorized: IndexMap<String, Vec<(DumpRecord, T)>>,
    uncategorized: Vec<(DumpRecord, T)>,
}

impl<T> Default for CategoryQueue<T> {
    fn default() -> Self {
        CategoryQueue {
            categorized: IndexMap::new(),
            uncategorized: Vec::new(),
        }
    }
}

impl<T> CategoryQueue<T> {
    pub fn push(&mut self, category: Option<&str>, record: DumpRecord, payload: T) {
        match category {
            Some(category) => self
                .categorized
                .entry(category.to_string())
                .or_default()
                .push((record, payload)),
            None => self.uncategorized.push((record, payload)),
        }
    }

    pub fn len(&self) -> usize {
        self.categorized.values().map(Vec::len).sum::<usize>() + self.uncategorized.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Categories by `rank`, ties broken by first appearance, then the
    /// uncategorized records. Stream order is kept inside each group.
    pub fn into_ordered(
        self,
        rank: impl Fn(&str) -> usize,
    ) -> Vec<(Option<String>, DumpRecord, T)> {
        let mut categories: Vec<_> = self.categorized.into_iter().collect();
        categories.sort_by_key(|(category, _)| rank(category));

        let mut ordered = Vec::with_capacity(self.uncategorized.len());
        for (category, records) in categories {
            ordered.extend(
                records
                    .into_iter()
                    .map(|(record, payload)| (Some(category.clone()), record, payload)),
            );
        }
        ordered.extend(
            self.uncategorized
                .into_iter()
                .map(|(record, payload)| (None, record, payload)),
        );
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(table: &str) -> DumpRecord {
        DumpRecord::new(table, Vec::new(), Vec::new())
    }

    #[test]
    fn test_parents_first_then_uncategorized_in_stream_order() {
        let order = ["locataires", "locaux", "contrats"];
        let rank = |c: &str| order.iter().position(|o| *o == c).unwrap_or(order.len());

        let mut queue = CategoryQueue::default();
        queue.push(Some("contrats"), record("contrat"), 1);
        queue.push(None, record("historique"), 2);
        queue.push(Some("notes"), record("note"), 3);
        queue.push(Some("locataires"), record("locataire"), 4);
        queue.push(None, record("compteur"), 5);
        queue.push(Some("contrats"), record("contrat"), 6);
        queue.push(Some("extras"), record("extra"), 7);
        assert_eq!(queue.len(), 7);

        let payloads: Vec<i32> = queue
            .into_ordered(rank)
            .into_iter()
            .map(|(_, _, p)| p)
            .collect();
        assert_eq!(payloads, vec![4, 1, 6, 3, 7, 2, 5]);
    }
}
