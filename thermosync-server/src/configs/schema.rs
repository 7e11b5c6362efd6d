use std::collections::HashSet;

use crate::models::{ActivityLogTable, DeviceTable, EventTable, Table};

/// Owns the DDL for every table and emits it in dependency order.
pub struct SchemaManager {
    tables: Vec<Box<dyn Table>>,
}

impl SchemaManager {
    pub fn new(tables: Vec<Box<dyn Table>>) -> Self {
        Self {
            tables: Self::sort_by_dependency(tables),
        }
    }

    fn sort_by_dependency(mut pending: Vec<Box<dyn Table>>) -> Vec<Box<dyn Table>> {
        let mut sorted: Vec<Box<dyn Table>> = Vec::with_capacity(pending.len());
        let mut resolved: HashSet<&'static str> = HashSet::new();

        while !pending.is_empty() {
            let ready: Vec<usize> = pending
                .iter()
                .enumerate()
                .filter(|(_, table)| {
                    table
                        .dependencies()
                        .iter()
                        .all(|dep| resolved.contains(dep))
                })
                .map(|(index, _)| index)
                .collect();

            assert!(
                !ready.is_empty(),
                "circular or unresolvable table dependencies"
            );

            for index in ready.into_iter().rev() {
                let table = pending.swap_remove(index);
                resolved.insert(table.name());
                sorted.push(table);
            }
        }

        sorted
    }

    pub fn create_schema(&self) -> Vec<String> {
        self.tables.iter().map(|table| table.create()).collect()
    }

    pub fn dispose_schema(&self) -> Vec<String> {
        self.tables.iter().rev().map(|table| table.dispose()).collect()
    }
}

impl Default for SchemaManager {
    fn default() -> Self {
        SchemaManager::new(vec![
            Box::new(DeviceTable),
            Box::new(EventTable),
            Box::new(ActivityLogTable),
        ])
    }
}
