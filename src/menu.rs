use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::collate;
use crate::parser::state::{EmbeddedState, ItemRecord};

/// One orderable product. Identity is `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl MenuItem {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            image_url: None,
        }
    }
}

/// Items at a point in time: unique names, collated by name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Vec<MenuItem>);

impl Snapshot {
    /// Deduplicate by name (the later item replaces the earlier one) and sort.
    pub fn from_items(items: impl IntoIterator<Item = MenuItem>) -> Self {
        let mut by_name: HashMap<String, MenuItem> = HashMap::new();
        for item in items {
            by_name.insert(item.name.clone(), item);
        }
        let mut keyed: Vec<_> = by_name
            .into_values()
            .map(|item| (collate::sort_key(&item.name), item))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        Snapshot(keyed.into_iter().map(|(_, item)| item).collect())
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MenuItem> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|item| item.name.as_str())
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a MenuItem;
    type IntoIter = std::slice::Iter<'a, MenuItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Which group to watch and which image size to report.
#[derive(Debug, Clone)]
pub struct Projection {
    pub category: String,
    pub image_size: String,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            category: "pizza".to_string(),
            image_size: "xl".to_string(),
        }
    }
}

/// Flatten every item under every group named like the target category,
/// across all menus, into a snapshot.
pub fn project(state: &EmbeddedState, projection: &Projection) -> Snapshot {
    let mut items = Vec::new();

    for (key, menu) in state.menus() {
        for group in &menu.groups {
            let Some(name) = group.name.as_deref() else {
                debug!(menu = key, "skipping group without a name");
                continue;
            };
            if name.to_lowercase() != projection.category.to_lowercase() {
                continue;
            }
            items.extend(
                group
                    .items
                    .iter()
                    .filter_map(|item| project_item(key, item, &projection.image_size)),
            );
        }
    }

    let snapshot = Snapshot::from_items(items);
    debug!(category = %projection.category, items = snapshot.len(), "projected menu");
    snapshot
}

fn project_item(menu: &str, item: &ItemRecord, image_size: &str) -> Option<MenuItem> {
    let name = item.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        warn!(menu = menu, "skipping menu item with empty name");
        return None;
    }
    Some(MenuItem {
        name: name.to_string(),
        description: item.description.clone(),
        image_url: item.image_urls.get(image_size).cloned(),
    })
}
