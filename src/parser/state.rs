use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

/// Key prefix and type tag identifying menu records in the state mapping.
const MENU_KEY_PREFIX: &str = "Menu:";
const MENU_TYPENAME: &str = "Menu";
const GROUP_TYPENAME: &str = "MenuGroup";
const ITEM_TYPENAME: &str = "MenuItem";
const TYPENAME_FIELD: &str = "__typename";
const REF_FIELD: &str = "__ref";

/// Typed view of the page's state mapping.
///
/// Built once from the parsed literal; downstream code matches on [`Node`]
/// instead of probing raw keys and fields.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedState {
    pub records: BTreeMap<String, Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Menu(MenuRecord),
    Group(GroupRecord),
    Item(ItemRecord),
    Other,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MenuRecord {
    pub name: Option<String>,
    pub groups: Vec<GroupRecord>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupRecord {
    /// `None` when the source group had no string name.
    pub name: Option<String>,
    pub items: Vec<ItemRecord>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemRecord {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Image URLs keyed by size (`xs`, `md`, `xl`, ...).
    pub image_urls: BTreeMap<String, String>,
}

impl EmbeddedState {
    pub fn menus(&self) -> impl Iterator<Item = (&str, &MenuRecord)> {
        self.records.iter().filter_map(|(key, node)| match node {
            Node::Menu(menu) => Some((key.as_str(), menu)),
            _ => None,
        })
    }
}

/// Classify a parsed state literal.
///
/// Only `Menu:`-prefixed entries tagged `__typename: "Menu"` become menu
/// records. Groups and items may be inline objects or `{__ref: key}` pointers;
/// pointers resolve against records already classified, so items are built
/// before groups and groups before menus. Shapes that don't fit are dropped,
/// never fatal.
pub fn classify(root: &Value) -> EmbeddedState {
    let Some(entries) = root.as_object() else {
        debug!("state root is not an object, no records");
        return EmbeddedState::default();
    };

    let mut records: BTreeMap<String, Node> = BTreeMap::new();

    for (key, obj) in tagged(entries, ITEM_TYPENAME) {
        records.insert(key.clone(), Node::Item(item_record(obj)));
    }
    for (key, obj) in tagged(entries, GROUP_TYPENAME) {
        let group = group_record(obj, &records);
        records.insert(key.clone(), Node::Group(group));
    }
    for (key, obj) in tagged(entries, MENU_TYPENAME) {
        if key.starts_with(MENU_KEY_PREFIX) {
            let menu = menu_record(key, obj, &records);
            records.insert(key.clone(), Node::Menu(menu));
        }
    }
    for key in entries.keys() {
        records.entry(key.clone()).or_insert(Node::Other);
    }

    EmbeddedState { records }
}

fn tagged<'a>(
    entries: &'a Map<String, Value>,
    tag: &'a str,
) -> impl Iterator<Item = (&'a String, &'a Map<String, Value>)> + 'a {
    entries.iter().filter_map(move |(key, value)| {
        let obj = value.as_object()?;
        (typename(obj) == Some(tag)).then_some((key, obj))
    })
}

fn typename(obj: &Map<String, Value>) -> Option<&str> {
    obj.get(TYPENAME_FIELD).and_then(Value::as_str)
}

fn ref_target(obj: &Map<String, Value>) -> Option<&str> {
    obj.get(REF_FIELD).and_then(Value::as_str)
}

fn menu_record(key: &str, obj: &Map<String, Value>, records: &BTreeMap<String, Node>) -> MenuRecord {
    let groups = match obj.get("groups") {
        Some(Value::Array(groups)) => groups
            .iter()
            .filter_map(|g| {
                let group = resolve_group(g, records);
                if group.is_none() {
                    debug!(menu = key, "skipping unresolvable group");
                }
                group
            })
            .collect(),
        Some(_) => {
            debug!(menu = key, "menu groups is not an array");
            Vec::new()
        }
        None => Vec::new(),
    };

    MenuRecord {
        name: string_field(obj, "name"),
        groups,
    }
}

fn resolve_group(value: &Value, records: &BTreeMap<String, Node>) -> Option<GroupRecord> {
    let obj = value.as_object()?;
    match ref_target(obj) {
        Some(target) => match records.get(target) {
            Some(Node::Group(group)) => Some(group.clone()),
            _ => None,
        },
        None => Some(group_record(obj, records)),
    }
}

fn group_record(obj: &Map<String, Value>, records: &BTreeMap<String, Node>) -> GroupRecord {
    let items = match obj.get("items") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let item = resolve_item(item, records);
                if item.is_none() {
                    debug!("skipping unresolvable item");
                }
                item
            })
            .collect(),
        _ => Vec::new(),
    };

    GroupRecord {
        name: string_field(obj, "name"),
        items,
    }
}

fn resolve_item(value: &Value, records: &BTreeMap<String, Node>) -> Option<ItemRecord> {
    let obj = value.as_object()?;
    match ref_target(obj) {
        Some(target) => match records.get(target) {
            Some(Node::Item(item)) => Some(item.clone()),
            _ => None,
        },
        None => Some(item_record(obj)),
    }
}

fn item_record(obj: &Map<String, Value>) -> ItemRecord {
    let image_urls = obj
        .get("imageUrls")
        .and_then(Value::as_object)
        .map(|sizes| {
            sizes
                .iter()
                .filter_map(|(size, url)| Some((size.clone(), url.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default();

    ItemRecord {
        name: string_field(obj, "name"),
        description: string_field(obj, "description"),
        image_urls,
    }
}

fn string_field(obj: &Map<String, Value>, field: &str) -> Option<String> {
    obj.get(field).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_prefixed_and_tagged_menus_qualify() {
        let state = classify(&json!({
            "Menu:1": {"__typename": "Menu", "groups": []},
            "Menu:2": {"__typename": "Restaurant"},
            "Other:3": {"__typename": "Menu", "groups": []},
            "ROOT_QUERY": {"x": 1},
        }));
        let keys: Vec<&str> = state.menus().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Menu:1"]);
        assert_eq!(state.records["Other:3"], Node::Other);
    }

    #[test]
    fn inline_groups_and_items() {
        let state = classify(&json!({
            "Menu:1": {
                "__typename": "Menu",
                "name": "Dinner",
                "groups": [{
                    "name": "Pizza",
                    "items": [{
                        "name": "Margherita",
                        "description": "Tomato, mozzarella",
                        "imageUrls": {"xl": "https://img/xl.jpg", "md": "https://img/md.jpg", "raw": null}
                    }]
                }]
            }
        }));
        let (_, menu) = state.menus().next().unwrap();
        assert_eq!(menu.name.as_deref(), Some("Dinner"));
        let item = &menu.groups[0].items[0];
        assert_eq!(item.name.as_deref(), Some("Margherita"));
        assert_eq!(item.image_urls.get("xl").map(String::as_str), Some("https://img/xl.jpg"));
        assert!(!item.image_urls.contains_key("raw"));
    }

    #[test]
    fn referenced_groups_are_resolved() {
        let state = classify(&json!({
            "Menu:1": {"__typename": "Menu", "groups": [{"__ref": "MenuGroup:9"}, {"__ref": "MenuGroup:missing"}]},
            "MenuGroup:9": {"__typename": "MenuGroup", "name": "pizza", "items": [{"name": "Funghi"}]},
        }));
        let (_, menu) = state.menus().next().unwrap();
        assert_eq!(menu.groups.len(), 1);
        assert_eq!(menu.groups[0].items[0].name.as_deref(), Some("Funghi"));
        assert!(matches!(state.records["MenuGroup:9"], Node::Group(_)));
    }

    #[test]
    fn referenced_items_resolve_through_typed_records() {
        let state = classify(&json!({
            "Menu:1": {"__typename": "Menu", "groups": [{"__ref": "MenuGroup:9"}, {"__ref": "MenuItem:5"}]},
            "MenuGroup:9": {
                "__typename": "MenuGroup",
                "name": "pizza",
                "items": [{"__ref": "MenuItem:5"}, {"__ref": "ROOT_QUERY"}, {"name": "Diavola"}]
            },
            "MenuItem:5": {"__typename": "MenuItem", "name": "Funghi", "imageUrls": {"xl": "https://img/f.jpg"}},
            "ROOT_QUERY": {"menus": []},
        }));

        let (_, menu) = state.menus().next().unwrap();
        // a pointer to an item is not a group
        assert_eq!(menu.groups.len(), 1);
        let names: Vec<_> = menu.groups[0].items.iter().map(|i| i.name.as_deref()).collect();
        assert_eq!(names, vec![Some("Funghi"), Some("Diavola")]);
        assert_eq!(
            menu.groups[0].items[0].image_urls.get("xl").map(String::as_str),
            Some("https://img/f.jpg")
        );
        assert!(matches!(&state.records["MenuItem:5"], Node::Item(i) if i.name.as_deref() == Some("Funghi")));
        assert_eq!(state.records["ROOT_QUERY"], Node::Other);
    }

    #[test]
    fn malformed_shapes_are_dropped() {
        let state = classify(&json!({
            "Menu:1": {"__typename": "Menu", "groups": [42, {"name": 7, "items": "nope"}, {"name": "Pizza", "items": [null, {"name": "Diavola"}]}]},
            "Menu:2": {"__typename": "Menu", "groups": "broken"},
        }));
        let menu = match &state.records["Menu:1"] {
            Node::Menu(m) => m,
            other => panic!("expected menu, got {:?}", other),
        };
        assert_eq!(menu.groups.len(), 2);
        assert_eq!(menu.groups[0].name, None);
        assert!(menu.groups[0].items.is_empty());
        assert_eq!(menu.groups[1].items.len(), 1);
        assert!(matches!(&state.records["Menu:2"], Node::Menu(m) if m.groups.is_empty()));
    }

    #[test]
    fn non_object_root() {
        assert!(classify(&json!([1, 2])).records.is_empty());
    }
}
