use crate::menu::MenuItem;

/// Human-readable change summary plus a representative picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub image_url: Option<String>,
}

/// Build the notification for a non-empty diff.
///
/// `IN: …` lists additions, `OUT: …` removals, one line each.
pub fn compose(added: &[MenuItem], removed: &[MenuItem]) -> Notification {
    let mut message = String::new();

    if !added.is_empty() {
        message.push_str("IN: ");
        message.push_str(&conjunction_list(added));
    }
    if !added.is_empty() && !removed.is_empty() {
        message.push('\n');
    }
    if !removed.is_empty() {
        message.push_str("OUT: ");
        message.push_str(&conjunction_list(removed));
    }

    Notification {
        message: message.trim_end().to_string(),
        image_url: pick_image(added, removed),
    }
}

/// `A`, `A and B`, `A, B, and C`.
fn conjunction_list(items: &[MenuItem]) -> String {
    match items {
        [] => String::new(),
        [one] => one.name.clone(),
        [first, second] => format!("{} and {}", first.name, second.name),
        [init @ .., last] => {
            let head: Vec<&str> = init.iter().map(|i| i.name.as_str()).collect();
            format!("{}, and {}", head.join(", "), last.name)
        }
    }
}

/// First added item's image, else first removed item's image.
fn pick_image(added: &[MenuItem], removed: &[MenuItem]) -> Option<String> {
    added
        .first()
        .and_then(|i| i.image_url.clone())
        .or_else(|| removed.first().and_then(|i| i.image_url.clone()))
}
