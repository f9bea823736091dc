//! Message merging and capping.

use std::collections::HashMap;

use tether_client::Message;

/// Union two message sequences by ID, then sort ascending by creation time.
///
/// A message seen again replaces the earlier copy's content but keeps its
/// position, so equal timestamps stay in first-arrival order.
pub fn merge_messages(existing: Vec<Message>, incoming: Vec<Message>) -> Vec<Message> {
    let mut merged: Vec<Message> = Vec::with_capacity(existing.len() + incoming.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for message in existing.into_iter().chain(incoming) {
        match positions.get(message.id()) {
            Some(&index) => merged[index] = message,
            None => {
                positions.insert(message.id().to_string(), merged.len());
                merged.push(message);
            }
        }
    }

    merged.sort_by_key(Message::created);
    merged
}

/// Keep the `cap` most recent messages. Returns whether anything was dropped.
pub fn cap_messages(messages: &mut Vec<Message>, cap: usize) -> bool {
    if messages.len() <= cap {
        return false;
    }
    let excess = messages.len() - cap;
    messages.drain(..excess);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(id: &str, created: i64, text: &str) -> Message {
        serde_json::from_value(json!({
            "info": { "id": id, "sessionID": "ses_1", "role": "user", "time": { "created": created } },
            "parts": [{ "type": "text", "text": text }]
        }))
        .unwrap()
    }

    fn ids(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(Message::id).collect()
    }

    #[test]
    fn test_dedupes_and_sorts_regardless_of_order() {
        let a = vec![message("m3", 30, "c"), message("m1", 10, "a")];
        let b = vec![message("m2", 20, "b"), message("m1", 10, "a")];

        let forward = merge_messages(a.clone(), b.clone());
        let backward = merge_messages(b, a);

        assert_eq!(ids(&forward), vec!["m1", "m2", "m3"]);
        assert_eq!(ids(&backward), vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn test_later_copy_wins_content() {
        let merged = merge_messages(
            vec![message("m1", 10, "draft")],
            vec![message("m1", 10, "final")],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].parts[0]["text"], "final");
    }

    #[test]
    fn test_ties_keep_arrival_order() {
        let merged = merge_messages(
            vec![message("b", 5, ""), message("a", 5, "")],
            vec![message("c", 5, "")],
        );
        assert_eq!(ids(&merged), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_cap_keeps_most_recent() {
        let mut messages: Vec<Message> = (0..501)
            .map(|i| message(&format!("m{}", i), i, ""))
            .collect();

        assert!(cap_messages(&mut messages, 500));
        assert_eq!(messages.len(), 500);
        assert_eq!(messages[0].id(), "m1");
        assert_eq!(messages[499].id(), "m500");

        assert!(!cap_messages(&mut messages, 500));
    }
}
