//! Subjects, topics and notes: the three levels of the hierarchy.
//!
//! Every row belongs to exactly one user. Owner ids are never serialised:
//! the owner is always the authenticated caller.

use serde::{Deserialize, Serialize};

use crate::{
  id::{NoteId, SubjectId, TopicId},
  order::ChildOrder,
};

pub type TopicOrder = ChildOrder<TopicId>;
pub type NoteOrder = ChildOrder<NoteId>;

/// A top-level grouping of topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
  pub id:          SubjectId,
  pub name:        String,
  pub topic_order: TopicOrder,
}

/// A grouping of notes inside a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
  pub id:         TopicId,
  pub subject_id: SubjectId,
  pub name:       String,
  pub note_order: NoteOrder,
}

/// Leaf content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
  pub id:       NoteId,
  pub topic_id: TopicId,
  pub text:     String,
}

// ─── Trees ───────────────────────────────────────────────────────────────────

/// A topic together with its notes, arranged by `note_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicTree {
  #[serde(flatten)]
  pub topic: Topic,
  pub notes: Vec<Note>,
}

/// A subject together with its topics (and their notes), arranged by
/// `topic_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectTree {
  #[serde(flatten)]
  pub subject: Subject,
  pub topics:  Vec<TopicTree>,
}

impl TopicTree {
  /// Attach `notes` to `topic`, keeping only notes that belong to it.
  pub fn assemble(topic: Topic, notes: Vec<Note>) -> Self {
    let own = notes.into_iter().filter(|n| n.topic_id == topic.id).collect();
    let notes = topic.note_order.arrange(own, |n| n.id);
    Self { topic, notes }
  }
}

impl SubjectTree {
  /// Build the tree for `subject` from flat topic and note lists.
  pub fn assemble(subject: Subject, topics: Vec<Topic>, notes: &[Note]) -> Self {
    let trees = topics
      .into_iter()
      .filter(|t| t.subject_id == subject.id)
      .map(|t| {
        let own = notes.iter().filter(|n| n.topic_id == t.id).cloned().collect();
        TopicTree::assemble(t, own)
      })
      .collect();
    let topics = subject.topic_order.arrange(trees, |t| t.topic.id);
    Self { subject, topics }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn note(id: i64, topic: i64) -> Note {
    Note { id: NoteId(id), topic_id: TopicId(topic), text: format!("n{id}") }
  }

  #[test]
  fn subject_tree_is_arranged_and_scoped() {
    let subject = Subject {
      id:          SubjectId(1),
      name:        "Math".into(),
      topic_order: vec![TopicId(11), TopicId(10)].into(),
    };
    let topics = vec![
      Topic {
        id:         TopicId(10),
        subject_id: SubjectId(1),
        name:       "Algebra".into(),
        note_order: vec![NoteId(101), NoteId(100)].into(),
      },
      Topic {
        id:         TopicId(11),
        subject_id: SubjectId(1),
        name:       "Geometry".into(),
        note_order: ChildOrder::new(),
      },
    ];
    let notes = vec![note(100, 10), note(101, 10), note(200, 99)];

    let tree = SubjectTree::assemble(subject, topics, &notes);
    let topic_ids: Vec<_> = tree.topics.iter().map(|t| t.topic.id).collect();
    assert_eq!(topic_ids, vec![TopicId(11), TopicId(10)]);
    let note_ids: Vec<_> = tree.topics[1].notes.iter().map(|n| n.id).collect();
    assert_eq!(note_ids, vec![NoteId(101), NoteId(100)]);
    assert!(tree.topics[0].notes.is_empty());
  }

  #[test]
  fn serialises_with_camel_case_order_fields() {
    let subject = Subject {
      id:          SubjectId(1),
      name:        "Math".into(),
      topic_order: vec![TopicId(10)].into(),
    };
    let json = serde_json::to_value(SubjectTree { subject, topics: vec![] }).unwrap();
    assert_eq!(json["topicOrder"], serde_json::json!([10]));
    assert_eq!(json["id"], serde_json::json!(1));
    assert_eq!(json["topics"], serde_json::json!([]));
  }
}
