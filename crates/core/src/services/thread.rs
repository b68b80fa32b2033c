//! Answer thread assembly.
//!
//! Answers of a question are loaded in one query and arranged into a tree in
//! memory. The tree is an arena: nodes are addressed by index and hold the
//! indices of their direct replies, so nothing points back at a parent.

use std::{collections::HashMap, fmt, str::FromStr};

use quorum_common::{AppError, AppResult, config::ThreadConfig};
use quorum_db::{
    entities::{answer, vote::TargetKind},
    repositories::{AnswerRepository, QuestionRepository},
};
use serde::{Deserialize, Serialize};

use super::tally::TallyService;

/// Ordering of sibling answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadOrder {
    /// Oldest first.
    #[default]
    Chronological,
    /// Highest vote sum first, oldest first among equals.
    Votes,
}

impl ThreadOrder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chronological => "chronological",
            Self::Votes => "votes",
        }
    }
}

impl fmt::Display for ThreadOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreadOrder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chronological" => Ok(Self::Chronological),
            "votes" => Ok(Self::Votes),
            _ => Err(AppError::BadRequest(format!("Unknown thread order: {s}"))),
        }
    }
}

/// An answer with its tally and the replies expanded below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerNode {
    pub answer: answer::Model,
    pub votes_count: i64,
    /// Direct replies stored for this answer, expanded or not.
    pub replies_count: usize,
    pub children: Vec<AnswerNode>,
}

struct Arena {
    answers: Vec<Option<answer::Model>>,
    replies: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl Arena {
    /// Index answers by id and link every reply to its parent.
    ///
    /// Answers whose parent is not among `answers` are left unlinked.
    fn new(answers: Vec<answer::Model>) -> Self {
        let index: HashMap<&str, usize> = answers
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id.as_str(), i))
            .collect();

        let mut replies = vec![Vec::new(); answers.len()];
        let mut roots = Vec::new();
        for (i, a) in answers.iter().enumerate() {
            match a.parent_answer_id.as_deref() {
                None => roots.push(i),
                Some(parent) => {
                    if let Some(&p) = index.get(parent) {
                        replies[p].push(i);
                    }
                }
            }
        }

        Self {
            answers: answers.into_iter().map(Some).collect(),
            replies,
            roots,
        }
    }
}

/// Arrange answers into a tree at most `max_depth` levels below the roots.
///
/// `answers` must be in creation order. A node at depth `d` (roots are 0)
/// expands its replies only while `d < max_depth`.
#[must_use]
pub fn build_thread(
    answers: Vec<answer::Model>,
    tallies: &HashMap<String, i64>,
    max_depth: usize,
    order: ThreadOrder,
) -> Vec<AnswerNode> {
    let mut arena = Arena::new(answers);

    // Breadth-first, so every reply is visited after its parent.
    let mut visit: Vec<(usize, bool)> = Vec::with_capacity(arena.answers.len());
    let mut level = arena.roots.clone();
    let mut depth = 0;
    while !level.is_empty() {
        let expand = depth < max_depth;
        let mut next = Vec::new();
        for &i in &level {
            visit.push((i, expand));
            if expand {
                next.extend_from_slice(&arena.replies[i]);
            }
        }
        level = next;
        depth += 1;
    }

    let mut built: Vec<Option<AnswerNode>> = (0..arena.answers.len()).map(|_| None).collect();
    for &(i, expand) in visit.iter().rev() {
        let Some(answer) = arena.answers[i].take() else {
            continue;
        };
        let reply_indices = &arena.replies[i];
        let mut children = Vec::new();
        if expand {
            children.extend(reply_indices.iter().filter_map(|&r| built[r].take()));
            sort_siblings(&mut children, order);
        }

        built[i] = Some(AnswerNode {
            votes_count: tallies.get(&answer.id).copied().unwrap_or(0),
            replies_count: reply_indices.len(),
            answer,
            children,
        });
    }

    let mut roots: Vec<AnswerNode> = arena
        .roots
        .iter()
        .filter_map(|&i| built[i].take())
        .collect();
    sort_siblings(&mut roots, order);
    roots
}

fn sort_siblings(nodes: &mut [AnswerNode], order: ThreadOrder) {
    if order == ThreadOrder::Votes {
        nodes.sort_by(|a, b| b.votes_count.cmp(&a.votes_count));
    }
}

/// Thread service for assembling answer trees.
#[derive(Clone)]
pub struct ThreadService {
    question_repo: QuestionRepository,
    answer_repo: AnswerRepository,
    tally: TallyService,
    config: ThreadConfig,
}

impl ThreadService {
    /// Create a new thread service.
    #[must_use]
    pub const fn new(
        question_repo: QuestionRepository,
        answer_repo: AnswerRepository,
        tally: TallyService,
        config: ThreadConfig,
    ) -> Self {
        Self {
            question_repo,
            answer_repo,
            tally,
            config,
        }
    }

    /// Assemble the answer tree of a question.
    ///
    /// `max_depth` falls back to the configured depth when absent and is
    /// capped at `thread.max_depth_limit`.
    pub async fn assemble_thread(
        &self,
        question_id: &str,
        max_depth: Option<usize>,
        order: ThreadOrder,
    ) -> AppResult<Vec<AnswerNode>> {
        let (_, answers) = tokio::try_join!(
            self.question_repo.get_by_id(question_id),
            self.answer_repo.find_by_question(question_id),
        )?;

        let ids: Vec<String> = answers.iter().map(|a| a.id.clone()).collect();
        let tallies = self.tally.get_tallies(TargetKind::Answer, &ids).await?;
        let max_depth = max_depth
            .unwrap_or(self.config.max_depth)
            .min(self.config.max_depth_limit);

        tracing::debug!(
            question_id = %question_id,
            answers = answers.len(),
            max_depth,
            order = %order,
            "Assembling answer thread"
        );

        Ok(build_thread(answers, &tallies, max_depth, order))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use quorum_db::{entities::question, repositories::VoteRepository};
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::sync::Arc;

    fn create_test_answer(id: &str, parent: Option<&str>, minute: i64) -> answer::Model {
        let at = Utc::now() - Duration::minutes(100 - minute);
        answer::Model {
            id: id.to_string(),
            body: format!("answer {id}"),
            question_id: "q1".to_string(),
            user_id: "user1".to_string(),
            parent_answer_id: parent.map(str::to_string),
            created_at: at.into(),
            updated_at: at.into(),
        }
    }

    /// r1 -> c1 -> g1 -> x1, r1 -> c2, r2
    fn sample_answers() -> Vec<answer::Model> {
        vec![
            create_test_answer("r1", None, 0),
            create_test_answer("c1", Some("r1"), 1),
            create_test_answer("r2", None, 2),
            create_test_answer("c2", Some("r1"), 3),
            create_test_answer("g1", Some("c1"), 4),
            create_test_answer("x1", Some("g1"), 5),
        ]
    }

    fn ids(nodes: &[AnswerNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.answer.id.as_str()).collect()
    }

    fn depth(nodes: &[AnswerNode]) -> usize {
        nodes
            .iter()
            .map(|n| 1 + depth(&n.children))
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn test_chronological_tree() {
        let tree = build_thread(sample_answers(), &HashMap::new(), 2, ThreadOrder::Chronological);

        assert_eq!(ids(&tree), vec!["r1", "r2"]);
        assert_eq!(ids(&tree[0].children), vec!["c1", "c2"]);
        assert_eq!(ids(&tree[0].children[0].children), vec!["g1"]);
        assert_eq!(tree[0].replies_count, 2);
        assert_eq!(tree[1].replies_count, 0);
    }

    #[test]
    fn test_depth_is_bounded() {
        let tree = build_thread(sample_answers(), &HashMap::new(), 2, ThreadOrder::Chronological);
        let g1 = &tree[0].children[0].children[0];

        assert_eq!(depth(&tree), 3);
        assert!(g1.children.is_empty());
        assert_eq!(g1.replies_count, 1);
    }

    #[test]
    fn test_zero_depth_returns_roots_only() {
        let tree = build_thread(sample_answers(), &HashMap::new(), 0, ThreadOrder::Chronological);

        assert_eq!(ids(&tree), vec!["r1", "r2"]);
        assert!(tree.iter().all(|n| n.children.is_empty()));
        assert_eq!(tree[0].replies_count, 2);
    }

    #[test]
    fn test_votes_order_is_stable() {
        let tallies: HashMap<String, i64> = [("r2", 3), ("c2", 1)]
            .into_iter()
            .map(|(id, v)| (id.to_string(), v))
            .collect();
        let mut answers = sample_answers();
        answers.push(create_test_answer("r3", None, 6));

        let tree = build_thread(answers, &tallies, 2, ThreadOrder::Votes);

        assert_eq!(ids(&tree), vec!["r2", "r1", "r3"]);
        assert_eq!(tree[0].votes_count, 3);
        let r1 = &tree[1];
        assert_eq!(ids(&r1.children), vec!["c2", "c1"]);
    }

    #[test]
    fn test_orphans_are_not_rendered() {
        let answers = vec![
            create_test_answer("r1", None, 0),
            create_test_answer("lost", Some("elsewhere"), 1),
        ];

        let tree = build_thread(answers, &HashMap::new(), 2, ThreadOrder::Chronological);

        assert_eq!(ids(&tree), vec!["r1"]);
        assert!(tree[0].children.is_empty());
    }

    fn reply_chain(len: usize) -> Vec<answer::Model> {
        let base = create_test_answer("a0", None, 0);
        (0..len)
            .map(|i| answer::Model {
                id: format!("a{i}"),
                parent_answer_id: i.checked_sub(1).map(|p| format!("a{p}")),
                ..base.clone()
            })
            .collect()
    }

    #[test]
    fn test_long_reply_chain_is_bounded_by_depth() {
        let tree = build_thread(reply_chain(200_000), &HashMap::new(), 16, ThreadOrder::Votes);

        assert_eq!(ids(&tree), vec!["a0"]);
        assert_eq!(depth(&tree), 17);
    }

    #[test]
    fn test_unbounded_depth_expands_whole_chain() {
        let tree = build_thread(
            reply_chain(2_000),
            &HashMap::new(),
            usize::MAX,
            ThreadOrder::Chronological,
        );

        let mut levels = 0;
        let mut node = &tree[0];
        while let Some(child) = node.children.first() {
            assert_eq!(node.replies_count, 1);
            node = child;
            levels += 1;
        }
        assert_eq!(levels, 1_999);
        assert_eq!(node.answer.id, "a1999");
    }

    #[test]
    fn test_thread_order_parse() {
        assert_eq!("votes".parse::<ThreadOrder>().unwrap(), ThreadOrder::Votes);
        assert_eq!(ThreadOrder::default(), ThreadOrder::Chronological);
        assert!(matches!(
            "random".parse::<ThreadOrder>(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_assemble_thread_uses_configured_depth() {
        let question = question::Model {
            id: "q1".to_string(),
            title: "Title".to_string(),
            body: "Body".to_string(),
            user_id: "user1".to_string(),
            topic_id: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        };
        let vote_db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![
            maplit::btreemap! {
                "target_id" => Value::from("c1"),
                "total" => Value::BigInt(Some(5)),
            },
        ]]);
        let question_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[question]])
                .into_connection(),
        );
        let answer_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([sample_answers()])
                .into_connection(),
        );
        let empty = || Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let tally = TallyService::new(
            VoteRepository::new(Arc::new(vote_db.into_connection())),
            QuestionRepository::new(empty()),
            AnswerRepository::new(empty()),
        );
        let service = ThreadService::new(
            QuestionRepository::new(question_db),
            AnswerRepository::new(answer_db),
            tally,
            ThreadConfig {
                max_depth: 1,
                max_depth_limit: 16,
            },
        );

        let tree = service
            .assemble_thread("q1", None, ThreadOrder::Chronological)
            .await
            .unwrap();

        assert_eq!(depth(&tree), 2);
        assert_eq!(tree[0].children[0].votes_count, 5);
        assert_eq!(tree[0].children[0].replies_count, 1);
    }

    #[tokio::test]
    async fn test_assemble_thread_caps_requested_depth() {
        let question = question::Model {
            id: "q1".to_string(),
            title: "Title".to_string(),
            body: "Body".to_string(),
            user_id: "user1".to_string(),
            topic_id: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        };
        let vote_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<std::collections::BTreeMap<&str, Value>>::new()]);
        let question_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[question]])
                .into_connection(),
        );
        let answer_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([reply_chain(50)])
                .into_connection(),
        );
        let empty = || Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = ThreadService::new(
            QuestionRepository::new(question_db),
            AnswerRepository::new(answer_db),
            TallyService::new(
                VoteRepository::new(Arc::new(vote_db.into_connection())),
                QuestionRepository::new(empty()),
                AnswerRepository::new(empty()),
            ),
            ThreadConfig {
                max_depth: 2,
                max_depth_limit: 4,
            },
        );

        let tree = service
            .assemble_thread("q1", Some(usize::MAX), ThreadOrder::Chronological)
            .await
            .unwrap();

        assert_eq!(depth(&tree), 5);
    }

    #[tokio::test]
    async fn test_assemble_thread_missing_question() {
        let empty = || Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let question_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<question::Model>::new()])
                .into_connection(),
        );
        let answer_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<answer::Model>::new()])
                .into_connection(),
        );

        let service = ThreadService::new(
            QuestionRepository::new(question_db),
            AnswerRepository::new(answer_db),
            TallyService::new(
                VoteRepository::new(empty()),
                QuestionRepository::new(empty()),
                AnswerRepository::new(empty()),
            ),
            ThreadConfig::default(),
        );

        let result = service
            .assemble_thread("gone", None, ThreadOrder::Chronological)
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
