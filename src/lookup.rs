//! Relation lookups against the resource index.
//!
//! Each lookup issues exactly one query through the borrowed
//! [`QueryService`] and shapes the parsed rows into identifiers.

use crate::error::{PartchainError, Result};
use crate::model::{Edge, Predicate, ResourceId, Value};
use crate::query::{Pattern, Query, ResultFormat, Term};
use crate::response::{self, Row};
use crate::service::QueryService;

/// How members are tied to their parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Membership {
    /// `member <predicate> parent`, e.g. isPartOf.
    ChildDeclaresParent(Predicate),
    /// `parent <predicate> member`, e.g. hasPart.
    ParentDeclaresChildren(Predicate),
}

impl Membership {
    pub fn predicate(&self) -> &Predicate {
        match self {
            Membership::ChildDeclaresParent(p) | Membership::ParentDeclaresChildren(p) => p,
        }
    }

    /// Pattern binding `member` to every member of `parent`.
    fn pattern(&self, parent: &ResourceId, member: &'static str) -> Pattern {
        match self {
            Membership::ChildDeclaresParent(p) => {
                Pattern::new(Term::Var(member), p, Term::Resource(parent.clone()))
            }
            Membership::ParentDeclaresChildren(p) => {
                Pattern::new(Term::Resource(parent.clone()), p, Term::Var(member))
            }
        }
    }
}

/// Relation lookups over a borrowed query service.
pub struct RelationLookup<'a, S: QueryService + ?Sized> {
    service: &'a S,
}

impl<'a, S: QueryService + ?Sized> RelationLookup<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self { service }
    }

    async fn run(&self, query: &Query, format: ResultFormat) -> Result<Vec<Row>> {
        let text = query.to_string();
        let body = self.service.tuples(&text, format).await?;
        let rows = response::parse(&body, format)?;
        log::debug!("{} row(s) for: {}", rows.len(), text);
        Ok(rows)
    }

    /// Resources `X` such that `X <predicate> object`; `None` matches any object.
    pub async fn subjects_of(
        &self,
        object: Option<&ResourceId>,
        predicate: &Predicate,
    ) -> Result<Vec<ResourceId>> {
        let query = Query::select(&["subject"]).where_(Pattern::new(
            Term::Var("subject"),
            predicate,
            Term::resource_or_var(object, "other"),
        ));
        self.run(&query, ResultFormat::Simple)
            .await?
            .iter()
            .map(|row| row.resource("subject"))
            .collect()
    }

    /// Values `Y` such that `subject <predicate> Y`; `None` matches any subject.
    pub async fn objects_of(
        &self,
        subject: Option<&ResourceId>,
        predicate: &Predicate,
    ) -> Result<Vec<Value>> {
        let query = Query::select(&["object"]).where_(Pattern::new(
            Term::resource_or_var(subject, "other"),
            predicate,
            Term::Var("object"),
        ));
        self.run(&query, ResultFormat::Simple)
            .await?
            .iter()
            .map(|row| row.value("object"))
            .collect()
    }

    /// The member of `parent` that follows nothing, if there is exactly one.
    ///
    /// Computed server-side as members minus anything with a `follows`
    /// target, whether or not that target is itself a member.
    pub async fn find_head(
        &self,
        parent: &ResourceId,
        membership: &Membership,
        follows: &Predicate,
    ) -> Result<Option<ResourceId>> {
        let query = Query::select(&["object"])
            .where_(membership.pattern(parent, "object"))
            .minus(Pattern::new(Term::Var("object"), follows, Term::Var("other")));
        let mut heads = self
            .run(&query, ResultFormat::Simple)
            .await?
            .iter()
            .map(|row| row.resource("object"))
            .collect::<Result<Vec<_>>>()?;

        match heads.len() {
            0 => Ok(None),
            1 => Ok(heads.pop()),
            _ => Err(PartchainError::AmbiguousHead(heads)),
        }
    }

    /// The single resource that follows `member`, if any.
    pub async fn find_next(
        &self,
        member: &ResourceId,
        follows: &Predicate,
    ) -> Result<Option<ResourceId>> {
        let mut next = self.subjects_of(Some(member), follows).await?;
        match next.len() {
            0 => Ok(None),
            1 => Ok(next.pop()),
            _ => Err(PartchainError::AmbiguousSuccessor {
                predecessor: member.clone(),
                successors: next,
            }),
        }
    }

    /// Every `follows` edge whose successor is a member of `parent`, in one query.
    ///
    /// The predecessor is left unconstrained so references that point outside
    /// the parent still show up.
    pub async fn edges_of(
        &self,
        parent: &ResourceId,
        membership: &Membership,
        follows: &Predicate,
    ) -> Result<Vec<Edge>> {
        let query = Query::select(&["object", "previous"])
            .where_(membership.pattern(parent, "object"))
            .and(Pattern::new(Term::Var("object"), follows, Term::Var("previous")));
        self.run(&query, ResultFormat::Csv)
            .await?
            .iter()
            .map(|row| -> Result<Edge> {
                Ok(Edge::new(row.resource("object")?, row.resource("previous")?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{edge_rows, simple_rows, ScriptedService};
    use crate::vocab::{FOLLOWS, IS_PART_OF};

    const HAS_PART: &str = "info:fedora/fedora-system:def/relations-external#hasPart";

    fn id(s: &str) -> ResourceId {
        ResourceId::new(s).unwrap()
    }

    fn pred(s: &str) -> Predicate {
        Predicate::new(s).unwrap()
    }

    fn part_of() -> Membership {
        Membership::ChildDeclaresParent(pred(IS_PART_OF))
    }

    #[tokio::test]
    async fn test_subjects_of_bound_object() {
        let service = ScriptedService::new()
            .answer("select $subject", &simple_rows("subject", &["page:2", "page:9"]));
        let lookup = RelationLookup::new(&service);

        let subjects = lookup.subjects_of(Some(&id("page:1")), &pred(FOLLOWS)).await.unwrap();
        assert_eq!(subjects, vec![id("page:2"), id("page:9")]);

        let (query, format) = &service.seen()[0];
        assert!(query.ends_with("<info:fedora/page:1>"));
        assert_eq!(*format, ResultFormat::Simple);
    }

    #[tokio::test]
    async fn test_subjects_of_wildcard() {
        let service = ScriptedService::new().answer("$other", "");
        let lookup = RelationLookup::new(&service);
        let subjects = lookup.subjects_of(None, &pred(FOLLOWS)).await.unwrap();
        assert!(subjects.is_empty());
        let expected = format!("$subject <{}> $other", FOLLOWS);
        assert!(service.seen()[0].0.ends_with(&expected));
    }

    #[tokio::test]
    async fn test_subjects_of_rejects_literal() {
        let service = ScriptedService::new().answer("select", "subject : \"oops\"\n");
        let lookup = RelationLookup::new(&service);
        let err = lookup.subjects_of(None, &pred(FOLLOWS)).await.unwrap_err();
        assert!(matches!(err, PartchainError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_objects_of_mixed_values() {
        let body = "object : <info:fedora/marc:7>\nobject : \"Volume 2\"\n";
        let service = ScriptedService::new().answer("select $object", body);
        let lookup = RelationLookup::new(&service);

        let objects = lookup
            .objects_of(Some(&id("book:1")), &pred("http://example.org/rel#label"))
            .await
            .unwrap();
        assert_eq!(
            objects,
            vec![Value::Resource(id("marc:7")), Value::Literal("Volume 2".to_string())]
        );
        assert!(service.seen()[0].0.contains("where <info:fedora/book:1>"));
    }

    #[tokio::test]
    async fn test_find_head_none_one_many() {
        let none = ScriptedService::new().answer("minus", "");
        let lookup = RelationLookup::new(&none);
        let head = lookup.find_head(&id("book:1"), &part_of(), &pred(FOLLOWS)).await;
        assert_eq!(head.unwrap(), None);

        let one = ScriptedService::new().answer("minus", &simple_rows("object", &["page:1"]));
        let lookup = RelationLookup::new(&one);
        assert_eq!(
            lookup.find_head(&id("book:1"), &part_of(), &pred(FOLLOWS)).await.unwrap(),
            Some(id("page:1"))
        );

        let many = ScriptedService::new()
            .answer("minus", &simple_rows("object", &["page:1", "page:5"]));
        let lookup = RelationLookup::new(&many);
        match lookup.find_head(&id("book:1"), &part_of(), &pred(FOLLOWS)).await {
            Err(PartchainError::AmbiguousHead(ids)) => {
                assert_eq!(ids, vec![id("page:1"), id("page:5")])
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_find_head_membership_directions() {
        let service = ScriptedService::new().answer("minus", "");
        let lookup = RelationLookup::new(&service);
        lookup.find_head(&id("book:1"), &part_of(), &pred(FOLLOWS)).await.unwrap();
        let has_part = Membership::ParentDeclaresChildren(pred(HAS_PART));
        lookup.find_head(&id("book:1"), &has_part, &pred(FOLLOWS)).await.unwrap();

        let seen = service.seen();
        let child_side = format!("where $object <{}> <info:fedora/book:1> minus", IS_PART_OF);
        let parent_side = format!("where <info:fedora/book:1> <{}> $object minus", HAS_PART);
        assert!(seen[0].0.contains(&child_side));
        assert!(seen[1].0.contains(&parent_side));
    }

    #[tokio::test]
    async fn test_find_next_ambiguous() {
        let service = ScriptedService::new()
            .answer("select", &simple_rows("subject", &["page:2", "page:3"]));
        let lookup = RelationLookup::new(&service);
        match lookup.find_next(&id("page:1"), &pred(FOLLOWS)).await {
            Err(PartchainError::AmbiguousSuccessor { predecessor, successors }) => {
                assert_eq!(predecessor, id("page:1"));
                assert_eq!(successors.len(), 2);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_find_next_single_and_tail() {
        let service = ScriptedService::new()
            .answer("page:1>", &simple_rows("subject", &["page:2"]))
            .answer("page:2>", "");
        let lookup = RelationLookup::new(&service);
        let next = lookup.find_next(&id("page:1"), &pred(FOLLOWS)).await.unwrap();
        assert_eq!(next, Some(id("page:2")));
        let tail = lookup.find_next(&id("page:2"), &pred(FOLLOWS)).await.unwrap();
        assert_eq!(tail, None);
    }

    #[tokio::test]
    async fn test_edges_of_uses_csv() {
        let service = ScriptedService::new()
            .answer("$previous", &edge_rows(&[("page:2", "page:1"), ("page:3", "page:2")]));
        let lookup = RelationLookup::new(&service);

        let edges = lookup.edges_of(&id("book:1"), &part_of(), &pred(FOLLOWS)).await.unwrap();
        assert_eq!(
            edges,
            vec![
                Edge::new(id("page:2"), id("page:1")),
                Edge::new(id("page:3"), id("page:2")),
            ]
        );
        let (query, format) = &service.seen()[0];
        assert!(query.starts_with("select $object $previous from <#ri> where"));
        assert_eq!(*format, ResultFormat::Csv);
    }

    #[tokio::test]
    async fn test_edges_of_literal_is_malformed() {
        let body = "object,previous\ninfo:fedora/page:2,not-a-resource\n";
        let service = ScriptedService::new().answer("$previous", body);
        let lookup = RelationLookup::new(&service);
        let err = lookup.edges_of(&id("book:1"), &part_of(), &pred(FOLLOWS)).await.unwrap_err();
        assert!(matches!(err, PartchainError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let service = ScriptedService::new();
        let lookup = RelationLookup::new(&service);
        let err = lookup.subjects_of(None, &pred(FOLLOWS)).await.unwrap_err();
        assert!(matches!(err, PartchainError::Transport(_)));
    }
}
