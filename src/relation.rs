//! Relation-aware column resolution.
//!
//! A dotted logical column name (`user.profile.city`) is resolved against
//! the relation graph the caller declared up front, yielding the physically
//! addressable column plus the joins needed to reach it. Relation metadata
//! is explicit: a closed [`RelationKind`] carries the key pairs, so nothing
//! is introspected at runtime.

use crate::error::{GridError, Result};

/// Join flavor for a synthesized join.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum JoinType {
    #[default]
    Left,
    Inner,
}

impl JoinType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinType::Left => "LEFT JOIN",
            JoinType::Inner => "INNER JOIN",
        }
    }
}

/// One synthesized join: `kind table ON first = second`, with both sides
/// given as qualified `table.column` names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinSpec {
    pub kind: JoinType,
    pub table: String,
    pub first: String,
    pub second: String,
}

impl JoinSpec {
    fn left(table: &str, first: String, second: String) -> Self {
        Self {
            kind: JoinType::Left,
            table: table.to_owned(),
            first,
            second,
        }
    }
}

/// An intermediate table of a deep relation. Missing keys fall back to
/// convention: `singular(parent table) + "_id"` on this table, `id` on the
/// parent.
#[derive(Clone, Debug)]
pub struct ThroughHop {
    pub table: String,
    pub foreign_key: Option<String>,
    pub local_key: Option<String>,
}

impl ThroughHop {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            foreign_key: None,
            local_key: None,
        }
    }

    pub fn keys(mut self, foreign_key: impl Into<String>, local_key: impl Into<String>) -> Self {
        self.foreign_key = Some(foreign_key.into());
        self.local_key = Some(local_key.into());
        self
    }
}

/// The concrete target a polymorphic relation resolved to for this row set.
#[derive(Clone, Debug)]
pub struct MorphTarget {
    pub table: String,
    pub owner_key: String,
}

/// Closed set of relation kinds with the key-pair metadata needed to join.
#[derive(Clone, Debug)]
pub enum RelationKind {
    BelongsTo {
        foreign_key: String,
        owner_key: String,
    },
    HasOne {
        foreign_key: String,
        local_key: String,
    },
    HasMany {
        foreign_key: String,
        local_key: String,
    },
    BelongsToMany {
        pivot_table: String,
        foreign_pivot_key: String,
        related_pivot_key: String,
        parent_key: String,
        related_key: String,
    },
    /// Polymorphic: join semantics identical to belongs-to once the concrete
    /// target is known. Resolving without one is a fatal error, never a guess.
    MorphTo {
        foreign_key: String,
        concrete: Option<MorphTarget>,
    },
    /// Deep relation reached through intermediate tables.
    Through { hops: Vec<ThroughHop> },
}

/// A named relation in the graph, optionally carrying nested relations for
/// multi-segment paths.
#[derive(Clone, Debug)]
pub struct RelationDef {
    pub name: String,
    pub target_table: String,
    pub kind: RelationKind,
    pub relations: Vec<RelationDef>,
}

impl RelationDef {
    pub fn belongs_to(
        name: impl Into<String>,
        table: impl Into<String>,
        foreign_key: impl Into<String>,
        owner_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target_table: table.into(),
            kind: RelationKind::BelongsTo {
                foreign_key: foreign_key.into(),
                owner_key: owner_key.into(),
            },
            relations: Vec::new(),
        }
    }

    pub fn has_one(
        name: impl Into<String>,
        table: impl Into<String>,
        foreign_key: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target_table: table.into(),
            kind: RelationKind::HasOne {
                foreign_key: foreign_key.into(),
                local_key: local_key.into(),
            },
            relations: Vec::new(),
        }
    }

    pub fn has_many(
        name: impl Into<String>,
        table: impl Into<String>,
        foreign_key: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target_table: table.into(),
            kind: RelationKind::HasMany {
                foreign_key: foreign_key.into(),
                local_key: local_key.into(),
            },
            relations: Vec::new(),
        }
    }

    pub fn belongs_to_many(
        name: impl Into<String>,
        table: impl Into<String>,
        pivot_table: impl Into<String>,
        foreign_pivot_key: impl Into<String>,
        related_pivot_key: impl Into<String>,
        parent_key: impl Into<String>,
        related_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target_table: table.into(),
            kind: RelationKind::BelongsToMany {
                pivot_table: pivot_table.into(),
                foreign_pivot_key: foreign_pivot_key.into(),
                related_pivot_key: related_pivot_key.into(),
                parent_key: parent_key.into(),
                related_key: related_key.into(),
            },
            relations: Vec::new(),
        }
    }

    pub fn morph_to(name: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_table: String::new(),
            kind: RelationKind::MorphTo {
                foreign_key: foreign_key.into(),
                concrete: None,
            },
            relations: Vec::new(),
        }
    }

    /// Pins a polymorphic relation to the concrete type loaded for this
    /// row set.
    pub fn concrete(mut self, table: impl Into<String>, owner_key: impl Into<String>) -> Self {
        let table = table.into();
        if let RelationKind::MorphTo { concrete, .. } = &mut self.kind {
            *concrete = Some(MorphTarget {
                table: table.clone(),
                owner_key: owner_key.into(),
            });
        }
        self.target_table = table;
        self
    }

    pub fn through(
        name: impl Into<String>,
        table: impl Into<String>,
        hops: impl IntoIterator<Item = ThroughHop>,
    ) -> Self {
        Self {
            name: name.into(),
            target_table: table.into(),
            kind: RelationKind::Through {
                hops: hops.into_iter().collect(),
            },
            relations: Vec::new(),
        }
    }

    /// Nests a relation reachable from this one.
    pub fn with(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }
}

/// A resolved relation path: final physical table and column, plus the
/// joins that make the column addressable.
#[derive(Clone, Debug)]
pub struct ResolvedColumn {
    pub table: String,
    pub column: String,
    pub joins: Vec<JoinSpec>,
}

impl ResolvedColumn {
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }
}

/// The eager-load graph the ORM engine resolves dotted columns against.
#[derive(Clone, Debug, Default)]
pub struct RelationGraph {
    pub root_table: String,
    pub relations: Vec<RelationDef>,
}

impl RelationGraph {
    pub fn new(root_table: impl Into<String>) -> Self {
        Self {
            root_table: root_table.into(),
            relations: Vec::new(),
        }
    }

    pub fn with(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    /// Resolves a dotted path. `Ok(None)` means the path is not
    /// relation-backed and should be treated as a literal physical column
    /// (e.g. an already-qualified `table.column`).
    pub fn resolve(&self, path: &str) -> Result<Option<ResolvedColumn>> {
        let mut segments: Vec<&str> = path.split('.').collect();
        let column = match segments.pop() {
            Some(c) if !segments.is_empty() => c,
            _ => return Ok(None),
        };

        let mut current_table = self.root_table.as_str();
        let mut relations = &self.relations;
        let mut joins = Vec::new();

        for (depth, segment) in segments.iter().enumerate() {
            let Some(def) = relations.iter().find(|r| r.name == *segment) else {
                if depth == 0 {
                    // not a declared relation at all; literal column
                    return Ok(None);
                }
                return Err(GridError::UnresolvedColumn(path.to_owned()));
            };
            current_table = self.walk(def, current_table, &mut joins)?;
            relations = &def.relations;
        }

        Ok(Some(ResolvedColumn {
            table: current_table.to_owned(),
            column: column.to_owned(),
            joins,
        }))
    }

    /// Appends the joins for one relation segment and returns the table the
    /// walk continues from.
    fn walk<'a>(
        &self,
        def: &'a RelationDef,
        parent: &str,
        joins: &mut Vec<JoinSpec>,
    ) -> Result<&'a str> {
        let target = def.target_table.as_str();
        match &def.kind {
            RelationKind::BelongsTo {
                foreign_key,
                owner_key,
            } => {
                joins.push(JoinSpec::left(
                    target,
                    format!("{parent}.{foreign_key}"),
                    format!("{target}.{owner_key}"),
                ));
                Ok(target)
            }
            RelationKind::HasOne {
                foreign_key,
                local_key,
            }
            | RelationKind::HasMany {
                foreign_key,
                local_key,
            } => {
                joins.push(JoinSpec::left(
                    target,
                    format!("{parent}.{local_key}"),
                    format!("{target}.{foreign_key}"),
                ));
                Ok(target)
            }
            RelationKind::BelongsToMany {
                pivot_table,
                foreign_pivot_key,
                related_pivot_key,
                parent_key,
                related_key,
            } => {
                joins.push(JoinSpec::left(
                    pivot_table,
                    format!("{parent}.{parent_key}"),
                    format!("{pivot_table}.{foreign_pivot_key}"),
                ));
                joins.push(JoinSpec::left(
                    target,
                    format!("{pivot_table}.{related_pivot_key}"),
                    format!("{target}.{related_key}"),
                ));
                Ok(target)
            }
            RelationKind::MorphTo {
                foreign_key,
                concrete,
            } => {
                let Some(morph) = concrete else {
                    return Err(GridError::UnsupportedRelation(format!(
                        "morph relation {:?} has no concrete target loaded",
                        def.name
                    )));
                };
                joins.push(JoinSpec::left(
                    &morph.table,
                    format!("{parent}.{foreign_key}"),
                    format!("{}.{}", morph.table, morph.owner_key),
                ));
                Ok(target)
            }
            RelationKind::Through { hops } => {
                let mut prev = parent.to_owned();
                for hop in hops {
                    prev = join_hop(hop, &prev, joins);
                }
                // the target itself is the final hop unless already listed
                if hops.last().map(|h| h.table.as_str()) != Some(target) {
                    join_hop(&ThroughHop::new(target), &prev, joins);
                }
                Ok(target)
            }
        }
    }
}

fn join_hop(hop: &ThroughHop, parent: &str, joins: &mut Vec<JoinSpec>) -> String {
    let foreign_key = hop
        .foreign_key
        .clone()
        .unwrap_or_else(|| format!("{}_id", singular(parent)));
    let local_key = hop.local_key.as_deref().unwrap_or("id");
    joins.push(JoinSpec::left(
        &hop.table,
        format!("{parent}.{local_key}"),
        format!("{}.{foreign_key}", hop.table),
    ));
    hop.table.clone()
}

/// Conventional singular form of a table name, for `<table>_id` keys.
fn singular(table: &str) -> String {
    if let Some(stem) = table.strip_suffix("ies") {
        format!("{stem}y")
    } else {
        table.strip_suffix('s').unwrap_or(table).to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> RelationGraph {
        RelationGraph::new("users")
            .with(
                RelationDef::belongs_to("city", "cities", "city_id", "id")
                    .with(RelationDef::belongs_to("country", "countries", "country_id", "id")),
            )
            .with(RelationDef::has_many("posts", "posts", "user_id", "id"))
            .with(RelationDef::belongs_to_many(
                "roles", "roles", "role_user", "user_id", "role_id", "id", "id",
            ))
    }

    #[test]
    fn belongs_to_single_hop() {
        let resolved = graph().resolve("city.name").unwrap().unwrap();
        assert_eq!(resolved.qualified(), "cities.name");
        assert_eq!(
            resolved.joins,
            vec![JoinSpec::left(
                "cities",
                "users.city_id".into(),
                "cities.id".into()
            )]
        );
    }

    #[test]
    fn nested_path_joins_each_table_once() {
        let resolved = graph().resolve("city.country.name").unwrap().unwrap();
        assert_eq!(resolved.qualified(), "countries.name");
        assert_eq!(resolved.joins.len(), 2);
        assert_eq!(resolved.joins[1].table, "countries");
        assert_eq!(resolved.joins[1].first, "cities.country_id");
    }

    #[test]
    fn many_to_many_goes_through_the_pivot() {
        let resolved = graph().resolve("roles.name").unwrap().unwrap();
        assert_eq!(resolved.table, "roles");
        assert_eq!(resolved.joins.len(), 2);
        assert_eq!(resolved.joins[0].table, "role_user");
        assert_eq!(resolved.joins[0].second, "role_user.user_id");
        assert_eq!(resolved.joins[1].first, "role_user.role_id");
    }

    #[test]
    fn undeclared_head_is_a_literal_column() {
        assert!(graph().resolve("users.name").unwrap().is_none());
        assert!(graph().resolve("plain").unwrap().is_none());
    }

    #[test]
    fn broken_chain_is_unresolved() {
        let err = graph().resolve("city.mayor.name").unwrap_err();
        assert!(matches!(err, GridError::UnresolvedColumn(_)));
    }

    #[test]
    fn morph_without_concrete_target_is_unsupported() {
        let g = RelationGraph::new("comments").with(RelationDef::morph_to(
            "commentable",
            "commentable_id",
        ));
        let err = g.resolve("commentable.title").unwrap_err();
        assert!(matches!(err, GridError::UnsupportedRelation(_)));
    }

    #[test]
    fn morph_with_concrete_target_joins_like_belongs_to() {
        let g = RelationGraph::new("comments").with(
            RelationDef::morph_to("commentable", "commentable_id").concrete("posts", "id"),
        );
        let resolved = g.resolve("commentable.title").unwrap().unwrap();
        assert_eq!(resolved.qualified(), "posts.title");
        assert_eq!(resolved.joins[0].second, "posts.id");
    }

    #[test]
    fn deep_relation_uses_convention_for_missing_keys() {
        let g = RelationGraph::new("countries").with(RelationDef::through(
            "posts",
            "posts",
            [ThroughHop::new("users")],
        ));
        let resolved = g.resolve("posts.title").unwrap().unwrap();
        assert_eq!(resolved.joins.len(), 2);
        assert_eq!(resolved.joins[0].second, "users.country_id");
        assert_eq!(resolved.joins[1].first, "users.id");
        assert_eq!(resolved.joins[1].second, "posts.user_id");
    }

    #[test]
    fn deep_relation_honors_explicit_keys() {
        let g = RelationGraph::new("countries").with(RelationDef::through(
            "posts",
            "posts",
            [
                ThroughHop::new("users").keys("home_country", "id"),
                ThroughHop::new("posts").keys("author_id", "id"),
            ],
        ));
        let resolved = g.resolve("posts.title").unwrap().unwrap();
        assert_eq!(resolved.joins.len(), 2);
        assert_eq!(resolved.joins[0].second, "users.home_country");
        assert_eq!(resolved.joins[1].second, "posts.author_id");
    }
}
