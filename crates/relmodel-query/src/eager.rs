//! Eager loading configuration.
//!
//! [`EagerLoader`] records which relations to load for a batch of parent
//! records, including nested paths such as `"posts.comments"`. Paths that
//! share a prefix are merged, so `include("posts")` followed by
//! `include("posts.comments")` loads `posts` once.

/// A relation to load, plus relations to load on its results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludePath {
    /// Relation name on the parent.
    pub relationship: String,
    /// Nested relations to load on the related records.
    pub nested: Vec<IncludePath>,
}

impl IncludePath {
    /// Create a new include path for a single relationship.
    #[must_use]
    pub fn new(relationship: impl Into<String>) -> Self {
        Self {
            relationship: relationship.into(),
            nested: Vec::new(),
        }
    }

    /// Add a nested relationship to load.
    #[must_use]
    pub fn nest(mut self, path: IncludePath) -> Self {
        merge_into(&mut self.nested, path);
        self
    }

    fn from_parts(parts: &[&str]) -> Option<Self> {
        let (first, rest) = parts.split_first()?;
        let mut path = IncludePath::new(*first);
        if let Some(nested) = Self::from_parts(rest) {
            path.nested.push(nested);
        }
        Some(path)
    }
}

fn merge_into(paths: &mut Vec<IncludePath>, path: IncludePath) {
    match paths
        .iter_mut()
        .find(|existing| existing.relationship == path.relationship)
    {
        Some(existing) => {
            for nested in path.nested {
                merge_into(&mut existing.nested, nested);
            }
        }
        None => paths.push(path),
    }
}

/// Builder for eager loading configuration.
///
/// # Example
///
/// ```ignore
/// let loader = EagerLoader::new().include("posts.comments").include("roles");
/// let users = ctx.load(&cx, users, &loader).await?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EagerLoader {
    includes: Vec<IncludePath>,
}

impl EagerLoader {
    /// Create a new empty eager loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Include a relation; dotted paths include nested relations.
    ///
    /// Empty segments (`"posts..comments"`, `"."`) are ignored.
    #[must_use]
    pub fn include(mut self, path: &str) -> Self {
        let parts: Vec<&str> = path
            .split('.')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        if let Some(include) = IncludePath::from_parts(&parts) {
            merge_into(&mut self.includes, include);
        }
        self
    }

    /// Include a prebuilt path.
    #[must_use]
    pub fn include_path(mut self, path: IncludePath) -> Self {
        merge_into(&mut self.includes, path);
        self
    }

    /// Drop a previously requested relation.
    ///
    /// A dotted path removes only its last segment; parents stay requested.
    #[must_use]
    pub fn without(mut self, path: &str) -> Self {
        let parts: Vec<&str> = path
            .split('.')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        remove_from(&mut self.includes, &parts);
        self
    }

    /// Get the include paths.
    #[must_use]
    pub fn includes(&self) -> &[IncludePath] {
        &self.includes
    }

    /// Check if any relationships are included.
    #[must_use]
    pub fn has_includes(&self) -> bool {
        !self.includes.is_empty()
    }
}

fn remove_from(paths: &mut Vec<IncludePath>, parts: &[&str]) {
    match parts {
        [] => {}
        [last] => paths.retain(|p| p.relationship != *last),
        [first, rest @ ..] => {
            if let Some(path) = paths.iter_mut().find(|p| p.relationship == *first) {
                remove_from(&mut path.nested, rest);
            }
        }
    }
}

impl<'a> FromIterator<&'a str> for EagerLoader {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), Self::include)
    }
}
