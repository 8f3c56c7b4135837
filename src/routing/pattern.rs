//! Route path patterns.
//!
//! Endpoint paths may be written with `:name` parameters and a trailing
//! `*name` catch-all, or directly in the dispatch table's `{name}` /
//! `{*name}` syntax. Both forms compile to the latter.
//!
//! # Design Decisions
//! - Parameters occupy a whole segment; partial-segment captures are rejected
//! - A catch-all must be the last segment
//! - Parameter names are unique within one path
//! - Two routes sharing a prefix must name the captures in that prefix
//!   identically, or the dispatch table cannot hold both

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("path is empty")]
    Empty,
    #[error("path '{0}' must start with '/'")]
    MissingLeadingSlash(String),
    #[error("path '{path}' has an unnamed or malformed parameter in segment '{segment}'")]
    BadParameter { path: String, segment: String },
    #[error("path '{path}' has a catch-all '{segment}' that is not the last segment")]
    CatchAllNotLast { path: String, segment: String },
    #[error("path '{path}' declares parameter '{name}' more than once")]
    DuplicateParameter { path: String, name: String },
}

/// A validated route path, compiled to dispatch-table syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    route: String,
    params: Vec<String>,
    segments: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Param(String),
    CatchAll(String),
}

/// Two routes whose captures at the same position carry different names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub ours: String,
    pub theirs: String,
}

enum Segment<'a> {
    Literal(&'a str),
    Param(&'a str),
    CatchAll(&'a str),
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn classify(segment: &str) -> Option<Segment<'_>> {
    if let Some(name) = segment.strip_prefix(':') {
        return valid_name(name).then_some(Segment::Param(name));
    }
    if let Some(name) = segment.strip_prefix('*') {
        return valid_name(name).then_some(Segment::CatchAll(name));
    }
    if let Some(inner) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        return match inner.strip_prefix('*') {
            Some(name) => valid_name(name).then_some(Segment::CatchAll(name)),
            None => valid_name(inner).then_some(Segment::Param(inner)),
        };
    }
    if segment.contains(['{', '}']) {
        return None;
    }
    Some(Segment::Literal(segment))
}

impl RoutePattern {
    pub fn parse(path: &str) -> Result<Self, PatternError> {
        if path.is_empty() {
            return Err(PatternError::Empty);
        }
        let rest = path
            .strip_prefix('/')
            .ok_or_else(|| PatternError::MissingLeadingSlash(path.to_string()))?;

        let segments: Vec<&str> = rest.split('/').collect();
        let last = segments.len() - 1;
        let mut route = String::with_capacity(path.len() + 4);
        let mut params: Vec<String> = Vec::new();
        let mut parts: Vec<Part> = Vec::with_capacity(segments.len());

        for (i, raw) in segments.iter().enumerate() {
            let segment = classify(raw).ok_or_else(|| PatternError::BadParameter {
                path: path.to_string(),
                segment: raw.to_string(),
            })?;

            route.push('/');
            let name = match segment {
                Segment::Literal(lit) => {
                    route.push_str(lit);
                    parts.push(Part::Literal(lit.to_string()));
                    continue;
                }
                Segment::Param(name) => {
                    route.push_str(&format!("{{{name}}}"));
                    parts.push(Part::Param(name.to_string()));
                    name
                }
                Segment::CatchAll(name) => {
                    if i != last {
                        return Err(PatternError::CatchAllNotLast {
                            path: path.to_string(),
                            segment: raw.to_string(),
                        });
                    }
                    route.push_str(&format!("{{*{name}}}"));
                    parts.push(Part::CatchAll(name.to_string()));
                    name
                }
            };

            if params.iter().any(|p| p == name) {
                return Err(PatternError::DuplicateParameter {
                    path: path.to_string(),
                    name: name.to_string(),
                });
            }
            params.push(name.to_string());
        }

        Ok(Self {
            route,
            params,
            segments: parts,
        })
    }

    /// The path in dispatch-table syntax.
    pub fn as_route(&self) -> &str {
        &self.route
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// The route with capture names erased, e.g. `/users/{}` or `/files/{*}`.
    ///
    /// Two patterns with the same shape match exactly the same requests.
    pub fn shape(&self) -> String {
        let mut shape = String::with_capacity(self.route.len());
        for part in &self.segments {
            shape.push('/');
            match part {
                Part::Literal(lit) => shape.push_str(lit),
                Part::Param(_) => shape.push_str("{}"),
                Part::CatchAll(_) => shape.push_str("{*}"),
            }
        }
        shape
    }

    /// Check whether both patterns can live in one dispatch table.
    ///
    /// Segments are compared left to right until the paths diverge on a
    /// literal. Captures met before that point must agree in kind and name.
    pub fn conflicts_with(&self, other: &RoutePattern) -> Option<Conflict> {
        for (ours, theirs) in self.segments.iter().zip(&other.segments) {
            match (ours, theirs) {
                (Part::Literal(a), Part::Literal(b)) if a == b => continue,
                (Part::Literal(_), _) | (_, Part::Literal(_)) => return None,
                (Part::Param(a), Part::Param(b)) | (Part::CatchAll(a), Part::CatchAll(b))
                    if a == b =>
                {
                    continue
                }
                _ => {
                    return Some(Conflict {
                        ours: segment_text(ours),
                        theirs: segment_text(theirs),
                    })
                }
            }
        }
        None
    }
}

fn segment_text(part: &Part) -> String {
    match part {
        Part::Literal(lit) => lit.clone(),
        Part::Param(name) => format!("{{{name}}}"),
        Part::CatchAll(name) => format!("{{*{name}}}"),
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_paths() {
        assert_eq!(RoutePattern::parse("/").unwrap().as_route(), "/");
        assert_eq!(RoutePattern::parse("/users").unwrap().as_route(), "/users");
        assert_eq!(RoutePattern::parse("/users/").unwrap().as_route(), "/users/");
    }

    #[test]
    fn test_colon_params_translate() {
        let p = RoutePattern::parse("/users/:id/posts/:post_id").unwrap();
        assert_eq!(p.as_route(), "/users/{id}/posts/{post_id}");
        assert_eq!(p.params(), ["id", "post_id"]);

        let p = RoutePattern::parse("/static/*filepath").unwrap();
        assert_eq!(p.as_route(), "/static/{*filepath}");
    }

    #[test]
    fn test_brace_params_pass_through() {
        let p = RoutePattern::parse("/users/{id}/{*rest}").unwrap();
        assert_eq!(p.as_route(), "/users/{id}/{*rest}");
        assert_eq!(
            RoutePattern::parse("/users/:id").unwrap(),
            RoutePattern::parse("/users/{id}").unwrap()
        );
    }

    #[test]
    fn test_shape_erases_names() {
        let a = RoutePattern::parse("/users/:id/posts/*rest").unwrap();
        let b = RoutePattern::parse("/users/{user_id}/posts/{*tail}").unwrap();
        assert_eq!(a.shape(), "/users/{}/posts/{*}");
        assert_eq!(a.shape(), b.shape());
        assert_ne!(a.as_route(), b.as_route());
    }

    #[test]
    fn test_differently_named_captures_conflict() {
        let by_id = RoutePattern::parse("/users/:id").unwrap();
        let by_user = RoutePattern::parse("/users/:user_id").unwrap();
        let conflict = by_id.conflicts_with(&by_user).unwrap();
        assert_eq!(conflict.ours, "{id}");
        assert_eq!(conflict.theirs, "{user_id}");

        let nested = RoutePattern::parse("/users/:user_id/posts").unwrap();
        assert!(by_id.conflicts_with(&nested).is_some());

        let rest = RoutePattern::parse("/files/*rest").unwrap();
        let other = RoutePattern::parse("/files/{*other}").unwrap();
        assert!(rest.conflicts_with(&other).is_some());

        let param = RoutePattern::parse("/files/:name").unwrap();
        assert!(rest.conflicts_with(&param).is_some());
    }

    #[test]
    fn test_compatible_routes() {
        let by_id = RoutePattern::parse("/users/:id").unwrap();
        for path in ["/users/{id}", "/users/:id/posts", "/users/me", "/orders/:order_id", "/users"] {
            let other = RoutePattern::parse(path).unwrap();
            assert_eq!(by_id.conflicts_with(&other), None, "{path}");
        }
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(RoutePattern::parse(""), Err(PatternError::Empty));
        assert!(matches!(
            RoutePattern::parse("users"),
            Err(PatternError::MissingLeadingSlash(_))
        ));
        assert!(matches!(
            RoutePattern::parse("/users/:"),
            Err(PatternError::BadParameter { .. })
        ));
        assert!(matches!(
            RoutePattern::parse("/users/{id"),
            Err(PatternError::BadParameter { .. })
        ));
        assert!(matches!(
            RoutePattern::parse("/files/*rest/more"),
            Err(PatternError::CatchAllNotLast { .. })
        ));
        assert!(matches!(
            RoutePattern::parse("/a/:id/b/:id"),
            Err(PatternError::DuplicateParameter { .. })
        ));
    }
}
