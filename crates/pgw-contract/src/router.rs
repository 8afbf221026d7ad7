//! # Route Matching
//!
//! Structural matching of a request method and path against one contract's
//! path templates. Literal segments must match exactly; a templated segment
//! binds the corresponding (percent-decoded) path component.
//!
//! Precedence is fixed when the matcher is built: paths without template
//! variables are tried first, then templated paths in document order, so
//! the first templated path declared wins when two could match.

use percent_encoding::percent_decode_str;
use pgw_core::{HttpMethod, PathParams, RouteMatch};

use crate::document::ContractDocument;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Text(String),
    Variable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// One or more `{name}` variables, possibly mixed with literal text,
    /// e.g. `{name}.{ext}` or `v{major}`.
    Template(Vec<Part>),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        if !raw.contains('{') {
            return Self::Literal(raw.to_string());
        }
        let mut parts = Vec::new();
        let mut rest = raw;
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|c| open + c) else {
                break;
            };
            if open > 0 {
                parts.push(Part::Text(rest[..open].to_string()));
            }
            parts.push(Part::Variable(rest[open + 1..close].to_string()));
            rest = &rest[close + 1..];
        }
        if !rest.is_empty() {
            parts.push(Part::Text(rest.to_string()));
        }
        Self::Template(parts)
    }

    /// Bind this segment against one request path component.
    ///
    /// Variables bind left to right; each takes the shortest non-empty
    /// run that lets the following literal text match.
    fn bind(&self, component: &str, params: &mut PathParams) -> bool {
        let parts = match self {
            Self::Literal(literal) => return literal == component || *literal == decode(component),
            Self::Template(parts) => parts,
        };
        let mut bound = Vec::new();
        let mut rest = component;
        for (i, part) in parts.iter().enumerate() {
            match part {
                Part::Text(text) => match rest.strip_prefix(text.as_str()) {
                    Some(after) => rest = after,
                    None => return false,
                },
                Part::Variable(name) => {
                    let end = match parts.get(i + 1) {
                        Some(Part::Text(next)) => {
                            match rest.match_indices(next.as_str()).map(|(at, _)| at).find(|at| *at > 0) {
                                Some(at) => at,
                                None => return false,
                            }
                        }
                        // Adjacent variables are rejected at load time.
                        Some(Part::Variable(_)) => return false,
                        None => rest.len(),
                    };
                    if end == 0 {
                        return false;
                    }
                    bound.push((name.clone(), decode(&rest[..end])));
                    rest = &rest[end..];
                }
            }
        }
        if !rest.is_empty() {
            return false;
        }
        params.extend(bound);
        true
    }
}

fn decode(component: &str) -> String {
    percent_decode_str(component).decode_utf8_lossy().into_owned()
}

#[derive(Debug, Clone)]
struct Route {
    template: String,
    segments: Vec<Segment>,
    /// Methods declared on this path, with their operation ids.
    operations: Vec<(HttpMethod, String)>,
}

impl Route {
    fn is_templated(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Template(_)))
    }

    fn match_path(&self, components: &[&str]) -> Option<PathParams> {
        if components.len() != self.segments.len() {
            return None;
        }
        let mut params = PathParams::new();
        let matched = self
            .segments
            .iter()
            .zip(components)
            .all(|(segment, component)| segment.bind(component, &mut params));
        matched.then_some(params)
    }
}

/// Route index for one contract.
#[derive(Debug, Clone)]
pub struct RouteMatcher {
    base_paths: Vec<String>,
    routes: Vec<Route>,
}

impl RouteMatcher {
    /// Build the index from a parsed contract.
    pub fn new(document: &ContractDocument) -> Self {
        let mut routes: Vec<Route> = Vec::new();
        for op in &document.operations {
            match routes.iter_mut().find(|r| r.template == op.path_template) {
                Some(route) => route.operations.push((op.method, op.operation_id.clone())),
                None => routes.push(Route {
                    template: op.path_template.clone(),
                    segments: split(&op.path_template).into_iter().map(Segment::parse).collect(),
                    operations: vec![(op.method, op.operation_id.clone())],
                }),
            }
        }
        // Stable: literal paths first, each group keeps document order.
        routes.sort_by_key(Route::is_templated);
        Self {
            base_paths: document.base_paths.clone(),
            routes,
        }
    }

    /// Number of distinct path templates.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Find the operation declared for `method` on `path`.
    ///
    /// A path that matches structurally but does not declare `method` does
    /// not end the search; a later template may still declare it.
    pub fn find_route(&self, method: HttpMethod, path: &str) -> Option<RouteMatch> {
        self.candidate_paths(path).into_iter().find_map(|relative| {
            let components = split(relative);
            self.routes.iter().find_map(|route| {
                let operation_id = route
                    .operations
                    .iter()
                    .find(|(m, _)| *m == method)
                    .map(|(_, id)| id)?;
                let path_params = route.match_path(&components)?;
                Some(RouteMatch {
                    operation_id: operation_id.clone(),
                    path_template: route.template.clone(),
                    path_params,
                })
            })
        })
    }

    /// The request path relative to each declared server prefix it falls under.
    fn candidate_paths<'p>(&self, path: &'p str) -> Vec<&'p str> {
        if self.base_paths.is_empty() {
            return vec![path];
        }
        self.base_paths
            .iter()
            .filter_map(|base| {
                let rest = path.strip_prefix(base.as_str())?;
                if rest.is_empty() {
                    Some("/")
                } else if rest.starts_with('/') {
                    Some(rest)
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Split a path into components. `/` is the single empty component, and a
/// trailing slash yields a trailing empty component.
fn split(path: &str) -> Vec<&str> {
    path.strip_prefix('/').unwrap_or(path).split('/').collect()
}
