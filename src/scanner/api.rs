//! HTTP route registration detection.
//!
//! Detects Express-style and Flask/FastAPI-style route declarations:
//!   app.get('/api/users', list)
//!   router.post("/api/items", create)
//!   @app.route("/api/users", methods=["POST"])
//!   @router.get("/api/users/{id}")

use once_cell::sync::Lazy;
use regex::Regex;

/// One detected route registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: String,
    /// Normalized path (`{id}` and `<int:id>` become `:param`).
    pub path: String,
    /// Named handler passed alongside the path, if any.
    pub handler: Option<String>,
}

impl Route {
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

const ROUTE_OBJECTS: [&str; 7] = ["app", "router", "bp", "blueprint", "api", "route", "server"];

static ECMA_ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|[^\w$.])([\w$]+)\.(get|post|put|delete|patch|head|options|all)\(\s*['"`]([^'"`]*)['"`]"#)
        .expect("static regex")
});

static ECMA_HANDLER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"['"`]\s*,(?:.*,)?\s*([A-Za-z_$][\w$.]*)\s*\)\s*;?\s*$"#).expect("static regex")
});

static PY_ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^@(?:([\w.]+)\.)?(route|get|post|put|delete|patch|head|options)\(\s*[rfub]*['"]([^'"]*)['"]"#)
        .expect("static regex")
});

static PY_METHODS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"methods\s*=\s*[\[(]\s*['"](\w+)['"]"#).expect("static regex"));

/// Route registered by an ECMAScript call on `line` (raw text).
pub fn ecma_route(line: &str) -> Option<Route> {
    let caps = ECMA_ROUTE.captures(line)?;
    if !is_route_object(&caps[1]) || !is_api_url(&caps[3]) {
        return None;
    }
    let handler = ECMA_HANDLER
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().rsplit('.').next().unwrap_or(m.as_str()).to_string());
    Some(Route {
        method: caps[2].to_uppercase(),
        path: normalize_url(&caps[3]),
        handler,
    })
}

/// Route declared by a Python decorator (raw text, leading `@`).
pub fn python_route(decorator: &str) -> Option<Route> {
    let caps = PY_ROUTE.captures(decorator.trim())?;
    let verb = &caps[2];
    match caps.get(1) {
        Some(object) if !is_route_object(object.as_str()) => return None,
        None if verb != "route" => return None,
        _ => {}
    }
    if !is_api_url(&caps[3]) {
        return None;
    }
    let method = if verb == "route" {
        PY_METHODS
            .captures(decorator)
            .map_or_else(|| "GET".to_string(), |c| c[1].to_uppercase())
    } else {
        verb.to_uppercase()
    };
    Some(Route {
        method,
        path: normalize_url(&caps[3]),
        handler: None,
    })
}

fn is_route_object(object: &str) -> bool {
    let last = object.rsplit('.').next().unwrap_or(object).to_lowercase();
    ROUTE_OBJECTS.iter().any(|r| last.contains(r))
}

/// Normalize URL by converting template variables to :param.
fn normalize_url(url: &str) -> String {
    let mut result = String::new();
    let mut chars = url.chars();

    while let Some(c) = chars.next() {
        match c {
            // {id} or {user_id}
            '{' => {
                for c2 in chars.by_ref() {
                    if c2 == '}' {
                        break;
                    }
                }
                result.push_str(":param");
            }
            // Flask/Werkzeug style: <id> or <int:id>
            '<' => {
                for c2 in chars.by_ref() {
                    if c2 == '>' {
                        break;
                    }
                }
                result.push_str(":param");
            }
            _ => result.push(c),
        }
    }

    result
}

/// Check if URL looks like an API endpoint.
fn is_api_url(url: &str) -> bool {
    let url = url.to_lowercase();
    url.contains("/api/") || (url.starts_with('/') && !url.contains('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("/api/users/{id}"), "/api/users/:param");
        assert_eq!(normalize_url("/api/users/<int:id>"), "/api/users/:param");
        assert_eq!(normalize_url("/api/items/<id>/comments/<cid>"), "/api/items/:param/comments/:param");
    }

    #[test]
    fn test_is_api_url() {
        assert!(is_api_url("/api/users"));
        assert!(is_api_url("/v1/products"));
        assert!(is_api_url("/"));
        assert!(!is_api_url(""));
        assert!(!is_api_url("env"));
        assert!(!is_api_url("/static/styles.css"));
    }

    #[test]
    fn test_ecma_route_with_named_handler() {
        let route = ecma_route("app.get('/api/users/:id', auth, users.show);").unwrap();
        assert_eq!(route.method, "GET");
        assert_eq!(route.path, "/api/users/:id");
        assert_eq!(route.handler.as_deref(), Some("show"));

        let inline = ecma_route("router.post(\"/items\", (req, res) => {").unwrap();
        assert_eq!(inline.label(), "POST /items");
        assert_eq!(inline.handler, None);
    }

    #[test]
    fn test_ecma_route_ignores_settings_and_maps() {
        assert_eq!(ecma_route("app.get('env')"), None);
        assert_eq!(ecma_route("cache.get('/api/x')"), None);
    }

    #[test]
    fn test_python_route_decorators() {
        let r = python_route("@app.route(\"/api/users\", methods=[\"POST\"])").unwrap();
        assert_eq!(r.label(), "POST /api/users");
        let r = python_route("@router.get('/users/{user_id}')").unwrap();
        assert_eq!(r.label(), "GET /users/:param");
        let r = python_route("@route('/health')").unwrap();
        assert_eq!(r.method, "GET");
        assert_eq!(python_route("@pytest.fixture"), None);
        assert_eq!(python_route("@cache.get('/x')"), None);
    }
}
