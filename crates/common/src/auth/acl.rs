use http::Method;

use super::AuthIdentity;

/// Access level granted by a matching rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    ReadWrite,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Read => "r",
            Access::ReadWrite => "rw",
        }
    }

    pub fn allows_write(&self) -> bool {
        matches!(self, Access::ReadWrite)
    }
}

/// One ordered access-control rule.
///
/// `role` is a relationship label, `"any"` (any authenticated caller),
/// `""` (anyone, authenticated or not), or `"owner"` (the resolved peer id
/// equals the peer id named in the path).
#[derive(Debug, Clone)]
pub struct AccessRule {
    pub role: String,
    pub path: String,
    pub methods: Vec<Method>,
    pub access: Access,
}

impl AccessRule {
    pub fn new(role: &str, path: &str, methods: &[Method], access: Access) -> Self {
        Self {
            role: role.to_string(),
            path: path.to_lowercase(),
            methods: methods.to_vec(),
            access,
        }
    }
}

/// Ordered access-control rule list. First match wins: authors must list
/// more specific or restrictive rules before broader ones, because a later
/// rule is never consulted once an earlier one matches.
#[derive(Debug, Clone)]
pub struct AclTable {
    rules: Vec<AccessRule>,
}

impl AclTable {
    pub fn new(rules: Vec<AccessRule>) -> Self {
        Self { rules }
    }

    /// Walk the rule list once and return the access level of the first
    /// rule that matches, or None to deny.
    ///
    /// `owner_peer_id` is the peer id named in the request path, consulted
    /// only by `"owner"` rules.
    pub fn authorize(
        &self,
        identity: &AuthIdentity,
        path: &str,
        subpath: &str,
        method: &Method,
        owner_peer_id: Option<&str>,
    ) -> Option<Access> {
        let joined = format!("{}/{}", path, subpath)
            .trim_matches('/')
            .to_lowercase();

        for rule in &self.rules {
            match rule.role.as_str() {
                "" => {}
                "any" => {
                    if !identity.authenticated {
                        continue;
                    }
                }
                "owner" => {
                    let owns = match (identity.peer_id.as_deref(), owner_peer_id) {
                        (Some(me), Some(named)) => me == named,
                        _ => false,
                    };
                    if !owns {
                        continue;
                    }
                }
                role => {
                    let matches_role = identity
                        .relationship
                        .as_deref()
                        .is_some_and(|rel| rel.eq_ignore_ascii_case(role));
                    if !matches_role {
                        continue;
                    }
                }
            }

            if !joined.starts_with(&rule.path) {
                continue;
            }
            if !rule.methods.is_empty() && !rule.methods.contains(method) {
                continue;
            }
            return Some(rule.access);
        }

        None
    }
}

impl Default for AclTable {
    fn default() -> Self {
        Self::new(vec![
            // a peer may always act on the relationship record naming itself
            AccessRule::new("owner", "trust", &[], Access::ReadWrite),
            AccessRule::new("creator", "", &[], Access::ReadWrite),
            AccessRule::new("trustee", "", &[], Access::ReadWrite),
            AccessRule::new("any", "meta", &[Method::GET], Access::Read),
            AccessRule::new("", "meta", &[Method::GET], Access::Read),
        ])
    }
}
