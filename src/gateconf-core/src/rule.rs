use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mint a fresh rule id. Ids are opaque strings assigned on creation and
/// immutable afterwards.
pub fn new_rule_id() -> String {
    Uuid::new_v4().into()
}

/// The closed set of persisted rule kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Path,
    Server,
    ReverseServer,
    NoCache,
}

impl RuleKind {
    /// Store bucket the kind is persisted under.
    pub fn bucket(self) -> &'static str {
        match self {
            RuleKind::Path => "pathrules",
            RuleKind::Server => "srvrules",
            RuleKind::ReverseServer => "reversesrvs",
            RuleKind::NoCache => "nocacherules",
        }
    }
}

/// Uniform handle over every rule kind, letting store and dispatch logic
/// create, key and list rules without caring which kind they hold.
pub trait Rule {
    fn kind() -> RuleKind
    where
        Self: Sized;
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
}

// ---------- proxy routing rules ----------

/// Matches a request path and rewrites it towards a named upstream, with an
/// optional list of secondary requests whose response fields get merged into
/// the primary response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PathRule {
    #[serde(default)]
    pub id: String,
    pub path: String,
    pub rewrite_path: String,
    pub method: String,
    pub server_name: String,
    #[serde(default)]
    pub need_combine: bool,
    #[serde(default)]
    pub combine_req_cfgs: Vec<CombineRequestConfig>,
}

impl Rule for PathRule {
    fn kind() -> RuleKind {
        RuleKind::Path
    }
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// Secondary request directive embedded by value in a [`PathRule`]. Only
/// meaningful while the owning rule has `need_combine` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CombineRequestConfig {
    pub server_name: String,
    pub path: String,
    pub method: String,
    /// Response field to extract and merge into the primary response.
    pub field: String,
}

/// Forwards every request under a path prefix to a named upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ServerRule {
    #[serde(default)]
    pub id: String,
    pub prefix: String,
    pub server_name: String,
    #[serde(default)]
    pub need_strip_prefix: bool,
}

impl Rule for ServerRule {
    fn kind() -> RuleKind {
        RuleKind::Server
    }
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

// ---------- upstream pool ----------

/// One upstream instance inside a named load-balancing group. The group is a
/// plain grouping key; membership is whatever shares the string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReverseServer {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub addr: String,
    pub weight: u32,
    pub group: String,
}

impl Rule for ReverseServer {
    fn kind() -> RuleKind {
        RuleKind::ReverseServer
    }
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

// ---------- cache exceptions ----------

/// Marks requests matching a regular expression as non-cacheable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NoCacheRule {
    #[serde(default)]
    pub id: String,
    pub regular: String,
    #[serde(default)]
    pub enabled: bool,
}

impl Rule for NoCacheRule {
    fn kind() -> RuleKind {
        RuleKind::NoCache
    }
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}
