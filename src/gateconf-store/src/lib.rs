pub mod memory;

pub use memory::Memory;

use gateconf_core::{
    new_rule_id, NoCacheRule, PathRule, ReverseServer, Rule, RuleKind, ServerRule,
};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The only store error with client-visible meaning.
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),
    #[error("encode: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("decode: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// Collaborator contract of the config API. One implementation per storage
/// engine; handlers only ever see `Arc<dyn Store>`.
///
/// Create assigns the id, update is a full replace keyed by id, reverse
/// servers are additionally keyed by group.
pub trait Store: Send + Sync {
    fn create_path_rule(&self, rule: PathRule) -> Result<PathRule, StoreError>;
    fn path_rule(&self, id: &str) -> Result<PathRule, StoreError>;
    fn update_path_rule(&self, id: &str, rule: PathRule) -> Result<PathRule, StoreError>;
    fn delete_path_rule(&self, id: &str) -> Result<(), StoreError>;
    fn path_rules(&self) -> Result<Vec<PathRule>, StoreError>;

    fn create_server_rule(&self, rule: ServerRule) -> Result<ServerRule, StoreError>;
    fn server_rule(&self, id: &str) -> Result<ServerRule, StoreError>;
    fn update_server_rule(&self, id: &str, rule: ServerRule) -> Result<ServerRule, StoreError>;
    fn delete_server_rule(&self, id: &str) -> Result<(), StoreError>;
    fn server_rules(&self) -> Result<Vec<ServerRule>, StoreError>;

    fn create_nocache_rule(&self, rule: NoCacheRule) -> Result<NoCacheRule, StoreError>;
    fn nocache_rule(&self, id: &str) -> Result<NoCacheRule, StoreError>;
    fn update_nocache_rule(&self, id: &str, rule: NoCacheRule) -> Result<NoCacheRule, StoreError>;
    fn delete_nocache_rule(&self, id: &str) -> Result<(), StoreError>;
    fn nocache_rules(&self) -> Result<Vec<NoCacheRule>, StoreError>;

    fn create_reverse_server(&self, srv: ReverseServer) -> Result<ReverseServer, StoreError>;
    fn reverse_server(&self, group: &str, id: &str) -> Result<ReverseServer, StoreError>;
    fn update_reverse_server(
        &self,
        group: &str,
        id: &str,
        srv: ReverseServer,
    ) -> Result<ReverseServer, StoreError>;
    fn delete_reverse_server(&self, group: &str, id: &str) -> Result<(), StoreError>;
    fn reverse_servers(&self) -> Result<Vec<ReverseServer>, StoreError>;
    fn reverse_server_group(&self, group: &str) -> Result<Vec<ReverseServer>, StoreError>;
    fn replace_reverse_server_group(
        &self,
        group: &str,
        servers: Vec<ReverseServer>,
    ) -> Result<Vec<ReverseServer>, StoreError>;
    fn delete_reverse_server_group(&self, group: &str) -> Result<(), StoreError>;
    fn reverse_server_groups(&self) -> Result<Vec<String>, StoreError>;
}

/// In-process [`Store`] over [`Memory`]. Concurrency-safe, nothing survives a
/// restart.
#[derive(Debug, Default)]
pub struct MemStore {
    mem: Memory,
}

impl MemStore {
    pub fn new() -> Self {
        Self { mem: Memory::new() }
    }

    fn create<R: Rule + Serialize>(&self, mut rule: R) -> Result<R, StoreError> {
        rule.set_id(new_rule_id());
        self.mem.put(R::kind().bucket(), rule.id(), &rule)?;
        Ok(rule)
    }

    fn read<R: Rule + DeserializeOwned>(&self, id: &str) -> Result<R, StoreError> {
        self.mem
            .get(R::kind().bucket(), id)?
            .ok_or_else(|| StoreError::NotFound(R::kind().bucket(), id.to_owned()))
    }

    fn update<R: Rule + Serialize>(&self, id: &str, mut rule: R) -> Result<R, StoreError> {
        let bucket = R::kind().bucket();
        if !self.mem.exists(bucket, id) {
            return Err(StoreError::NotFound(bucket, id.to_owned()));
        }
        rule.set_id(id.to_owned());
        self.mem.put(bucket, id, &rule)?;
        Ok(rule)
    }

    fn remove(&self, kind: RuleKind, id: &str) -> Result<(), StoreError> {
        if self.mem.delete(kind.bucket(), id)? {
            Ok(())
        } else {
            Err(StoreError::NotFound(kind.bucket(), id.to_owned()))
        }
    }

    fn srv_key(group: &str, id: &str) -> String {
        format!("{}/{}", group, id)
    }
}

impl Store for MemStore {
    fn create_path_rule(&self, rule: PathRule) -> Result<PathRule, StoreError> {
        self.create(rule)
    }
    fn path_rule(&self, id: &str) -> Result<PathRule, StoreError> {
        self.read(id)
    }
    fn update_path_rule(&self, id: &str, rule: PathRule) -> Result<PathRule, StoreError> {
        self.update(id, rule)
    }
    fn delete_path_rule(&self, id: &str) -> Result<(), StoreError> {
        self.remove(RuleKind::Path, id)
    }
    fn path_rules(&self) -> Result<Vec<PathRule>, StoreError> {
        self.mem.list(RuleKind::Path.bucket())
    }

    fn create_server_rule(&self, rule: ServerRule) -> Result<ServerRule, StoreError> {
        self.create(rule)
    }
    fn server_rule(&self, id: &str) -> Result<ServerRule, StoreError> {
        self.read(id)
    }
    fn update_server_rule(&self, id: &str, rule: ServerRule) -> Result<ServerRule, StoreError> {
        self.update(id, rule)
    }
    fn delete_server_rule(&self, id: &str) -> Result<(), StoreError> {
        self.remove(RuleKind::Server, id)
    }
    fn server_rules(&self) -> Result<Vec<ServerRule>, StoreError> {
        self.mem.list(RuleKind::Server.bucket())
    }

    fn create_nocache_rule(&self, rule: NoCacheRule) -> Result<NoCacheRule, StoreError> {
        self.create(rule)
    }
    fn nocache_rule(&self, id: &str) -> Result<NoCacheRule, StoreError> {
        self.read(id)
    }
    fn update_nocache_rule(&self, id: &str, rule: NoCacheRule) -> Result<NoCacheRule, StoreError> {
        self.update(id, rule)
    }
    fn delete_nocache_rule(&self, id: &str) -> Result<(), StoreError> {
        self.remove(RuleKind::NoCache, id)
    }
    fn nocache_rules(&self) -> Result<Vec<NoCacheRule>, StoreError> {
        self.mem.list(RuleKind::NoCache.bucket())
    }

    fn create_reverse_server(&self, mut srv: ReverseServer) -> Result<ReverseServer, StoreError> {
        let bucket = RuleKind::ReverseServer.bucket();
        srv.set_id(new_rule_id());
        self.mem.put(bucket, &Self::srv_key(&srv.group, &srv.id), &srv)?;
        Ok(srv)
    }

    fn reverse_server(&self, group: &str, id: &str) -> Result<ReverseServer, StoreError> {
        let bucket = RuleKind::ReverseServer.bucket();
        self.mem
            .get(bucket, &Self::srv_key(group, id))?
            .ok_or_else(|| StoreError::NotFound(bucket, Self::srv_key(group, id)))
    }

    fn update_reverse_server(
        &self,
        group: &str,
        id: &str,
        mut srv: ReverseServer,
    ) -> Result<ReverseServer, StoreError> {
        let bucket = RuleKind::ReverseServer.bucket();
        let key = Self::srv_key(group, id);
        if !self.mem.exists(bucket, &key) {
            return Err(StoreError::NotFound(bucket, key));
        }
        srv.set_id(id.to_owned());
        srv.group = group.to_owned();
        self.mem.put(bucket, &key, &srv)?;
        Ok(srv)
    }

    fn delete_reverse_server(&self, group: &str, id: &str) -> Result<(), StoreError> {
        let bucket = RuleKind::ReverseServer.bucket();
        let key = Self::srv_key(group, id);
        if self.mem.delete(bucket, &key)? {
            Ok(())
        } else {
            Err(StoreError::NotFound(bucket, key))
        }
    }

    fn reverse_servers(&self) -> Result<Vec<ReverseServer>, StoreError> {
        self.mem.list(RuleKind::ReverseServer.bucket())
    }

    fn reverse_server_group(&self, group: &str) -> Result<Vec<ReverseServer>, StoreError> {
        let members = self
            .mem
            .list_prefix(RuleKind::ReverseServer.bucket(), &format!("{}/", group))?;
        if members.is_empty() {
            return Err(StoreError::NotFound(
                RuleKind::ReverseServer.bucket(),
                group.to_owned(),
            ));
        }
        Ok(members)
    }

    fn replace_reverse_server_group(
        &self,
        group: &str,
        servers: Vec<ReverseServer>,
    ) -> Result<Vec<ReverseServer>, StoreError> {
        let bucket = RuleKind::ReverseServer.bucket();
        self.mem.delete_prefix(bucket, &format!("{}/", group));
        let mut stored = Vec::with_capacity(servers.len());
        for mut srv in servers {
            if srv.id.is_empty() {
                srv.set_id(new_rule_id());
            }
            srv.group = group.to_owned();
            self.mem.put(bucket, &Self::srv_key(group, &srv.id), &srv)?;
            stored.push(srv);
        }
        Ok(stored)
    }

    fn delete_reverse_server_group(&self, group: &str) -> Result<(), StoreError> {
        let bucket = RuleKind::ReverseServer.bucket();
        if self.mem.delete_prefix(bucket, &format!("{}/", group)) == 0 {
            return Err(StoreError::NotFound(bucket, group.to_owned()));
        }
        Ok(())
    }

    fn reverse_server_groups(&self) -> Result<Vec<String>, StoreError> {
        let mut groups: Vec<String> = self
            .mem
            .keys(RuleKind::ReverseServer.bucket())
            .into_iter()
            .filter_map(|k| k.split_once('/').map(|(g, _)| g.to_owned()))
            .collect();
        groups.sort();
        groups.dedup();
        Ok(groups)
    }
}
