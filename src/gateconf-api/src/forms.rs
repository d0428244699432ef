//! Wire-format records, one per rule kind, plus the conversions to and from
//! the domain records in `gateconf-core`. The wire side owns the serde tags,
//! the form field tables and the required constraints; the domain side stays
//! free of transport concerns.

use crate::form::{
    check_required, parse_flag, parse_u32, split_list_key, BindError, Field, FormModel, Validate,
    ValidationErrors,
};
use gateconf_core::{CombineRequestConfig, NoCacheRule, PathRule, ReverseServer, ServerRule};
use serde::{Deserialize, Serialize};

// ---------- path rules ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PathRuleForm {
    pub id: String,
    pub path: String,
    pub rewrite_path: String,
    pub method: String,
    pub server_name: String,
    pub need_combine: bool,
    pub combine_req_cfgs: Vec<CombineReqForm>,
}

impl FormModel for PathRuleForm {
    const FIELDS: &'static [Field] = &[
        Field::required("path"),
        Field::required("rewrite_path"),
        Field::required("method"),
        Field::required("server_name"),
        Field::optional("need_combine"),
        Field::optional("combine_req_cfgs"),
    ];

    fn set(&mut self, key: &str, value: &str) -> Result<(), BindError> {
        if let Some(rest) = key.strip_prefix("combine_req_cfgs.") {
            let (idx, sub) = split_list_key(key, rest)?;
            if self.combine_req_cfgs.len() <= idx {
                self.combine_req_cfgs.resize_with(idx + 1, Default::default);
            }
            return self.combine_req_cfgs[idx].set(&sub, value);
        }
        match key {
            "path" => self.path = value.to_owned(),
            "rewrite_path" => self.rewrite_path = value.to_owned(),
            "method" => self.method = value.to_owned(),
            "server_name" => self.server_name = value.to_owned(),
            "need_combine" => self.need_combine = parse_flag(key, value)?,
            _ => {}
        }
        Ok(())
    }

    fn is_zero(&self, field: &str) -> bool {
        match field {
            "path" => self.path.is_empty(),
            "rewrite_path" => self.rewrite_path.is_empty(),
            "method" => self.method.is_empty(),
            "server_name" => self.server_name.is_empty(),
            "need_combine" => !self.need_combine,
            "combine_req_cfgs" => self.combine_req_cfgs.is_empty(),
            _ => false,
        }
    }
}

impl Validate for PathRuleForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = check_required(self);
        // Combine entries only carry meaning while the flag is up; they are
        // left unchecked otherwise.
        if self.need_combine {
            if self.combine_req_cfgs.is_empty() {
                errs.push("combine_req_cfgs", "required");
            }
            for (i, c) in self.combine_req_cfgs.iter().enumerate() {
                errs.merge_prefixed(&format!("combine_req_cfgs.{}", i), check_required(c));
            }
        }
        errs.into_result()
    }
}

impl PathRuleForm {
    pub fn from_rule(r: &PathRule) -> Self {
        Self {
            id: r.id.clone(),
            path: r.path.clone(),
            rewrite_path: r.rewrite_path.clone(),
            method: r.method.clone(),
            server_name: r.server_name.clone(),
            need_combine: r.need_combine,
            combine_req_cfgs: r.combine_req_cfgs.iter().map(CombineReqForm::from_cfg).collect(),
        }
    }

    pub fn into_rule(self) -> PathRule {
        PathRule {
            id: self.id,
            path: self.path,
            rewrite_path: self.rewrite_path,
            method: self.method,
            server_name: self.server_name,
            need_combine: self.need_combine,
            combine_req_cfgs: self
                .combine_req_cfgs
                .into_iter()
                .map(CombineReqForm::into_cfg)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CombineReqForm {
    pub server_name: String,
    pub path: String,
    pub method: String,
    pub field: String,
}

impl FormModel for CombineReqForm {
    const FIELDS: &'static [Field] = &[
        Field::required("server_name"),
        Field::required("path"),
        Field::required("method"),
        Field::required("field"),
    ];

    fn set(&mut self, key: &str, value: &str) -> Result<(), BindError> {
        match key {
            "server_name" => self.server_name = value.to_owned(),
            "path" => self.path = value.to_owned(),
            "method" => self.method = value.to_owned(),
            "field" => self.field = value.to_owned(),
            _ => {}
        }
        Ok(())
    }

    fn is_zero(&self, field: &str) -> bool {
        match field {
            "server_name" => self.server_name.is_empty(),
            "path" => self.path.is_empty(),
            "method" => self.method.is_empty(),
            "field" => self.field.is_empty(),
            _ => false,
        }
    }
}

impl Validate for CombineReqForm {}

impl CombineReqForm {
    pub fn from_cfg(c: &CombineRequestConfig) -> Self {
        Self {
            server_name: c.server_name.clone(),
            path: c.path.clone(),
            method: c.method.clone(),
            field: c.field.clone(),
        }
    }

    pub fn into_cfg(self) -> CombineRequestConfig {
        CombineRequestConfig {
            server_name: self.server_name,
            path: self.path,
            method: self.method,
            field: self.field,
        }
    }
}

// ---------- server rules ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerRuleForm {
    pub id: String,
    pub prefix: String,
    pub server_name: String,
    pub need_strip_prefix: bool,
}

impl FormModel for ServerRuleForm {
    const FIELDS: &'static [Field] = &[
        Field::required("prefix"),
        Field::required("server_name"),
        Field::optional("need_strip_prefix"),
    ];

    fn set(&mut self, key: &str, value: &str) -> Result<(), BindError> {
        match key {
            "prefix" => self.prefix = value.to_owned(),
            "server_name" => self.server_name = value.to_owned(),
            "need_strip_prefix" => self.need_strip_prefix = parse_flag(key, value)?,
            _ => {}
        }
        Ok(())
    }

    fn is_zero(&self, field: &str) -> bool {
        match field {
            "prefix" => self.prefix.is_empty(),
            "server_name" => self.server_name.is_empty(),
            "need_strip_prefix" => !self.need_strip_prefix,
            _ => false,
        }
    }
}

impl Validate for ServerRuleForm {}

impl ServerRuleForm {
    pub fn from_rule(r: &ServerRule) -> Self {
        Self {
            id: r.id.clone(),
            prefix: r.prefix.clone(),
            server_name: r.server_name.clone(),
            need_strip_prefix: r.need_strip_prefix,
        }
    }

    pub fn into_rule(self) -> ServerRule {
        ServerRule {
            id: self.id,
            prefix: self.prefix,
            server_name: self.server_name,
            need_strip_prefix: self.need_strip_prefix,
        }
    }
}

// ---------- reverse servers ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReverseServerForm {
    pub id: String,
    pub name: String,
    pub addr: String,
    pub weight: u32,
    pub group: String,
}

impl FormModel for ReverseServerForm {
    const FIELDS: &'static [Field] = &[
        Field::required("name"),
        Field::required("addr"),
        Field::required("weight"),
        Field::required("group"),
    ];

    fn set(&mut self, key: &str, value: &str) -> Result<(), BindError> {
        match key {
            "name" => self.name = value.to_owned(),
            "addr" => self.addr = value.to_owned(),
            "weight" => self.weight = parse_u32(key, value)?,
            "group" => self.group = value.to_owned(),
            _ => {}
        }
        Ok(())
    }

    fn is_zero(&self, field: &str) -> bool {
        match field {
            "name" => self.name.is_empty(),
            "addr" => self.addr.is_empty(),
            "weight" => self.weight == 0,
            "group" => self.group.is_empty(),
            _ => false,
        }
    }
}

impl Validate for ReverseServerForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = check_required(self);
        // The group string becomes a path segment of the store key.
        if self.group.contains('/') {
            errs.push("group", "excludes=/");
        }
        errs.into_result()
    }
}

impl ReverseServerForm {
    pub fn from_srv(s: &ReverseServer) -> Self {
        Self {
            id: s.id.clone(),
            name: s.name.clone(),
            addr: s.addr.clone(),
            weight: s.weight,
            group: s.group.clone(),
        }
    }

    pub fn into_srv(self) -> ReverseServer {
        ReverseServer {
            id: self.id,
            name: self.name,
            addr: self.addr,
            weight: self.weight,
            group: self.group,
        }
    }
}

/// Whole-group replacement body: `servers.N.<field>` pairs. The group name
/// itself comes from the URL, never from the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReverseServerGroupForm {
    pub servers: Vec<ReverseServerForm>,
}

impl FormModel for ReverseServerGroupForm {
    const FIELDS: &'static [Field] = &[Field::required("servers")];

    fn set(&mut self, key: &str, value: &str) -> Result<(), BindError> {
        if let Some(rest) = key.strip_prefix("servers.") {
            let (idx, sub) = split_list_key(key, rest)?;
            if self.servers.len() <= idx {
                self.servers.resize_with(idx + 1, Default::default);
            }
            return self.servers[idx].set(&sub, value);
        }
        Ok(())
    }

    fn is_zero(&self, field: &str) -> bool {
        match field {
            "servers" => self.servers.is_empty(),
            _ => false,
        }
    }
}

impl Validate for ReverseServerGroupForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = check_required(self);
        for (i, s) in self.servers.iter().enumerate() {
            errs.merge_prefixed(&format!("servers.{}", i), check_required(s));
        }
        errs.into_result()
    }
}

// ---------- cache exceptions ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NoCacheRuleForm {
    pub id: String,
    pub regular: String,
    pub enabled: bool,
}

impl FormModel for NoCacheRuleForm {
    const FIELDS: &'static [Field] = &[
        Field::required("regular"),
        Field::optional("enabled"),
    ];

    fn set(&mut self, key: &str, value: &str) -> Result<(), BindError> {
        match key {
            "regular" => self.regular = value.to_owned(),
            "enabled" => self.enabled = parse_flag(key, value)?,
            _ => {}
        }
        Ok(())
    }

    fn is_zero(&self, field: &str) -> bool {
        match field {
            "regular" => self.regular.is_empty(),
            "enabled" => !self.enabled,
            _ => false,
        }
    }
}

impl Validate for NoCacheRuleForm {}

impl NoCacheRuleForm {
    pub fn from_rule(r: &NoCacheRule) -> Self {
        Self {
            id: r.id.clone(),
            regular: r.regular.clone(),
            enabled: r.enabled,
        }
    }

    pub fn into_rule(self) -> NoCacheRule {
        NoCacheRule {
            id: self.id,
            regular: self.regular,
            enabled: self.enabled,
        }
    }
}
