//! One handler per endpoint. Each follows the same protocol: bind the form,
//! validate it, run the store operation, wrap the outcome in an envelope.
//! Client input problems answer with `PARAM_INVALID` before the store is
//! ever touched; a store miss answers with `RULE_NOT_FOUND`.

use crate::code::{ok_json, respond, Envelope};
use crate::form::{bind, FormModel, Validate};
use crate::forms::{
    NoCacheRuleForm, PathRuleForm, ReverseServerForm, ReverseServerGroupForm, ServerRuleForm,
};
use crate::Ctx;
use anyhow::Result;
use bytes::Bytes;
use gateconf_store::StoreError;
use http::{Response, StatusCode};
use http_body_util::Full;
use regex::Regex;
use std::collections::BTreeMap;

type Reply = Result<Response<Full<Bytes>>>;

/// Bind then validate; on either failure the ready-made ParamInvalid reply
/// comes back on the `Err` side.
fn bind_valid<T: FormModel + Validate>(body: &[u8]) -> Result<T, Response<Full<Bytes>>> {
    let form: T = match bind(body) {
        Ok(f) => f,
        Err(e) => return Err(respond(StatusCode::OK, &Envelope::param_invalid(e.to_string()))),
    };
    if let Err(e) = form.validate() {
        return Err(respond(StatusCode::OK, &Envelope::param_invalid(e.to_string())));
    }
    Ok(form)
}

/// A store miss is a client-visible outcome; anything else propagates to the
/// recovery boundary.
fn store_miss(err: StoreError) -> Reply {
    match err {
        StoreError::NotFound(what, key) => Ok(respond(
            StatusCode::OK,
            &Envelope::rule_not_found(format!("{} {} not found", what, key)),
        )),
        other => Err(other.into()),
    }
}

macro_rules! try_form {
    ($ty:ty, $body:expr) => {
        match bind_valid::<$ty>($body) {
            Ok(form) => form,
            Err(reply) => return Ok(reply),
        }
    };
}

// ---------- aggregate ----------

pub(crate) fn all_configs_get(ctx: &Ctx<'_>) -> Reply {
    let path_rules: Vec<PathRuleForm> =
        ctx.store.path_rules()?.iter().map(PathRuleForm::from_rule).collect();
    let server_rules: Vec<ServerRuleForm> =
        ctx.store.server_rules()?.iter().map(ServerRuleForm::from_rule).collect();
    let nocache_rules: Vec<NoCacheRuleForm> =
        ctx.store.nocache_rules()?.iter().map(NoCacheRuleForm::from_rule).collect();

    let mut reverse_servers: BTreeMap<String, Vec<ReverseServerForm>> = BTreeMap::new();
    for srv in ctx.store.reverse_servers()? {
        reverse_servers
            .entry(srv.group.clone())
            .or_default()
            .push(ReverseServerForm::from_srv(&srv));
    }

    ok_json(&serde_json::json!({
        "path_rules": path_rules,
        "server_rules": server_rules,
        "reverse_servers": reverse_servers,
        "nocache_rules": nocache_rules,
    }))
}

// ---------- path rules ----------

pub(crate) fn path_rules_get(ctx: &Ctx<'_>) -> Reply {
    let rules: Vec<PathRuleForm> =
        ctx.store.path_rules()?.iter().map(PathRuleForm::from_rule).collect();
    ok_json(&rules)
}

pub(crate) fn path_rule_get(ctx: &Ctx<'_>) -> Reply {
    match ctx.store.path_rule(ctx.param("id")) {
        Ok(r) => ok_json(&PathRuleForm::from_rule(&r)),
        Err(e) => store_miss(e),
    }
}

pub(crate) fn path_rule_post(ctx: &Ctx<'_>) -> Reply {
    let form = try_form!(PathRuleForm, ctx.body);
    let stored = ctx.store.create_path_rule(form.into_rule())?;
    ok_json(&PathRuleForm::from_rule(&stored))
}

pub(crate) fn path_rule_put(ctx: &Ctx<'_>) -> Reply {
    let form = try_form!(PathRuleForm, ctx.body);
    match ctx.store.update_path_rule(ctx.param("id"), form.into_rule()) {
        Ok(r) => ok_json(&PathRuleForm::from_rule(&r)),
        Err(e) => store_miss(e),
    }
}

pub(crate) fn path_rule_delete(ctx: &Ctx<'_>) -> Reply {
    match ctx.store.delete_path_rule(ctx.param("id")) {
        Ok(()) => Ok(respond(StatusCode::OK, &Envelope::ok_empty())),
        Err(e) => store_miss(e),
    }
}

// ---------- server rules ----------

pub(crate) fn srv_rules_get(ctx: &Ctx<'_>) -> Reply {
    let rules: Vec<ServerRuleForm> =
        ctx.store.server_rules()?.iter().map(ServerRuleForm::from_rule).collect();
    ok_json(&rules)
}

pub(crate) fn srv_rule_get(ctx: &Ctx<'_>) -> Reply {
    match ctx.store.server_rule(ctx.param("id")) {
        Ok(r) => ok_json(&ServerRuleForm::from_rule(&r)),
        Err(e) => store_miss(e),
    }
}

pub(crate) fn srv_rule_post(ctx: &Ctx<'_>) -> Reply {
    let form = try_form!(ServerRuleForm, ctx.body);
    let stored = ctx.store.create_server_rule(form.into_rule())?;
    ok_json(&ServerRuleForm::from_rule(&stored))
}

pub(crate) fn srv_rule_put(ctx: &Ctx<'_>) -> Reply {
    let form = try_form!(ServerRuleForm, ctx.body);
    match ctx.store.update_server_rule(ctx.param("id"), form.into_rule()) {
        Ok(r) => ok_json(&ServerRuleForm::from_rule(&r)),
        Err(e) => store_miss(e),
    }
}

pub(crate) fn srv_rule_delete(ctx: &Ctx<'_>) -> Reply {
    match ctx.store.delete_server_rule(ctx.param("id")) {
        Ok(()) => Ok(respond(StatusCode::OK, &Envelope::ok_empty())),
        Err(e) => store_miss(e),
    }
}

// ---------- reverse servers ----------

pub(crate) fn reverse_srv_groups_get(ctx: &Ctx<'_>) -> Reply {
    ok_json(&ctx.store.reverse_server_groups()?)
}

pub(crate) fn reverse_srv_group_get(ctx: &Ctx<'_>) -> Reply {
    match ctx.store.reverse_server_group(ctx.param("group")) {
        Ok(members) => {
            let forms: Vec<ReverseServerForm> =
                members.iter().map(ReverseServerForm::from_srv).collect();
            ok_json(&forms)
        }
        Err(e) => store_miss(e),
    }
}

pub(crate) fn reverse_srv_group_put(ctx: &Ctx<'_>) -> Reply {
    let group = ctx.param("group");
    let mut form: ReverseServerGroupForm = match bind(ctx.body) {
        Ok(f) => f,
        Err(e) => {
            return Ok(respond(StatusCode::OK, &Envelope::param_invalid(e.to_string())));
        }
    };
    // The URL names the group; bodies cannot retarget it.
    for srv in &mut form.servers {
        srv.group = group.to_owned();
    }
    if let Err(e) = form.validate() {
        return Ok(respond(StatusCode::OK, &Envelope::param_invalid(e.to_string())));
    }
    let members = form.servers.into_iter().map(ReverseServerForm::into_srv).collect();
    let stored = ctx.store.replace_reverse_server_group(group, members)?;
    let forms: Vec<ReverseServerForm> = stored.iter().map(ReverseServerForm::from_srv).collect();
    ok_json(&forms)
}

pub(crate) fn reverse_srv_group_delete(ctx: &Ctx<'_>) -> Reply {
    match ctx.store.delete_reverse_server_group(ctx.param("group")) {
        Ok(()) => Ok(respond(StatusCode::OK, &Envelope::ok_empty())),
        Err(e) => store_miss(e),
    }
}

pub(crate) fn reverse_srv_get(ctx: &Ctx<'_>) -> Reply {
    match ctx.store.reverse_server(ctx.param("group"), ctx.param("id")) {
        Ok(s) => ok_json(&ReverseServerForm::from_srv(&s)),
        Err(e) => store_miss(e),
    }
}

pub(crate) fn reverse_srv_post(ctx: &Ctx<'_>) -> Reply {
    let form = try_form!(ReverseServerForm, ctx.body);
    let stored = ctx.store.create_reverse_server(form.into_srv())?;
    ok_json(&ReverseServerForm::from_srv(&stored))
}

pub(crate) fn reverse_srv_put(ctx: &Ctx<'_>) -> Reply {
    let group = ctx.param("group");
    let mut form: ReverseServerForm = match bind(ctx.body) {
        Ok(f) => f,
        Err(e) => {
            return Ok(respond(StatusCode::OK, &Envelope::param_invalid(e.to_string())));
        }
    };
    form.group = group.to_owned();
    if let Err(e) = form.validate() {
        return Ok(respond(StatusCode::OK, &Envelope::param_invalid(e.to_string())));
    }
    match ctx.store.update_reverse_server(group, ctx.param("id"), form.into_srv()) {
        Ok(s) => ok_json(&ReverseServerForm::from_srv(&s)),
        Err(e) => store_miss(e),
    }
}

pub(crate) fn reverse_srv_delete(ctx: &Ctx<'_>) -> Reply {
    match ctx.store.delete_reverse_server(ctx.param("group"), ctx.param("id")) {
        Ok(()) => Ok(respond(StatusCode::OK, &Envelope::ok_empty())),
        Err(e) => store_miss(e),
    }
}

// ---------- cache exceptions ----------

/// Patterns get compiled up front so the data plane never meets a rule it
/// cannot apply.
fn checked_pattern(form: &NoCacheRuleForm) -> Option<Response<Full<Bytes>>> {
    match Regex::new(&form.regular) {
        Ok(_) => None,
        Err(e) => Some(respond(
            StatusCode::OK,
            &Envelope::param_invalid(format!("field `regular` fails `regexp`: {}", e)),
        )),
    }
}

pub(crate) fn cache_rules_get(ctx: &Ctx<'_>) -> Reply {
    let rules: Vec<NoCacheRuleForm> =
        ctx.store.nocache_rules()?.iter().map(NoCacheRuleForm::from_rule).collect();
    ok_json(&rules)
}

pub(crate) fn cache_rule_get(ctx: &Ctx<'_>) -> Reply {
    match ctx.store.nocache_rule(ctx.param("id")) {
        Ok(r) => ok_json(&NoCacheRuleForm::from_rule(&r)),
        Err(e) => store_miss(e),
    }
}

pub(crate) fn cache_rule_post(ctx: &Ctx<'_>) -> Reply {
    let form = try_form!(NoCacheRuleForm, ctx.body);
    if let Some(reply) = checked_pattern(&form) {
        return Ok(reply);
    }
    let stored = ctx.store.create_nocache_rule(form.into_rule())?;
    ok_json(&NoCacheRuleForm::from_rule(&stored))
}

pub(crate) fn cache_rule_put(ctx: &Ctx<'_>) -> Reply {
    let form = try_form!(NoCacheRuleForm, ctx.body);
    if let Some(reply) = checked_pattern(&form) {
        return Ok(reply);
    }
    match ctx.store.update_nocache_rule(ctx.param("id"), form.into_rule()) {
        Ok(r) => ok_json(&NoCacheRuleForm::from_rule(&r)),
        Err(e) => store_miss(e),
    }
}

pub(crate) fn cache_rule_delete(ctx: &Ctx<'_>) -> Reply {
    match ctx.store.delete_nocache_rule(ctx.param("id")) {
        Ok(()) => Ok(respond(StatusCode::OK, &Envelope::ok_empty())),
        Err(e) => store_miss(e),
    }
}
