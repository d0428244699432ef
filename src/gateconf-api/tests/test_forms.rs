//! Tests for form binding, the field tables and the validator

use gateconf_api::form::{bind, BindError, Validate};
use gateconf_api::forms::{
    NoCacheRuleForm, PathRuleForm, ReverseServerForm, ReverseServerGroupForm, ServerRuleForm,
};
use gateconf_core::PathRule;

#[test]
fn bind_fills_known_fields() {
    let form: PathRuleForm =
        bind(b"path=/foo&rewrite_path=/bar&method=GET&server_name=svcA").unwrap();
    assert_eq!(form.path, "/foo");
    assert_eq!(form.rewrite_path, "/bar");
    assert_eq!(form.method, "GET");
    assert_eq!(form.server_name, "svcA");
    assert!(!form.need_combine);
    assert!(form.combine_req_cfgs.is_empty());
}

#[test]
fn bind_ignores_unknown_keys() {
    let form: ServerRuleForm =
        bind(b"prefix=/svc&server_name=svcB&totally_unknown=1&future_field=x").unwrap();
    assert_eq!(form.prefix, "/svc");
    assert_eq!(form.server_name, "svcB");
}

#[test]
fn bind_zeroes_absent_fields() {
    let form: ServerRuleForm = bind(b"prefix=/svc").unwrap();
    assert_eq!(form.server_name, "");
    assert!(!form.need_strip_prefix);
}

#[test]
fn bind_decodes_percent_encoding() {
    let form: PathRuleForm = bind(b"path=%2Ffoo%20bar&method=GET").unwrap();
    assert_eq!(form.path, "/foo bar");
}

#[test]
fn flags_accept_the_usual_spellings() {
    for (raw, want) in [
        ("true", true),
        ("1", true),
        ("on", true),
        ("TRUE", true),
        ("false", false),
        ("0", false),
        ("off", false),
        ("", false),
    ] {
        let body = format!("enabled={}", raw);
        let form: NoCacheRuleForm = bind(body.as_bytes()).unwrap();
        assert_eq!(form.enabled, want, "enabled={raw}");
    }
}

#[test]
fn bad_flag_is_a_type_mismatch() {
    let err = bind::<NoCacheRuleForm>(b"enabled=banana").unwrap_err();
    assert!(matches!(err, BindError::TypeMismatch { .. }));
}

#[test]
fn bad_weight_is_a_type_mismatch() {
    let err = bind::<ReverseServerForm>(b"weight=heavy").unwrap_err();
    assert!(matches!(err, BindError::TypeMismatch { .. }));
    // empty weight stays at zero instead of failing
    let form: ReverseServerForm = bind(b"weight=").unwrap();
    assert_eq!(form.weight, 0);
}

#[test]
fn indexed_keys_bind_embedded_combine_list() {
    let form: PathRuleForm = bind(
        b"path=/foo&rewrite_path=/bar&method=GET&server_name=svcA&need_combine=true\
          &combine_req_cfgs.0.server_name=auth&combine_req_cfgs.0.path=/token\
          &combine_req_cfgs.0.method=GET&combine_req_cfgs.0.field=token\
          &combine_req_cfgs.1.server_name=user&combine_req_cfgs.1.path=/me\
          &combine_req_cfgs.1.method=GET&combine_req_cfgs.1.field=name",
    )
    .unwrap();
    assert_eq!(form.combine_req_cfgs.len(), 2);
    assert_eq!(form.combine_req_cfgs[0].server_name, "auth");
    assert_eq!(form.combine_req_cfgs[1].field, "name");
}

#[test]
fn sparse_list_indices_grow_the_list() {
    let form: ReverseServerGroupForm = bind(b"servers.2.name=late").unwrap();
    assert_eq!(form.servers.len(), 3);
    assert_eq!(form.servers[2].name, "late");
    assert_eq!(form.servers[0].name, "");
}

#[test]
fn malformed_list_key_fails_binding() {
    let err = bind::<PathRuleForm>(b"combine_req_cfgs.x.path=/p").unwrap_err();
    assert!(matches!(err, BindError::BadListKey(_)));
    let err = bind::<PathRuleForm>(b"combine_req_cfgs.0=oops").unwrap_err();
    assert!(matches!(err, BindError::BadListKey(_)));
}

#[test]
fn validation_collects_every_violation() {
    let form: PathRuleForm = bind(b"method=GET").unwrap();
    let errs = form.validate().unwrap_err();
    let fields: Vec<&str> = errs.0.iter().map(|v| v.field.as_str()).collect();
    assert_eq!(fields, ["path", "rewrite_path", "server_name"]);

    let msg = errs.to_string();
    assert!(msg.contains("field `path` fails `required`"));
    assert!(msg.contains("field `rewrite_path` fails `required`"));
    assert!(msg.contains("field `server_name` fails `required`"));
}

#[test]
fn combine_entries_validate_only_when_flag_is_up() {
    // flag down: incomplete entries are not inspected
    let mut form: PathRuleForm =
        bind(b"path=/f&rewrite_path=/b&method=GET&server_name=s&combine_req_cfgs.0.path=/p")
            .unwrap();
    assert!(form.validate().is_ok());

    // flag up: children checked, violations prefixed with their index
    form.need_combine = true;
    let errs = form.validate().unwrap_err();
    let fields: Vec<&str> = errs.0.iter().map(|v| v.field.as_str()).collect();
    assert!(fields.contains(&"combine_req_cfgs.0.server_name"));
    assert!(fields.contains(&"combine_req_cfgs.0.method"));
    assert!(fields.contains(&"combine_req_cfgs.0.field"));

    // flag up with no entries at all is itself a violation
    let empty: PathRuleForm =
        bind(b"path=/f&rewrite_path=/b&method=GET&server_name=s&need_combine=1").unwrap();
    let errs = empty.validate().unwrap_err();
    assert_eq!(errs.0[0].field, "combine_req_cfgs");
}

#[test]
fn slash_in_group_fails_validation() {
    let form: ReverseServerForm = bind(b"name=n&addr=a&group=pool/a&weight=1").unwrap();
    let errs = form.validate().unwrap_err();
    assert_eq!(errs.0.len(), 1);
    assert_eq!(errs.0[0].field, "group");
    assert_eq!(errs.0[0].constraint, "excludes=/");
}

#[test]
fn zero_weight_fails_required() {
    let form: ReverseServerForm = bind(b"name=n&addr=a&group=g&weight=0").unwrap();
    let errs = form.validate().unwrap_err();
    assert_eq!(errs.0.len(), 1);
    assert_eq!(errs.0[0].field, "weight");
}

#[test]
fn conversions_round_trip_including_children() {
    let form: PathRuleForm = bind(
        b"path=/foo&rewrite_path=/bar&method=GET&server_name=svcA&need_combine=1\
          &combine_req_cfgs.0.server_name=auth&combine_req_cfgs.0.path=/token\
          &combine_req_cfgs.0.method=GET&combine_req_cfgs.0.field=token",
    )
    .unwrap();

    let rule: PathRule = form.clone().into_rule();
    assert_eq!(rule.combine_req_cfgs.len(), 1);
    assert_eq!(rule.combine_req_cfgs[0].field, "token");

    let back = PathRuleForm::from_rule(&rule);
    assert_eq!(back, form);
}
